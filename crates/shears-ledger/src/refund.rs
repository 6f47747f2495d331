//! # Refund Processor
//!
//! Reverses one settled sale record.
//!
//! ```text
//!   active ──refund(reason)──► refunded        (one way, at most once)
//!
//!   product line:  sales -= original_quantity  (never below zero)
//!   service line:  no stock effect
//!   always:        original_quantity / original_total_cents untouched
//! ```
//!
//! The status flip is a conditional update on `status = 'active'`, made
//! under the product's lock and inside the same transaction as the stock
//! credit. Two refunds racing on one record cannot both credit.

use shears_core::validation::validate_reason;
use shears_core::{CoreError, LineKind, SaleRecord};
use tracing::info;

use crate::context::{not_found_as, now, LedgerContext};
use crate::error::LedgerResult;
use crate::events::LedgerEvent;
use crate::product_ledger::credit_in_tx;

#[derive(Debug, Clone)]
pub struct RefundProcessor {
    ctx: LedgerContext,
}

impl RefundProcessor {
    pub fn new(ctx: LedgerContext) -> Self {
        RefundProcessor { ctx }
    }

    /// Refunds `sale_id` and returns the updated record.
    ///
    /// # Errors
    /// `SaleNotFound`, `AlreadyRefunded`, or a validation error for an empty
    /// reason.
    pub async fn refund(&self, sale_id: &str, reason: &str) -> LedgerResult<SaleRecord> {
        validate_reason(reason)?;
        let reason = reason.trim();

        // Unlocked read, only to learn which product to lock.
        let record = self
            .ctx
            .db
            .sales()
            .get_by_id(sale_id)
            .await
            .map_err(|e| not_found_as(e, || CoreError::SaleNotFound(sale_id.to_string())))?;
        if record.is_refunded() {
            return Err(already_refunded(sale_id));
        }

        let product_id = match record.line_kind {
            LineKind::Product => record.product_id.clone(),
            LineKind::Service => None,
        };

        let _locks = self.ctx.locks.lock_many(product_id.iter()).await;
        let mut tx = self.ctx.db.begin_write().await?;

        let refunded_at = now();
        if !tx.mark_refunded(sale_id, reason, &refunded_at).await? {
            return Err(already_refunded(sale_id));
        }

        if let Some(product_id) = product_id.as_deref() {
            credit_in_tx(&mut tx, product_id, record.original_quantity).await?;
        }

        let refunded = tx
            .fetch_sale(sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;
        let version = tx.commit().await?;

        info!(
            sale_id = %sale_id,
            product_id = ?product_id,
            quantity = record.original_quantity,
            version,
            "Sale refunded"
        );
        self.ctx.events.publish(LedgerEvent::SaleRefunded {
            version,
            sale_id: sale_id.to_string(),
            product_id,
        });
        Ok(refunded)
    }
}

fn already_refunded(sale_id: &str) -> crate::error::LedgerError {
    CoreError::AlreadyRefunded {
        sale_id: sale_id.to_string(),
    }
    .into()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ServiceCatalog;
    use crate::error::ErrorCode;
    use crate::product_ledger::ProductLedger;
    use crate::settlement::CartSettlementEngine;
    use crate::test_support::{context, new_product, product_line, service_line};
    use shears_core::cart::CartRequest;
    use shears_core::SaleStatus;

    struct Fixture {
        ledger: ProductLedger,
        engine: CartSettlementEngine,
        refunds: RefundProcessor,
        services: ServiceCatalog,
    }

    async fn fixture() -> Fixture {
        let ctx = context().await;
        Fixture {
            ledger: ProductLedger::new(ctx.clone()),
            engine: CartSettlementEngine::new(ctx.clone()),
            refunds: RefundProcessor::new(ctx.clone()),
            services: ServiceCatalog::new(ctx),
        }
    }

    fn cart(lines: Vec<shears_core::cart::CartLineRequest>) -> CartRequest {
        CartRequest {
            barber_id: None,
            client_data: None,
            lines,
        }
    }

    #[tokio::test]
    async fn test_refund_restores_stock_once() {
        let f = fixture().await;
        let p = f.ledger.create_product(new_product("POM-01", "Pomade", 10)).await.unwrap();
        let settled = f
            .engine
            .settle(cart(vec![product_line(&p.id, 4, 1000, "cash")]))
            .await
            .unwrap();
        let sale_id = settled.records[0].id.clone();

        let refunded = f.refunds.refund(&sale_id, "customer changed mind").await.unwrap();
        assert_eq!(refunded.status, SaleStatus::Refunded);
        assert_eq!(refunded.displayed_quantity(), 0);
        assert_eq!(refunded.displayed_total().cents(), 0);
        assert_eq!(refunded.original_quantity, 4);
        assert_eq!(refunded.original_total_cents, 4000);
        assert_eq!(refunded.refund_reason.as_deref(), Some("customer changed mind"));
        assert!(refunded.refunded_at.is_some());
        assert_eq!(f.ledger.get_available(&p.id).await.unwrap(), 10);

        let err = f.refunds.refund(&sale_id, "again").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::AlreadyRefunded);
        assert_eq!(f.ledger.get_available(&p.id).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_service_refund_has_no_stock_effect() {
        let f = fixture().await;
        let haircut = f.services.create_service("Haircut", 2500).await.unwrap();
        let settled = f
            .engine
            .settle(cart(vec![service_line(&haircut.id, 2500, "card")]))
            .await
            .unwrap();

        let refunded = f
            .refunds
            .refund(&settled.records[0].id, "barber no-show")
            .await
            .unwrap();
        assert!(refunded.is_refunded());
        assert_eq!(refunded.original_total_cents, 2500);
    }

    #[tokio::test]
    async fn test_refund_errors() {
        let f = fixture().await;
        let err = f.refunds.refund("missing", "reason").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::SaleNotFound);

        let err = f.refunds.refund("missing", "   ").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_concurrent_refunds_credit_once() {
        let f = fixture().await;
        let p = f.ledger.create_product(new_product("POM-01", "Pomade", 10)).await.unwrap();
        let settled = f
            .engine
            .settle(cart(vec![product_line(&p.id, 3, 1000, "cash")]))
            .await
            .unwrap();
        let sale_id = settled.records[0].id.clone();

        let (a, b) = tokio::join!(
            f.refunds.refund(&sale_id, "first"),
            f.refunds.refund(&sale_id, "second")
        );
        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
        assert_eq!(f.ledger.get_available(&p.id).await.unwrap(), 10);
    }
}
