//! # Consistency Reconciler
//!
//! Rebuilds every product's counters from history and compares.
//!
//! ## Modes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Report                                                                 │
//! │    one read transaction → (product, recomputed) pairs                  │
//! │    → drift[] + count discrepancies[]           nothing is written      │
//! │                                                                         │
//! │  Fix                                                                    │
//! │    for each product:                                                    │
//! │      lock(product) → begin_write → recompute → compare                 │
//! │        agree              → rollback (version untouched)               │
//! │        recomputed ≥ 0     → overwrite counters, commit                 │
//! │        recomputed < 0     → rollback, report as unresolved             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A second fix right after the first corrects nothing.

use shears_core::reconcile::{
    count_discrepancy, detect_drift, ReconcileMode, ReconcileOutcome,
};
use tracing::{info, warn};

use crate::context::LedgerContext;
use crate::error::LedgerResult;
use crate::events::LedgerEvent;

#[derive(Debug, Clone)]
pub struct ConsistencyReconciler {
    ctx: LedgerContext,
}

impl ConsistencyReconciler {
    pub fn new(ctx: LedgerContext) -> Self {
        ConsistencyReconciler { ctx }
    }

    pub async fn reconcile(&self, mode: ReconcileMode) -> LedgerResult<ReconcileOutcome> {
        match mode {
            ReconcileMode::Report => self.report().await,
            ReconcileMode::Fix => self.fix().await,
        }
    }

    async fn report(&self) -> LedgerResult<ReconcileOutcome> {
        let pairs = self.ctx.db.ledger_state().recompute_all().await?;

        let drift: Vec<_> = pairs
            .iter()
            .filter_map(|(product, recomputed)| detect_drift(product, *recomputed))
            .collect();
        let counts: Vec<_> = pairs
            .iter()
            .filter_map(|(product, _)| count_discrepancy(product))
            .collect();

        for entry in &drift {
            warn!(
                product_id = %entry.product_id,
                stored = entry.stored_expected,
                recomputed = entry.recomputed_expected,
                "Ledger drift detected"
            );
        }
        info!(
            products = pairs.len(),
            drift = drift.len(),
            count_gaps = counts.len(),
            "Reconciliation report"
        );
        Ok(ReconcileOutcome::Report { drift, counts })
    }

    async fn fix(&self) -> LedgerResult<ReconcileOutcome> {
        let products = self.ctx.db.products().list().await?;

        let mut corrected = Vec::new();
        let mut unresolved = Vec::new();
        let mut last_version = None;

        for listed in products {
            let _locks = self.ctx.locks.lock(&listed.id).await;
            let mut tx = self.ctx.db.begin_write().await?;

            // Deleted since the listing.
            let Some(product) = tx.fetch_product(&listed.id).await? else {
                continue;
            };
            let recomputed = tx.recompute_levels(&product).await?;
            let Some(entry) = detect_drift(&product, recomputed) else {
                continue;
            };

            if !entry.is_resolvable() {
                warn!(
                    product_id = %entry.product_id,
                    recomputed = entry.recomputed_expected,
                    "Drift left in place: history implies negative stock"
                );
                unresolved.push(entry);
                continue;
            }

            tx.set_levels(&product.id, recomputed).await?;
            let version = tx.commit().await?;
            last_version = Some(version);

            info!(
                product_id = %entry.product_id,
                from = entry.stored_expected,
                to = entry.recomputed_expected,
                version,
                "Ledger drift corrected"
            );
            corrected.push(entry);
        }

        let fixed_count = corrected.len();
        if let Some(version) = last_version {
            self.ctx
                .events
                .publish(LedgerEvent::Reconciled { version, fixed_count });
        }
        info!(fixed_count, unresolved = unresolved.len(), "Reconciliation fix complete");

        Ok(ReconcileOutcome::Fixed {
            fixed_count,
            corrected,
            unresolved,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product_ledger::ProductLedger;
    use crate::settlement::CartSettlementEngine;
    use crate::test_support::{context, new_product, product_line};
    use shears_core::cart::CartRequest;

    #[tokio::test]
    async fn test_clean_ledger_reports_nothing() {
        let ctx = context().await;
        let ledger = ProductLedger::new(ctx.clone());
        let engine = CartSettlementEngine::new(ctx.clone());
        let p = ledger.create_product(new_product("POM-01", "Pomade", 10)).await.unwrap();
        engine
            .settle(CartRequest {
                barber_id: None,
                client_data: None,
                lines: vec![product_line(&p.id, 3, 1000, "cash")],
            })
            .await
            .unwrap();

        let outcome = ConsistencyReconciler::new(ctx)
            .reconcile(ReconcileMode::Report)
            .await
            .unwrap();
        assert_eq!(outcome.issue_count(), 0);
    }

    #[tokio::test]
    async fn test_fix_is_idempotent() {
        let ctx = context().await;
        let ledger = ProductLedger::new(ctx.clone());
        let p = ledger.create_product(new_product("POM-01", "Pomade", 10)).await.unwrap();

        // A debit with no sale record behind it.
        ledger.reserve_and_debit_for_sale(&p.id, 2).await.unwrap();

        let reconciler = ConsistencyReconciler::new(ctx.clone());
        match reconciler.reconcile(ReconcileMode::Report).await.unwrap() {
            ReconcileOutcome::Report { drift, .. } => {
                assert_eq!(drift.len(), 1);
                assert_eq!(drift[0].stored_expected, 8);
                assert_eq!(drift[0].recomputed_expected, 10);
                assert_eq!(drift[0].delta, 2);
            }
            other => panic!("unexpected outcome {other:?}"),
        }

        let first = reconciler.reconcile(ReconcileMode::Fix).await.unwrap();
        assert!(matches!(first, ReconcileOutcome::Fixed { fixed_count: 1, .. }));
        assert_eq!(ledger.get_available(&p.id).await.unwrap(), 10);

        let version = ctx.db.ledger_state().version().await.unwrap();
        let second = reconciler.reconcile(ReconcileMode::Fix).await.unwrap();
        assert!(matches!(second, ReconcileOutcome::Fixed { fixed_count: 0, .. }));
        assert_eq!(ctx.db.ledger_state().version().await.unwrap(), version);
    }

    #[tokio::test]
    async fn test_count_discrepancies_listed_separately() {
        let ctx = context().await;
        let ledger = ProductLedger::new(ctx.clone());
        let p = ledger.create_product(new_product("POM-01", "Pomade", 10)).await.unwrap();
        ledger.record_manual_count(&p.id, 9, None, "owner").await.unwrap();

        match ConsistencyReconciler::new(ctx)
            .reconcile(ReconcileMode::Report)
            .await
            .unwrap()
        {
            ReconcileOutcome::Report { drift, counts } => {
                assert!(drift.is_empty());
                assert_eq!(counts.len(), 1);
                assert_eq!(counts[0].difference, -1);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}
