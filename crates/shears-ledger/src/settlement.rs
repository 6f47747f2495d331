//! # Cart Settlement Engine
//!
//! Commits a whole cart or nothing.
//!
//! ## Settlement Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. validate_cart          shape, quantities, prices, payment methods  │
//! │  2. product_demand         { pomade: 3, wax: 1 }  (summed, sorted)     │
//! │  3. lock_many(demand)      per-product mutexes, sorted order           │
//! │  4. begin_write            version bump, SQLite write lock             │
//! │  5. resolve services       missing or inactive → ServiceNotFound       │
//! │  6. debit every product    any shortfall → InsufficientStock           │
//! │  7. insert SaleRecords     one per line, shared cart_id                │
//! │  8. commit                 all of the above, or none of it             │
//! │  9. publish CartSettled                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! An error at any step drops the transaction, which rolls back every debit
//! and record already written for the cart.

use std::collections::HashMap;

use shears_core::cart::{product_demand, validate_cart, CartRequest, SettledCart};
use shears_core::{CoreError, LineKind, Product, SaleRecord, SaleStatus, Service};
use tracing::{debug, info};
use uuid::Uuid;

use crate::context::{now, LedgerContext};
use crate::error::LedgerResult;
use crate::events::LedgerEvent;
use crate::product_ledger::debit_in_tx;

/// Turns carts into committed sale records.
#[derive(Debug, Clone)]
pub struct CartSettlementEngine {
    ctx: LedgerContext,
}

impl CartSettlementEngine {
    pub fn new(ctx: LedgerContext) -> Self {
        CartSettlementEngine { ctx }
    }

    /// Settles `cart` atomically.
    ///
    /// # Errors
    /// `InsufficientStock`, `ProductNotFound`, `ServiceNotFound`,
    /// `InvalidPaymentMethod` or a validation error. None of them leave
    /// anything behind.
    pub async fn settle(&self, cart: CartRequest) -> LedgerResult<SettledCart> {
        validate_cart(&cart, &self.ctx.catalog)?;
        let demand = product_demand(&cart);

        let _locks = self.ctx.locks.lock_many(demand.keys()).await;
        let mut tx = self.ctx.db.begin_write().await?;

        let mut services: HashMap<&str, Service> = HashMap::new();
        for line in cart.lines.iter().filter(|l| l.kind == LineKind::Service) {
            if services.contains_key(line.item_id.as_str()) {
                continue;
            }
            let service = tx
                .fetch_service(&line.item_id)
                .await?
                .filter(|s| s.is_active)
                .ok_or_else(|| CoreError::ServiceNotFound(line.item_id.clone()))?;
            services.insert(line.item_id.as_str(), service);
        }

        let mut products: HashMap<&str, Product> = HashMap::new();
        for (product_id, quantity) in &demand {
            let debited = debit_in_tx(&mut tx, product_id, *quantity).await?;
            debug!(
                product_id = %product_id,
                quantity,
                remaining = debited.expected_stock(),
                "Cart debit"
            );
            products.insert(product_id.as_str(), debited);
        }

        let cart_id = Uuid::new_v4().to_string();
        let sale_date = now();
        let barber_id = cart
            .barber_id
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(str::to_string);

        let mut records = Vec::with_capacity(cart.lines.len());
        for line in &cart.lines {
            let (product_id, service_id, item_name) = match line.kind {
                LineKind::Product => {
                    let product = products
                        .get(line.item_id.as_str())
                        .ok_or_else(|| CoreError::ProductNotFound(line.item_id.clone()))?;
                    (Some(product.id.clone()), None, product.name.clone())
                }
                LineKind::Service => {
                    let service = services
                        .get(line.item_id.as_str())
                        .ok_or_else(|| CoreError::ServiceNotFound(line.item_id.clone()))?;
                    (None, Some(service.id.clone()), service.name.clone())
                }
            };

            let total_cents = line.line_total()?.cents();
            let record = SaleRecord {
                id: Uuid::new_v4().to_string(),
                cart_id: Some(cart_id.clone()),
                line_kind: line.kind,
                product_id,
                service_id,
                item_name,
                barber_id: barber_id.clone(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price_cents,
                total_cents,
                payment_method: line.payment_method.clone(),
                status: SaleStatus::Active,
                sale_date,
                client_data: cart.client_for(line).cloned(),
                original_quantity: line.quantity,
                original_total_cents: total_cents,
                refund_reason: None,
                refunded_at: None,
            };
            tx.insert_sale(&record).await?;
            records.push(record);
        }

        let settled = SettledCart::from_records(cart_id, records, &self.ctx.catalog)?;
        let version = tx.commit().await?;

        info!(
            cart_id = %settled.cart_id,
            lines = settled.records.len(),
            total = settled.total_cents,
            version,
            "Cart settled"
        );
        self.ctx.events.publish(LedgerEvent::CartSettled {
            version,
            cart_id: settled.cart_id.clone(),
            product_ids: demand.into_keys().collect(),
            total_cents: settled.total_cents,
        });
        Ok(settled)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
