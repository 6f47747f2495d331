//! # Product Ledger
//!
//! The only code that changes a product's stock counters.
//!
//! ## Operation Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate input               (no lock, no connection)                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  locks.lock(product_id)       (per-product async mutex)                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.begin_write()             (version bump = SQLite write lock)       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  read product → StockLevels::{debit_sale, credit_refund,               │
//! │                               apply_movement} → set_levels             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  commit → publish LedgerEvent → release lock                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `*_in_tx` functions are the same read-check-write steps without the
//! lock and transaction, for settlement and refunds that already hold both.

use shears_core::validation::{
    validate_actor_id, validate_cost_cents, validate_new_product, validate_optional_text,
    validate_product_details, validate_quantity, validate_reason, validate_stock_level,
};
use shears_core::{
    CoreError, NewProduct, Product, ProductDetails, StockAdjustment, StockCount, StockMovement,
};
use shears_db::WriteTx;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::context::{fetch_product, now, LedgerContext};
use crate::error::LedgerResult;
use crate::events::LedgerEvent;

// =============================================================================
// Transaction-scoped steps
// =============================================================================

/// Sells `quantity` units. Fails with `InsufficientStock` when the product
/// cannot cover it.
pub(crate) async fn debit_in_tx(
    tx: &mut WriteTx,
    product_id: &str,
    quantity: i64,
) -> LedgerResult<Product> {
    let product = fetch_product(tx, product_id).await?;
    let levels = product
        .levels()
        .debit_sale(quantity, &product.id, &product.name)?;
    tx.set_levels(product_id, levels).await?;
    fetch_product(tx, product_id).await
}

/// Returns `quantity` units to the shelf. `sales` never goes below zero.
pub(crate) async fn credit_in_tx(
    tx: &mut WriteTx,
    product_id: &str,
    quantity: i64,
) -> LedgerResult<Product> {
    let product = fetch_product(tx, product_id).await?;
    let (levels, clamped) = product.levels().credit_refund(quantity);
    if clamped {
        warn!(
            product_id = %product_id,
            sales = product.sales,
            quantity,
            "Refund credit clamped at zero sales; ledger has drifted"
        );
    }
    tx.set_levels(product_id, levels).await?;
    fetch_product(tx, product_id).await
}

/// Applies a manual entry/exit and appends its movement row.
pub(crate) async fn movement_in_tx(
    tx: &mut WriteTx,
    adjustment: &StockAdjustment,
) -> LedgerResult<Product> {
    let product = fetch_product(tx, &adjustment.product_id).await?;
    let levels = product.levels().apply_movement(
        adjustment.kind,
        adjustment.quantity,
        &product.id,
        &product.name,
    )?;
    tx.set_levels(&product.id, levels).await?;

    let movement = StockMovement {
        id: Uuid::new_v4().to_string(),
        product_id: product.id.clone(),
        kind: adjustment.kind,
        quantity: adjustment.quantity,
        reason: adjustment.reason.trim().to_string(),
        cost_cents: adjustment.cost_cents,
        payment_method: adjustment.payment_method.clone(),
        occurred_at: now(),
        actor_id: adjustment.actor_id.clone(),
    };
    tx.insert_movement(&movement).await?;

    fetch_product(tx, &product.id).await
}

// =============================================================================
// ProductLedger
// =============================================================================

/// Stock bookkeeping and the product catalog.
#[derive(Debug, Clone)]
pub struct ProductLedger {
    ctx: LedgerContext,
}

impl ProductLedger {
    pub fn new(ctx: LedgerContext) -> Self {
        ProductLedger { ctx }
    }

    /// Stock the ledger expects on the shelf. Physical counts do not affect
    /// it.
    pub async fn get_available(&self, product_id: &str) -> LedgerResult<i64> {
        Ok(self.ctx.product(product_id).await?.expected_stock())
    }

    /// Debits stock for a sale made outside cart settlement.
    ///
    /// No sale record is written, so a later reconciliation reports the
    /// debit as drift unless the caller records the sale.
    pub async fn reserve_and_debit_for_sale(
        &self,
        product_id: &str,
        quantity: i64,
    ) -> LedgerResult<Product> {
        validate_quantity(quantity)?;

        let _locks = self.ctx.locks.lock(product_id).await;
        let mut tx = self.ctx.db.begin_write().await?;
        let product = debit_in_tx(&mut tx, product_id, quantity).await?;
        let version = tx.commit().await?;

        debug!(product_id = %product_id, quantity, version, "Stock debited");
        self.ctx.events.publish(LedgerEvent::StockAdjusted {
            version,
            product_id: product_id.to_string(),
        });
        Ok(product)
    }

    /// Credits stock back. The refund processor guards against crediting
    /// a sale twice; this does not.
    pub async fn credit_for_refund(&self, product_id: &str, quantity: i64) -> LedgerResult<Product> {
        validate_quantity(quantity)?;

        let _locks = self.ctx.locks.lock(product_id).await;
        let mut tx = self.ctx.db.begin_write().await?;
        let product = credit_in_tx(&mut tx, product_id, quantity).await?;
        let version = tx.commit().await?;

        debug!(product_id = %product_id, quantity, version, "Stock credited");
        self.ctx.events.publish(LedgerEvent::StockAdjusted {
            version,
            product_id: product_id.to_string(),
        });
        Ok(product)
    }

    /// Manual entry or exit. An exit that would take expected stock below
    /// zero fails with `InsufficientStock`.
    pub async fn apply_movement(&self, adjustment: StockAdjustment) -> LedgerResult<Product> {
        validate_quantity(adjustment.quantity)?;
        validate_reason(&adjustment.reason)?;
        validate_actor_id(&adjustment.actor_id)?;
        validate_cost_cents(adjustment.cost_cents)?;
        if let Some(method) = adjustment.payment_method.as_deref() {
            self.ctx.catalog.resolve(method)?;
        }

        let _locks = self.ctx.locks.lock(&adjustment.product_id).await;
        let mut tx = self.ctx.db.begin_write().await?;
        let product = movement_in_tx(&mut tx, &adjustment).await?;
        let version = tx.commit().await?;

        info!(
            product_id = %product.id,
            kind = adjustment.kind.as_str(),
            quantity = adjustment.quantity,
            expected = product.expected_stock(),
            version,
            "Stock movement recorded"
        );
        self.ctx.events.publish(LedgerEvent::StockAdjusted {
            version,
            product_id: product.id.clone(),
        });
        Ok(product)
    }

    /// Records a physical count. Counters are left alone; the count is kept
    /// as `real_stock` plus an audit row.
    pub async fn record_manual_count(
        &self,
        product_id: &str,
        real_stock: i64,
        notes: Option<String>,
        actor_id: &str,
    ) -> LedgerResult<Product> {
        validate_stock_level("real_stock", real_stock)?;
        validate_optional_text("notes", notes.as_deref())?;
        validate_actor_id(actor_id)?;

        let _locks = self.ctx.locks.lock(product_id).await;
        let mut tx = self.ctx.db.begin_write().await?;

        let product = fetch_product(&mut tx, product_id).await?;
        tx.set_real_stock(product_id, Some(real_stock)).await?;
        tx.insert_count(&StockCount {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            real_stock,
            expected_stock: product.expected_stock(),
            notes,
            actor_id: actor_id.to_string(),
            counted_at: now(),
        })
        .await?;
        let counted = fetch_product(&mut tx, product_id).await?;
        let version = tx.commit().await?;

        if let Some(diff) = counted.difference().filter(|d| *d != 0) {
            warn!(
                product_id = %product_id,
                real_stock,
                expected = counted.expected_stock(),
                difference = diff,
                "Physical count differs from ledger"
            );
        }
        self.ctx.events.publish(LedgerEvent::StockCounted {
            version,
            product_id: product_id.to_string(),
        });
        Ok(counted)
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    pub async fn create_product(&self, input: NewProduct) -> LedgerResult<Product> {
        validate_new_product(&input)?;

        let created = now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            code: input.code.trim().to_string(),
            category: input.category,
            initial_stock: input.initial_stock,
            entries: 0,
            exits: 0,
            sales: 0,
            min_stock: input.min_stock,
            real_stock: None,
            price_cents: input.price_cents,
            created_at: created,
            updated_at: created,
        };

        let mut tx = self.ctx.db.begin_write().await?;
        tx.insert_product(&product).await?;
        let version = tx.commit().await?;

        info!(id = %product.id, code = %product.code, "Product created");
        self.ctx.events.publish(LedgerEvent::CatalogChanged { version });
        Ok(product)
    }

    /// Changes name, code, category, threshold and price. Counters are not
    /// reachable from here.
    pub async fn update_product_details(
        &self,
        product_id: &str,
        details: ProductDetails,
    ) -> LedgerResult<Product> {
        validate_product_details(&details)?;
        let details = ProductDetails {
            name: details.name.trim().to_string(),
            code: details.code.trim().to_string(),
            ..details
        };

        let _locks = self.ctx.locks.lock(product_id).await;
        let mut tx = self.ctx.db.begin_write().await?;
        fetch_product(&mut tx, product_id).await?;
        tx.update_product_details(product_id, &details).await?;
        let product = fetch_product(&mut tx, product_id).await?;
        let version = tx.commit().await?;

        debug!(id = %product_id, version, "Product details updated");
        self.ctx.events.publish(LedgerEvent::CatalogChanged { version });
        Ok(product)
    }

    /// Deletes a product that has never moved. Anything with sales or
    /// movements fails with `ProductInUse`.
    pub async fn delete_product(&self, product_id: &str) -> LedgerResult<()> {
        let _locks = self.ctx.locks.lock(product_id).await;
        let mut tx = self.ctx.db.begin_write().await?;

        fetch_product(&mut tx, product_id).await?;
        let (sale_count, movement_count) = tx.product_references(product_id).await?;
        if sale_count > 0 || movement_count > 0 {
            return Err(CoreError::ProductInUse {
                product_id: product_id.to_string(),
                sale_count,
                movement_count,
            }
            .into());
        }

        tx.delete_product(product_id).await?;
        let version = tx.commit().await?;

        info!(id = %product_id, version, "Product deleted");
        self.ctx.events.publish(LedgerEvent::CatalogChanged { version });
        Ok(())
    }

    pub async fn get_product(&self, product_id: &str) -> LedgerResult<Product> {
        self.ctx.product(product_id).await
    }

    pub async fn list_products(&self) -> LedgerResult<Vec<Product>> {
        Ok(self.ctx.db.products().list().await?)
    }

    /// Products at or below their reorder threshold.
    pub async fn list_low_stock(&self) -> LedgerResult<Vec<Product>> {
        Ok(self.ctx.db.products().list_low_stock().await?)
    }

    /// Manual movements, newest first.
    pub async fn movement_history(&self, product_id: &str) -> LedgerResult<Vec<StockMovement>> {
        self.ctx.product(product_id).await?;
        Ok(self.ctx.db.stock().movements_for(product_id).await?)
    }

    /// Physical counts, newest first.
    pub async fn count_history(&self, product_id: &str) -> LedgerResult<Vec<StockCount>> {
        self.ctx.product(product_id).await?;
        Ok(self.ctx.db.stock().counts_for(product_id).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
