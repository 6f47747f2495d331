//! # Write Transactions
//!
//! Every ledger mutation runs inside a [`WriteTx`].
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  db.begin_write()                                                       │
//! │    BEGIN                                                                │
//! │    UPDATE ledger_state SET version = version + 1   ← takes write lock   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  tx.fetch_product / tx.set_levels / tx.insert_sale / ...                │
//! │       │                                                                 │
//! │       ├── tx.commit()  → COMMIT, returns the new version               │
//! │       │                                                                 │
//! │       └── drop(tx)     → ROLLBACK, nothing happened                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Callers that read-check-write a product must hold that product's lock
//! (shears-ledger) for the whole life of the transaction.

use chrono::{DateTime, Utc};
use shears_core::{
    InventorySnapshot, Product, ProductDetails, SaleRecord, Service, StockCount, StockLevels,
    StockMovement,
};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

use super::{ledger_state, product, sale, service, snapshot, stock};
use crate::error::DbResult;

/// An open write transaction on the ledger.
pub struct WriteTx {
    tx: Transaction<'static, Sqlite>,
    version: i64,
}

impl WriteTx {
    pub(crate) async fn begin(pool: &SqlitePool) -> DbResult<Self> {
        let mut tx = pool.begin().await?;
        let version = ledger_state::bump_version(&mut *tx).await?;
        debug!(version, "Write transaction started");
        Ok(WriteTx { tx, version })
    }

    /// Version this transaction will publish on commit.
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Commits and returns the new ledger version.
    pub async fn commit(self) -> DbResult<i64> {
        self.tx.commit().await?;
        debug!(version = self.version, "Write transaction committed");
        Ok(self.version)
    }

    // =========================================================================
    // Products
    // =========================================================================

    pub async fn fetch_product(&mut self, id: &str) -> DbResult<Option<Product>> {
        product::fetch_product(&mut *self.tx, id).await
    }

    pub async fn list_products(&mut self) -> DbResult<Vec<Product>> {
        product::list_products(&mut *self.tx).await
    }

    pub async fn insert_product(&mut self, p: &Product) -> DbResult<()> {
        product::insert_product(&mut *self.tx, p).await
    }

    pub async fn update_product_details(&mut self, id: &str, details: &ProductDetails) -> DbResult<()> {
        product::update_details(&mut *self.tx, id, details).await
    }

    pub async fn delete_product(&mut self, id: &str) -> DbResult<()> {
        product::delete_product(&mut *self.tx, id).await
    }

    /// `(sale_records, stock_movements)` referencing the product.
    pub async fn product_references(&mut self, id: &str) -> DbResult<(i64, i64)> {
        product::count_references(&mut *self.tx, id).await
    }

    /// Overwrites `entries`, `exits` and `sales`.
    pub async fn set_levels(&mut self, id: &str, levels: StockLevels) -> DbResult<()> {
        product::set_levels(&mut *self.tx, id, levels).await
    }

    pub async fn set_real_stock(&mut self, id: &str, real_stock: Option<i64>) -> DbResult<()> {
        product::set_real_stock(&mut *self.tx, id, real_stock).await
    }

    /// Counters rebuilt from movement and sale history.
    pub async fn recompute_levels(&mut self, p: &Product) -> DbResult<StockLevels> {
        ledger_state::recompute_levels(&mut *self.tx, p).await
    }

    // =========================================================================
    // Movements and counts
    // =========================================================================

    pub async fn insert_movement(&mut self, movement: &StockMovement) -> DbResult<()> {
        stock::insert_movement(&mut *self.tx, movement).await
    }

    pub async fn insert_count(&mut self, count: &StockCount) -> DbResult<()> {
        stock::insert_count(&mut *self.tx, count).await
    }

    // =========================================================================
    // Services
    // =========================================================================

    pub async fn fetch_service(&mut self, id: &str) -> DbResult<Option<Service>> {
        service::fetch_service(&mut *self.tx, id).await
    }

    pub async fn insert_service(&mut self, s: &Service) -> DbResult<()> {
        service::insert_service(&mut *self.tx, s).await
    }

    pub async fn set_service_active(&mut self, id: &str, active: bool) -> DbResult<()> {
        service::set_active(&mut *self.tx, id, active).await
    }

    // =========================================================================
    // Sales
    // =========================================================================

    pub async fn insert_sale(&mut self, record: &SaleRecord) -> DbResult<()> {
        sale::insert_sale(&mut *self.tx, record).await
    }

    pub async fn fetch_sale(&mut self, id: &str) -> DbResult<Option<SaleRecord>> {
        sale::fetch_sale(&mut *self.tx, id).await
    }

    /// Active → refunded. False when the record was not active.
    pub async fn mark_refunded(&mut self, id: &str, reason: &str, at: &DateTime<Utc>) -> DbResult<bool> {
        sale::mark_refunded(&mut *self.tx, id, reason, at).await
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    pub async fn insert_snapshot(&mut self, snap: &InventorySnapshot) -> DbResult<()> {
        snapshot::insert_header(&mut *self.tx, snap).await?;
        for item in &snap.items {
            snapshot::insert_item(&mut *self.tx, &snap.id, item).await?;
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
