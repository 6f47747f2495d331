//! # Ledger State Repository
//!
//! The ledger version counter and the history sums reconciliation compares
//! against.
//!
//! ```text
//! recomputed.entries = Σ stock_movements.quantity  WHERE kind = 'entry'
//! recomputed.exits   = Σ stock_movements.quantity  WHERE kind = 'exit'
//! recomputed.sales   = Σ sale_records.quantity     WHERE line_kind = 'product'
//!                                                    AND status = 'active'
//! ```

use shears_core::{Product, StockLevels};
use sqlx::{FromRow, SqliteExecutor, SqlitePool};
use tracing::debug;

use super::product::list_products;
use crate::error::DbResult;

#[derive(Debug, FromRow)]
struct HistoryTotals {
    entries: i64,
    exits: i64,
    sales: i64,
}

/// Increments the version and returns the new value.
pub(crate) async fn bump_version<'e, E>(executor: E) -> DbResult<i64>
where
    E: SqliteExecutor<'e>,
{
    let version: i64 = sqlx::query_scalar(
        "UPDATE ledger_state SET version = version + 1 WHERE id = 1 RETURNING version",
    )
    .fetch_one(executor)
    .await?;
    Ok(version)
}

/// Counters as the movement and sale history says they should be.
pub(crate) async fn recompute_levels<'e, E>(executor: E, product: &Product) -> DbResult<StockLevels>
where
    E: SqliteExecutor<'e>,
{
    let totals = sqlx::query_as::<_, HistoryTotals>(
        r#"
        SELECT
            COALESCE((SELECT SUM(quantity) FROM stock_movements
                      WHERE product_id = ?1 AND kind = 'entry'), 0) AS entries,
            COALESCE((SELECT SUM(quantity) FROM stock_movements
                      WHERE product_id = ?1 AND kind = 'exit'), 0) AS exits,
            COALESCE((SELECT SUM(quantity) FROM sale_records
                      WHERE product_id = ?1 AND line_kind = 'product' AND status = 'active'), 0)
                AS sales
        "#,
    )
    .bind(&product.id)
    .fetch_one(executor)
    .await?;

    Ok(StockLevels {
        initial: product.initial_stock,
        entries: totals.entries,
        exits: totals.exits,
        sales: totals.sales,
    })
}

/// Pooled access to ledger-wide state.
#[derive(Debug, Clone)]
pub struct LedgerStateRepository {
    pool: SqlitePool,
}

impl LedgerStateRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LedgerStateRepository { pool }
    }

    /// Current ledger version. Changes after every committed write.
    pub async fn version(&self) -> DbResult<i64> {
        let version: i64 = sqlx::query_scalar("SELECT version FROM ledger_state WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(version)
    }

    /// Every product next to its recomputed counters, read from a single
    /// transaction so the pairs are mutually consistent.
    pub async fn recompute_all(&self) -> DbResult<Vec<(Product, StockLevels)>> {
        let mut tx = self.pool.begin().await?;

        let products = list_products(&mut *tx).await?;
        let mut pairs = Vec::with_capacity(products.len());
        for product in products {
            let recomputed = recompute_levels(&mut *tx, &product).await?;
            pairs.push((product, recomputed));
        }

        tx.commit().await?;
        debug!(products = pairs.len(), "Recomputed ledger from history");
        Ok(pairs)
    }
}
