//! # Stock Repository
//!
//! Append-only stock movements and physical count audit rows.

use shears_core::{StockCount, StockMovement};
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;

use super::ts;
use crate::error::DbResult;

const MOVEMENT_COLUMNS: &str =
    "id, product_id, kind, quantity, reason, cost_cents, payment_method, occurred_at, actor_id";

const COUNT_COLUMNS: &str =
    "id, product_id, real_stock, expected_stock, notes, actor_id, counted_at";

pub(crate) async fn insert_movement<'e, E>(executor: E, movement: &StockMovement) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO stock_movements (
            id, product_id, kind, quantity, reason, cost_cents, payment_method,
            occurred_at, actor_id
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.product_id)
    .bind(movement.kind)
    .bind(movement.quantity)
    .bind(&movement.reason)
    .bind(movement.cost_cents)
    .bind(&movement.payment_method)
    .bind(ts(&movement.occurred_at))
    .bind(&movement.actor_id)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn insert_count<'e, E>(executor: E, count: &StockCount) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO stock_counts (
            id, product_id, real_stock, expected_stock, notes, actor_id, counted_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&count.id)
    .bind(&count.product_id)
    .bind(count.real_stock)
    .bind(count.expected_stock)
    .bind(&count.notes)
    .bind(&count.actor_id)
    .bind(ts(&count.counted_at))
    .execute(executor)
    .await?;
    Ok(())
}

/// Pooled reads over movements and counts.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Movement history for a product, newest first.
    pub async fn movements_for(&self, product_id: &str) -> DbResult<Vec<StockMovement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements \
             WHERE product_id = ?1 ORDER BY occurred_at DESC, id DESC"
        );
        let movements = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;
        debug!(product_id = %product_id, count = movements.len(), "Listed stock movements");
        Ok(movements)
    }

    /// Physical count history for a product, newest first.
    pub async fn counts_for(&self, product_id: &str) -> DbResult<Vec<StockCount>> {
        let sql = format!(
            "SELECT {COUNT_COLUMNS} FROM stock_counts \
             WHERE product_id = ?1 ORDER BY counted_at DESC, id DESC"
        );
        let counts = sqlx::query_as::<_, StockCount>(&sql)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(counts)
    }
}
