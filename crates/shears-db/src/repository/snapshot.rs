//! # Snapshot Repository
//!
//! Inventory snapshots: a header row plus one item row per product.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shears_core::{InventorySnapshot, SnapshotItem};
use sqlx::{FromRow, SqliteExecutor, SqlitePool};
use tracing::debug;

use super::ts;
use crate::error::{DbError, DbResult};

const ITEM_COLUMNS: &str = "product_id, product_name, code, initial_stock, entries, exits, \
     sales, real_stock, expected_stock";

/// Snapshot header without its items, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SnapshotSummary {
    pub id: String,
    pub taken_at: DateTime<Utc>,
    pub actor_id: String,
    pub note: Option<String>,
    pub item_count: i64,
}

#[derive(Debug, FromRow)]
struct SnapshotHeader {
    id: String,
    taken_at: DateTime<Utc>,
    actor_id: String,
    note: Option<String>,
}

/// Writes the header row. Items go through [`insert_item`].
pub(crate) async fn insert_header<'e, E>(executor: E, snapshot: &InventorySnapshot) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO inventory_snapshots (id, taken_at, actor_id, note) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(&snapshot.id)
    .bind(ts(&snapshot.taken_at))
    .bind(&snapshot.actor_id)
    .bind(&snapshot.note)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn insert_item<'e, E>(executor: E, snapshot_id: &str, item: &SnapshotItem) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO inventory_snapshot_items (
            snapshot_id, product_id, product_name, code, initial_stock, entries, exits,
            sales, real_stock, expected_stock
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(snapshot_id)
    .bind(&item.product_id)
    .bind(&item.product_name)
    .bind(&item.code)
    .bind(item.initial_stock)
    .bind(item.entries)
    .bind(item.exits)
    .bind(item.sales)
    .bind(item.real_stock)
    .bind(item.expected_stock)
    .execute(executor)
    .await?;
    Ok(())
}

/// Pooled reads over snapshots.
#[derive(Debug, Clone)]
pub struct SnapshotRepository {
    pool: SqlitePool,
}

impl SnapshotRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SnapshotRepository { pool }
    }

    /// Snapshot with all of its items, `NotFound` if missing.
    pub async fn get_by_id(&self, id: &str) -> DbResult<InventorySnapshot> {
        let header = sqlx::query_as::<_, SnapshotHeader>(
            "SELECT id, taken_at, actor_id, note FROM inventory_snapshots WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Snapshot", id))?;

        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_snapshot_items \
             WHERE snapshot_id = ?1 ORDER BY product_name, product_id"
        );
        let items = sqlx::query_as::<_, SnapshotItem>(&sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;

        debug!(id = %id, items = items.len(), "Loaded snapshot");
        Ok(InventorySnapshot {
            id: header.id,
            taken_at: header.taken_at,
            actor_id: header.actor_id,
            note: header.note,
            items,
        })
    }

    /// Snapshot headers, newest first.
    pub async fn list(&self) -> DbResult<Vec<SnapshotSummary>> {
        let summaries = sqlx::query_as::<_, SnapshotSummary>(
            r#"
            SELECT s.id, s.taken_at, s.actor_id, s.note,
                   (SELECT COUNT(*) FROM inventory_snapshot_items i WHERE i.snapshot_id = s.id)
                       AS item_count
            FROM inventory_snapshots s
            ORDER BY s.taken_at DESC, s.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(summaries)
    }
}
