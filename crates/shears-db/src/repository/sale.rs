//! # Sale Repository
//!
//! Settled sale lines.
//!
//! ## Refund Transition
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UPDATE sale_records                                                    │
//! │  SET status = 'refunded', refund_reason = ?, refunded_at = ?            │
//! │  WHERE id = ? AND status = 'active'        ← only one caller can win    │
//! │                                                                         │
//! │  rows_affected = 1  → this call refunded the line                      │
//! │  rows_affected = 0  → already refunded (or missing)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `client_data` is stored as JSON text and decoded on the way out.

use chrono::{DateTime, Utc};
use shears_core::{ClientData, LineKind, SaleRecord, SaleStatus};
use sqlx::{FromRow, SqliteExecutor, SqlitePool};
use tracing::debug;

use super::ts;
use crate::error::{DbError, DbResult};

const SALE_COLUMNS: &str = "id, cart_id, line_kind, product_id, service_id, item_name, barber_id, \
     quantity, unit_price_cents, total_cents, payment_method, status, sale_date, client_data, \
     original_quantity, original_total_cents, refund_reason, refunded_at";

/// Row shape of `sale_records`.
#[derive(Debug, FromRow)]
struct SaleRecordRow {
    id: String,
    cart_id: Option<String>,
    line_kind: LineKind,
    product_id: Option<String>,
    service_id: Option<String>,
    item_name: String,
    barber_id: Option<String>,
    quantity: i64,
    unit_price_cents: i64,
    total_cents: i64,
    payment_method: String,
    status: SaleStatus,
    sale_date: DateTime<Utc>,
    client_data: Option<String>,
    original_quantity: i64,
    original_total_cents: i64,
    refund_reason: Option<String>,
    refunded_at: Option<DateTime<Utc>>,
}

impl TryFrom<SaleRecordRow> for SaleRecord {
    type Error = DbError;

    fn try_from(row: SaleRecordRow) -> DbResult<Self> {
        let client_data = row
            .client_data
            .as_deref()
            .map(serde_json::from_str::<ClientData>)
            .transpose()?;

        Ok(SaleRecord {
            id: row.id,
            cart_id: row.cart_id,
            line_kind: row.line_kind,
            product_id: row.product_id,
            service_id: row.service_id,
            item_name: row.item_name,
            barber_id: row.barber_id,
            quantity: row.quantity,
            unit_price_cents: row.unit_price_cents,
            total_cents: row.total_cents,
            payment_method: row.payment_method,
            status: row.status,
            sale_date: row.sale_date,
            client_data,
            original_quantity: row.original_quantity,
            original_total_cents: row.original_total_cents,
            refund_reason: row.refund_reason,
            refunded_at: row.refunded_at,
        })
    }
}

fn into_records(rows: Vec<SaleRecordRow>) -> DbResult<Vec<SaleRecord>> {
    rows.into_iter().map(SaleRecord::try_from).collect()
}

// =============================================================================
// Shared Queries
// =============================================================================

pub(crate) async fn insert_sale<'e, E>(executor: E, sale: &SaleRecord) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    let client_data = sale
        .client_data
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    sqlx::query(
        r#"
        INSERT INTO sale_records (
            id, cart_id, line_kind, product_id, service_id, item_name, barber_id,
            quantity, unit_price_cents, total_cents, payment_method, status, sale_date,
            client_data, original_quantity, original_total_cents, refund_reason, refunded_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.cart_id)
    .bind(sale.line_kind)
    .bind(&sale.product_id)
    .bind(&sale.service_id)
    .bind(&sale.item_name)
    .bind(&sale.barber_id)
    .bind(sale.quantity)
    .bind(sale.unit_price_cents)
    .bind(sale.total_cents)
    .bind(&sale.payment_method)
    .bind(sale.status)
    .bind(ts(&sale.sale_date))
    .bind(client_data)
    .bind(sale.original_quantity)
    .bind(sale.original_total_cents)
    .bind(&sale.refund_reason)
    .bind(sale.refunded_at.as_ref().map(ts))
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn fetch_sale<'e, E>(executor: E, id: &str) -> DbResult<Option<SaleRecord>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT {SALE_COLUMNS} FROM sale_records WHERE id = ?1");
    sqlx::query_as::<_, SaleRecordRow>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?
        .map(SaleRecord::try_from)
        .transpose()
}

/// Flips an active record to refunded. Returns false if it was not active.
pub(crate) async fn mark_refunded<'e, E>(
    executor: E,
    id: &str,
    reason: &str,
    at: &DateTime<Utc>,
) -> DbResult<bool>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE sale_records
        SET status = 'refunded', refund_reason = ?2, refunded_at = ?3
        WHERE id = ?1 AND status = 'active'
        "#,
    )
    .bind(id)
    .bind(reason)
    .bind(ts(at))
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

// =============================================================================
// Repository
// =============================================================================

/// Pooled reads over sale records.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<SaleRecord> {
        debug!(id = %id, "Getting sale record");
        fetch_sale(&self.pool, id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", id))
    }

    /// Records with `from <= sale_date <= to`, newest first. Either bound
    /// may be open.
    pub async fn list_between(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> DbResult<Vec<SaleRecord>> {
        let sql = format!(
            "SELECT {SALE_COLUMNS} FROM sale_records \
             WHERE (?1 IS NULL OR sale_date >= ?1) AND (?2 IS NULL OR sale_date <= ?2) \
             ORDER BY sale_date DESC, id"
        );
        let rows = sqlx::query_as::<_, SaleRecordRow>(&sql)
            .bind(from.as_ref().map(ts))
            .bind(to.as_ref().map(ts))
            .fetch_all(&self.pool)
            .await?;
        debug!(count = rows.len(), "Listed sale records");
        into_records(rows)
    }

    /// Every line of one cart, in insertion order.
    pub async fn list_for_cart(&self, cart_id: &str) -> DbResult<Vec<SaleRecord>> {
        let sql = format!(
            "SELECT {SALE_COLUMNS} FROM sale_records WHERE cart_id = ?1 ORDER BY rowid"
        );
        let rows = sqlx::query_as::<_, SaleRecordRow>(&sql)
            .bind(cart_id)
            .fetch_all(&self.pool)
            .await?;
        into_records(rows)
    }
}
