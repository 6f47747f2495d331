//! # Product Repository
//!
//! Product rows and their stock counters.
//!
//! Counter updates (`entries`, `exits`, `sales`, `real_stock`) are only
//! reachable through [`WriteTx`](super::write_tx::WriteTx); this repository
//! reads.

use chrono::Utc;
use shears_core::{Product, ProductDetails, StockLevels};
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;

use super::ts;
use crate::error::{DbError, DbResult};

const PRODUCT_COLUMNS: &str = "id, name, code, category, initial_stock, entries, exits, sales, \
     min_stock, real_stock, price_cents, created_at, updated_at";

// =============================================================================
// Shared Queries
// =============================================================================

pub(crate) async fn fetch_product<'e, E>(executor: E, id: &str) -> DbResult<Option<Product>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(product)
}

pub(crate) async fn list_products<'e, E>(executor: E) -> DbResult<Vec<Product>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name, id");
    let products = sqlx::query_as::<_, Product>(&sql)
        .fetch_all(executor)
        .await?;
    Ok(products)
}

pub(crate) async fn insert_product<'e, E>(executor: E, product: &Product) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO products (
            id, name, code, category, initial_stock, entries, exits, sales,
            min_stock, real_stock, price_cents, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
    )
    .bind(&product.id)
    .bind(&product.name)
    .bind(&product.code)
    .bind(&product.category)
    .bind(product.initial_stock)
    .bind(product.entries)
    .bind(product.exits)
    .bind(product.sales)
    .bind(product.min_stock)
    .bind(product.real_stock)
    .bind(product.price_cents)
    .bind(ts(&product.created_at))
    .bind(ts(&product.updated_at))
    .execute(executor)
    .await
    .map_err(|e| duplicate_code(e, &product.code))?;
    Ok(())
}

pub(crate) async fn update_details<'e, E>(
    executor: E,
    id: &str,
    details: &ProductDetails,
) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE products
        SET name = ?2, code = ?3, category = ?4, min_stock = ?5, price_cents = ?6,
            updated_at = ?7
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(&details.name)
    .bind(&details.code)
    .bind(&details.category)
    .bind(details.min_stock)
    .bind(details.price_cents)
    .bind(ts(&Utc::now()))
    .execute(executor)
    .await
    .map_err(|e| duplicate_code(e, &details.code))?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", id));
    }
    Ok(())
}

/// Overwrites the three movable counters.
pub(crate) async fn set_levels<'e, E>(executor: E, id: &str, levels: StockLevels) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE products
        SET entries = ?2, exits = ?3, sales = ?4, updated_at = ?5
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(levels.entries)
    .bind(levels.exits)
    .bind(levels.sales)
    .bind(ts(&Utc::now()))
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", id));
    }
    Ok(())
}

pub(crate) async fn set_real_stock<'e, E>(
    executor: E,
    id: &str,
    real_stock: Option<i64>,
) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("UPDATE products SET real_stock = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(id)
        .bind(real_stock)
        .bind(ts(&Utc::now()))
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", id));
    }
    Ok(())
}

/// `(sale_records, stock_movements)` rows pointing at the product.
pub(crate) async fn count_references<'e, E>(executor: E, id: &str) -> DbResult<(i64, i64)>
where
    E: SqliteExecutor<'e>,
{
    let counts: (i64, i64) = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM sale_records WHERE product_id = ?1),
            (SELECT COUNT(*) FROM stock_movements WHERE product_id = ?1)
        "#,
    )
    .bind(id)
    .fetch_one(executor)
    .await?;
    Ok(counts)
}

pub(crate) async fn delete_product<'e, E>(executor: E, id: &str) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM products WHERE id = ?1")
        .bind(id)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", id));
    }
    Ok(())
}

fn duplicate_code(err: sqlx::Error, code: &str) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { field, .. } => DbError::duplicate(field, code),
        other => other,
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Pooled reads over products.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by id, `NotFound` if missing.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Product> {
        debug!(id = %id, "Getting product by ID");
        fetch_product(&self.pool, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Gets a product by shelf code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        debug!(code = %code, "Getting product by code");
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE code = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// All products ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let products = list_products(&self.pool).await?;
        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Products whose expected stock is at or below their reorder threshold.
    pub async fn list_low_stock(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE initial_stock + entries - exits - sales <= min_stock \
             ORDER BY (initial_stock + entries - exits - sales) - min_stock, name"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;
        debug!(count = products.len(), "Listed low-stock products");
        Ok(products)
    }

    /// Number of products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
