//! # Service Repository
//!
//! The service catalog (haircuts, shaves). Services are deactivated, never
//! deleted, because sale records point at them.

use shears_core::Service;
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;

use super::ts;
use crate::error::{DbError, DbResult};

const SERVICE_COLUMNS: &str = "id, name, price_cents, is_active, created_at";

pub(crate) async fn fetch_service<'e, E>(executor: E, id: &str) -> DbResult<Option<Service>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = ?1");
    let service = sqlx::query_as::<_, Service>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(service)
}

pub(crate) async fn insert_service<'e, E>(executor: E, service: &Service) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO services (id, name, price_cents, is_active, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(&service.id)
    .bind(&service.name)
    .bind(service.price_cents)
    .bind(service.is_active)
    .bind(ts(&service.created_at))
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn set_active<'e, E>(executor: E, id: &str, active: bool) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("UPDATE services SET is_active = ?2 WHERE id = ?1")
        .bind(id)
        .bind(active)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Service", id));
    }
    Ok(())
}

/// Pooled reads over the service catalog.
#[derive(Debug, Clone)]
pub struct ServiceRepository {
    pool: SqlitePool,
}

impl ServiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ServiceRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Service> {
        fetch_service(&self.pool, id)
            .await?
            .ok_or_else(|| DbError::not_found("Service", id))
    }

    /// Catalog ordered by name; `active_only` hides deactivated services.
    pub async fn list(&self, active_only: bool) -> DbResult<Vec<Service>> {
        let sql = format!(
            "SELECT {SERVICE_COLUMNS} FROM services \
             WHERE (?1 = 0 OR is_active = 1) ORDER BY name, id"
        );
        let services = sqlx::query_as::<_, Service>(&sql)
            .bind(active_only)
            .fetch_all(&self.pool)
            .await?;
        debug!(count = services.len(), active_only, "Listed services");
        Ok(services)
    }
}
