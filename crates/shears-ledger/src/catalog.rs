//! Service catalog: haircuts, shaves and anything else sold without stock.

use shears_core::validation::{validate_name, validate_price_cents};
use shears_core::{CoreError, Service};
use tracing::info;
use uuid::Uuid;

use crate::context::{now, LedgerContext};
use crate::error::LedgerResult;
use crate::events::LedgerEvent;

#[derive(Debug, Clone)]
pub struct ServiceCatalog {
    ctx: LedgerContext,
}

impl ServiceCatalog {
    pub fn new(ctx: LedgerContext) -> Self {
        ServiceCatalog { ctx }
    }

    pub async fn create_service(&self, name: &str, price_cents: i64) -> LedgerResult<Service> {
        validate_name("name", name)?;
        validate_price_cents(price_cents)?;

        let service = Service {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            price_cents,
            is_active: true,
            created_at: now(),
        };

        let mut tx = self.ctx.db.begin_write().await?;
        tx.insert_service(&service).await?;
        let version = tx.commit().await?;

        info!(id = %service.id, name = %service.name, "Service created");
        self.ctx.events.publish(LedgerEvent::CatalogChanged { version });
        Ok(service)
    }

    pub async fn list_services(&self, active_only: bool) -> LedgerResult<Vec<Service>> {
        Ok(self.ctx.db.services().list(active_only).await?)
    }

    /// Hides a service from new carts. Past sales keep their records.
    pub async fn deactivate_service(&self, service_id: &str) -> LedgerResult<Service> {
        let mut tx = self.ctx.db.begin_write().await?;
        let service = tx
            .fetch_service(service_id)
            .await?
            .ok_or_else(|| CoreError::ServiceNotFound(service_id.to_string()))?;
        tx.set_service_active(service_id, false).await?;
        let version = tx.commit().await?;

        info!(id = %service_id, "Service deactivated");
        self.ctx.events.publish(LedgerEvent::CatalogChanged { version });
        Ok(Service {
            is_active: false,
            ..service
        })
    }
}
