//! Shared handles every ledger component works through.

use chrono::{DateTime, SubsecRound, Utc};
use shears_core::{CoreError, PaymentMethodCatalog, Product};
use shears_db::{Database, DbError, WriteTx};

use crate::error::{LedgerError, LedgerResult};
use crate::events::EventBus;
use crate::locks::ProductLocks;

/// Database, lock registry, event bus and payment catalog.
///
/// Cheap to clone; clones share the same pool, locks and channel.
#[derive(Debug, Clone)]
pub struct LedgerContext {
    pub db: Database,
    pub locks: ProductLocks,
    pub events: EventBus,
    pub catalog: PaymentMethodCatalog,
}

impl LedgerContext {
    pub fn new(db: Database, catalog: PaymentMethodCatalog) -> Self {
        LedgerContext {
            db,
            locks: ProductLocks::new(),
            events: EventBus::new(),
            catalog,
        }
    }

    /// Pooled read of one product.
    pub(crate) async fn product(&self, id: &str) -> LedgerResult<Product> {
        self.db
            .products()
            .get_by_id(id)
            .await
            .map_err(|e| not_found_as(e, || CoreError::ProductNotFound(id.to_string())))
    }
}

/// Product read inside a write transaction. Missing rows become
/// `ProductNotFound`.
pub(crate) async fn fetch_product(tx: &mut WriteTx, id: &str) -> LedgerResult<Product> {
    tx.fetch_product(id)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(id.to_string()).into())
}

/// Replaces a storage `NotFound` with the matching domain error.
pub(crate) fn not_found_as(err: DbError, domain: impl FnOnce() -> CoreError) -> LedgerError {
    match err {
        DbError::NotFound { .. } => LedgerError::Domain(domain()),
        other => LedgerError::Storage(other),
    }
}

/// Current time at the precision timestamps are stored with, so values
/// handed back to callers equal what a later read returns.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
