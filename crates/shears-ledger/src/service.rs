//! # Ledger Service
//!
//! The single entry point a transport (desktop shell, HTTP, CLI) calls.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           LedgerService                                 │
//! │                                                                         │
//! │  create_cart_sale ──► CartSettlementEngine                             │
//! │  refund_sale      ──► RefundProcessor                                  │
//! │  adjust_stock     ──► ProductLedger::apply_movement                    │
//! │  record_manual_count, products, low stock, history ──► ProductLedger   │
//! │  create/list/deactivate service ──► ServiceCatalog                     │
//! │  reconcile        ──► ConsistencyReconciler                            │
//! │  snapshots        ──► SnapshotManager                                  │
//! │  list_invoices, sales ──► InvoiceService                               │
//! │                                                                         │
//! │  all share one LedgerContext (pool · locks · events · payment catalog) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use shears_core::cart::{CartRequest, SettledCart};
use shears_core::invoice::{Invoice, InvoiceAggregator};
use shears_core::reconcile::{ReconcileMode, ReconcileOutcome};
use shears_core::{
    InventorySnapshot, NewProduct, PaymentMethodCatalog, Product, ProductDetails, SaleRecord,
    Service, StockAdjustment, StockCount, StockMovement,
};
use shears_db::{Database, SnapshotSummary};
use tokio::sync::broadcast;
use tracing::info;

use crate::catalog::ServiceCatalog;
use crate::config::LedgerConfig;
use crate::context::LedgerContext;
use crate::error::LedgerResult;
use crate::events::LedgerEvent;
use crate::invoices::{InvoiceFilter, InvoiceService};
use crate::product_ledger::ProductLedger;
use crate::reconcile::ConsistencyReconciler;
use crate::refund::RefundProcessor;
use crate::settlement::CartSettlementEngine;
use crate::snapshot::{RestoreOutcome, SnapshotManager};

/// Transport-independent ledger API.
#[derive(Debug, Clone)]
pub struct LedgerService {
    ctx: LedgerContext,
    products: ProductLedger,
    settlement: CartSettlementEngine,
    refunds: RefundProcessor,
    reconciler: ConsistencyReconciler,
    snapshots: SnapshotManager,
    services: ServiceCatalog,
    invoices: InvoiceService,
}

impl LedgerService {
    /// Opens the configured database (running migrations) and wires every
    /// component to it.
    pub async fn open(config: &LedgerConfig) -> LedgerResult<Self> {
        let db = Database::new(config.database.db_config()).await?;
        Ok(Self::with_database(db, config))
    }

    /// Wires the components to an already open database.
    pub fn with_database(db: Database, config: &LedgerConfig) -> Self {
        let catalog = config.payment_catalog();
        let aggregator = InvoiceAggregator::for_store(
            config.store.tax_registered,
            config.store.tax_rate(),
            catalog.clone(),
        );
        let ctx = LedgerContext::new(db, catalog);

        info!(
            store = %config.store.name,
            tax_bps = aggregator.tax_rate().bps(),
            "Ledger service ready"
        );

        LedgerService {
            products: ProductLedger::new(ctx.clone()),
            settlement: CartSettlementEngine::new(ctx.clone()),
            refunds: RefundProcessor::new(ctx.clone()),
            reconciler: ConsistencyReconciler::new(ctx.clone()),
            snapshots: SnapshotManager::new(ctx.clone()),
            services: ServiceCatalog::new(ctx.clone()),
            invoices: InvoiceService::new(ctx.clone(), aggregator),
            ctx,
        }
    }

    // =========================================================================
    // Sales
    // =========================================================================

    pub async fn create_cart_sale(&self, cart: CartRequest) -> LedgerResult<SettledCart> {
        self.settlement.settle(cart).await
    }

    pub async fn refund_sale(&self, sale_id: &str, reason: &str) -> LedgerResult<SaleRecord> {
        self.refunds.refund(sale_id, reason).await
    }

    pub async fn get_sale(&self, sale_id: &str) -> LedgerResult<SaleRecord> {
        self.invoices.get_sale(sale_id).await
    }

    pub async fn list_sales(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> LedgerResult<Vec<SaleRecord>> {
        self.invoices.list_sales(from, to).await
    }

    pub async fn list_invoices(&self, filter: InvoiceFilter) -> LedgerResult<Vec<Invoice>> {
        self.invoices.list_invoices(filter).await
    }

    // =========================================================================
    // Stock
    // =========================================================================

    pub async fn get_available(&self, product_id: &str) -> LedgerResult<i64> {
        self.products.get_available(product_id).await
    }

    pub async fn adjust_stock(&self, adjustment: StockAdjustment) -> LedgerResult<Product> {
        self.products.apply_movement(adjustment).await
    }

    pub async fn record_manual_count(
        &self,
        product_id: &str,
        real_stock: i64,
        notes: Option<String>,
        actor_id: &str,
    ) -> LedgerResult<Product> {
        self.products
            .record_manual_count(product_id, real_stock, notes, actor_id)
            .await
    }

    pub async fn movement_history(&self, product_id: &str) -> LedgerResult<Vec<StockMovement>> {
        self.products.movement_history(product_id).await
    }

    pub async fn count_history(&self, product_id: &str) -> LedgerResult<Vec<StockCount>> {
        self.products.count_history(product_id).await
    }

    pub async fn list_low_stock(&self) -> LedgerResult<Vec<Product>> {
        self.products.list_low_stock().await
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    pub async fn create_product(&self, input: NewProduct) -> LedgerResult<Product> {
        self.products.create_product(input).await
    }

    pub async fn update_product_details(
        &self,
        product_id: &str,
        details: ProductDetails,
    ) -> LedgerResult<Product> {
        self.products.update_product_details(product_id, details).await
    }

    pub async fn delete_product(&self, product_id: &str) -> LedgerResult<()> {
        self.products.delete_product(product_id).await
    }

    pub async fn get_product(&self, product_id: &str) -> LedgerResult<Product> {
        self.products.get_product(product_id).await
    }

    pub async fn list_products(&self) -> LedgerResult<Vec<Product>> {
        self.products.list_products().await
    }

    pub async fn create_service(&self, name: &str, price_cents: i64) -> LedgerResult<Service> {
        self.services.create_service(name, price_cents).await
    }

    pub async fn list_services(&self, active_only: bool) -> LedgerResult<Vec<Service>> {
        self.services.list_services(active_only).await
    }

    pub async fn deactivate_service(&self, service_id: &str) -> LedgerResult<Service> {
        self.services.deactivate_service(service_id).await
    }

    pub fn payment_methods(&self) -> &PaymentMethodCatalog {
        &self.ctx.catalog
    }

    // =========================================================================
    // Reconciliation and snapshots
    // =========================================================================

    pub async fn reconcile(&self, mode: ReconcileMode) -> LedgerResult<ReconcileOutcome> {
        self.reconciler.reconcile(mode).await
    }

    pub async fn create_snapshot(
        &self,
        actor_id: &str,
        note: Option<String>,
    ) -> LedgerResult<InventorySnapshot> {
        self.snapshots.create_snapshot(actor_id, note).await
    }

    pub async fn list_snapshots(&self) -> LedgerResult<Vec<SnapshotSummary>> {
        self.snapshots.list_snapshots().await
    }

    pub async fn get_snapshot(&self, snapshot_id: &str) -> LedgerResult<InventorySnapshot> {
        self.snapshots.get_snapshot(snapshot_id).await
    }

    pub async fn restore_snapshot(
        &self,
        snapshot_id: &str,
        actor_id: &str,
    ) -> LedgerResult<RestoreOutcome> {
        self.snapshots.restore_snapshot(snapshot_id, actor_id).await
    }

    // =========================================================================
    // Change tracking
    // =========================================================================

    /// Increases with every committed write.
    pub async fn ledger_version(&self) -> LedgerResult<i64> {
        Ok(self.ctx.db.ledger_state().version().await?)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.ctx.events.subscribe()
    }

    pub async fn close(&self) {
        self.ctx.db.close().await;
    }
}
