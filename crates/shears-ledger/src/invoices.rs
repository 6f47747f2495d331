//! Invoice listing over stored sale records.
//!
//! The date range narrows the SQL read; search runs on the grouped
//! invoices, so a hit on one line returns the whole invoice.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shears_core::invoice::{Invoice, InvoiceAggregator};
use shears_core::validation::{validate_date_range, validate_search_query};
use shears_core::{CoreError, SaleRecord};
use tracing::debug;

use crate::context::{not_found_as, LedgerContext};
use crate::error::LedgerResult;

/// Which invoices to list. Everything when empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct InvoiceService {
    ctx: LedgerContext,
    aggregator: InvoiceAggregator,
}

impl InvoiceService {
    pub fn new(ctx: LedgerContext, aggregator: InvoiceAggregator) -> Self {
        InvoiceService { ctx, aggregator }
    }

    /// Invoices in the filter, newest first.
    ///
    /// A cart that straddles a range bound only contributes the lines
    /// inside the range.
    pub async fn list_invoices(&self, filter: InvoiceFilter) -> LedgerResult<Vec<Invoice>> {
        validate_date_range(filter.from, filter.to)?;
        let search = filter
            .search
            .as_deref()
            .map(validate_search_query)
            .transpose()?
            .unwrap_or_default();

        let records = self.list_sales(filter.from, filter.to).await?;
        let invoices = self.aggregator.aggregate_matching(records, &search);

        debug!(count = invoices.len(), search = %search, "Listed invoices");
        Ok(invoices)
    }

    /// Raw sale records in a date range, newest first.
    pub async fn list_sales(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> LedgerResult<Vec<SaleRecord>> {
        validate_date_range(from, to)?;
        Ok(self.ctx.db.sales().list_between(from, to).await?)
    }

    pub async fn get_sale(&self, sale_id: &str) -> LedgerResult<SaleRecord> {
        self.ctx
            .db
            .sales()
            .get_by_id(sale_id)
            .await
            .map_err(|e| not_found_as(e, || CoreError::SaleNotFound(sale_id.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::product_ledger::ProductLedger;
    use crate::settlement::CartSettlementEngine;
    use crate::test_support::{catalog, context, new_product, product_line};
    use chrono::Duration;
    use shears_core::cart::CartRequest;
    use shears_core::{ClientData, TaxRate};

    async fn setup() -> (InvoiceService, CartSettlementEngine, String) {
        let ctx = context().await;
        let p = ProductLedger::new(ctx.clone())
            .create_product(new_product("POM-01", "Clay Pomade", 50))
            .await
            .unwrap();
        let invoices = InvoiceService::new(
            ctx.clone(),
            InvoiceAggregator::new(TaxRate::from_bps(1900), catalog()),
        );
        (invoices, CartSettlementEngine::new(ctx), p.id)
    }

    fn cart(product_id: &str, client: Option<&str>) -> CartRequest {
        CartRequest {
            barber_id: Some("barber-1".into()),
            client_data: client.map(|name| ClientData {
                name: name.to_string(),
                ..Default::default()
            }),
            lines: vec![product_line(product_id, 1, 11900, "cash")],
        }
    }

    #[tokio::test]
    async fn test_one_invoice_per_cart() {
        let (invoices, engine, pid) = setup().await;
        let first = engine.settle(cart(&pid, None)).await.unwrap();
        let second = engine.settle(cart(&pid, Some("Dana Ruiz"))).await.unwrap();

        let listed = invoices.list_invoices(InvoiceFilter::default()).await.unwrap();
        assert_eq!(listed.len(), 2);
        let ids: Vec<_> = listed.iter().map(|i| i.cart_id.clone()).collect();
        assert!(ids.contains(&Some(first.cart_id)));
        assert!(ids.contains(&Some(second.cart_id)));

        for invoice in &listed {
            assert_eq!(invoice.total_cents, 11900);
            assert_eq!(invoice.subtotal_cents, 10000);
            assert_eq!(invoice.tax_cents, 1900);
        }
    }

    #[tokio::test]
    async fn test_search_and_range() {
        let (invoices, engine, pid) = setup().await;
        engine.settle(cart(&pid, None)).await.unwrap();
        engine.settle(cart(&pid, Some("Dana Ruiz"))).await.unwrap();

        let hits = invoices
            .list_invoices(InvoiceFilter {
                search: Some("  dana ".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);

        let past = invoices
            .list_invoices(InvoiceFilter {
                to: Some(Utc::now() - Duration::days(1)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(past.is_empty());

        let err = invoices
            .list_invoices(InvoiceFilter {
                from: Some(Utc::now()),
                to: Some(Utc::now() - Duration::days(1)),
                search: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_get_sale() {
        let (invoices, engine, pid) = setup().await;
        let settled = engine.settle(cart(&pid, None)).await.unwrap();

        let record = invoices.get_sale(&settled.records[0].id).await.unwrap();
        assert_eq!(record, settled.records[0]);

        let err = invoices.get_sale("missing").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::SaleNotFound);
    }
}
