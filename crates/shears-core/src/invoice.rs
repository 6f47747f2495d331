//! # Invoice Aggregation
//!
//! Rebuilds carts and invoices from the flat list of sale records.
//!
//! ## Grouping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sale_records (flat)                                                    │
//! │  ┌──────────┬─────────┬────────┬──────────────────────┐                 │
//! │  │ id       │ cart_id │ barber │ sale_date            │                 │
//! │  ├──────────┼─────────┼────────┼──────────────────────┤                 │
//! │  │ s-1      │ c-7     │ b-1    │ 10:00:59             │──┐ cart c-7     │
//! │  │ s-2      │ c-7     │ b-1    │ 10:01:00             │──┘              │
//! │  │ s-3      │ (none)  │ b-2    │ 11:30:05             │──┐ b-2 @ 11:30  │
//! │  │ s-4      │ (none)  │ b-2    │ 11:30:15             │──┘              │
//! │  │ s-5      │ (none)  │ b-2    │ 11:31:15             │──── b-2 @ 11:31 │
//! │  └──────────┴─────────┴────────┴──────────────────────┘                 │
//! │                                                                         │
//! │  1. cart_id when present                                               │
//! │  2. otherwise (barber_id, sale_date floored to the minute)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tax Back-Calculation
//! Prices include tax. Each line's net is the difference of the invoice's
//! running net, so rounding never accumulates: `Σ subtotal + Σ tax == total`
//! and every line is within one minor unit of its exact share.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::{summarize_payments, PaymentShare};
use crate::money::Money;
use crate::types::{ClientData, LineKind, PaymentMethodCatalog, SaleRecord, TaxRate};
use crate::CART_GROUPING_WINDOW_SECS;

// =============================================================================
// Output Types
// =============================================================================

/// Formal invoices carry buyer data; informal ones are plain POS tickets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceKind {
    Formal,
    Informal,
}

/// One line on an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceLine {
    pub sale_id: String,
    pub line_kind: LineKind,
    pub item_name: String,
    pub payment_method: String,
    /// 0 when refunded.
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// Unit price with the store's tax backed out.
    pub unit_price_ex_tax_cents: i64,
    /// Tax-inclusive, 0 when refunded.
    pub total_cents: i64,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub refunded: bool,
    pub original_quantity: i64,
    pub original_total_cents: i64,
}

/// A reconstructed invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Invoice {
    /// The cart id, or a key derived from barber and minute.
    pub id: String,
    pub cart_id: Option<String>,
    pub barber_id: Option<String>,
    /// Earliest sale date in the group.
    #[ts(as = "String")]
    pub issued_at: DateTime<Utc>,
    pub kind: InvoiceKind,
    pub client_data: Option<ClientData>,
    pub lines: Vec<InvoiceLine>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub original_total_cents: i64,
    pub has_refunds: bool,
    pub payments: Vec<PaymentShare>,
}

impl Invoice {
    /// Case-insensitive match over everything a cashier might type.
    ///
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        let hit = |s: &str| s.to_lowercase().contains(needle);

        hit(&self.id)
            || self.barber_id.as_deref().is_some_and(hit)
            || self.lines.iter().any(|l| hit(&l.item_name))
            || self
                .payments
                .iter()
                .any(|p| hit(&p.method) || hit(&p.display_name))
            || self.client_data.as_ref().is_some_and(|c| {
                hit(&c.name) || c.document_id.as_deref().is_some_and(hit)
            })
    }
}

// =============================================================================
// Aggregator
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GroupKey {
    Cart(String),
    Window {
        barber_id: Option<String>,
        minute: i64,
    },
}

impl GroupKey {
    fn for_record(record: &SaleRecord) -> Self {
        match &record.cart_id {
            Some(cart_id) => GroupKey::Cart(cart_id.clone()),
            None => GroupKey::Window {
                barber_id: record.barber_id.clone(),
                minute: record
                    .sale_date
                    .timestamp()
                    .div_euclid(CART_GROUPING_WINDOW_SECS),
            },
        }
    }

    fn invoice_id(&self) -> String {
        match self {
            GroupKey::Cart(cart_id) => cart_id.clone(),
            GroupKey::Window { barber_id, minute } => format!(
                "pos-{}-{}",
                barber_id.as_deref().unwrap_or("walkin"),
                minute
            ),
        }
    }
}

/// Read-only invoice builder.
///
/// Holds the store's effective tax rate (zero for a store that is not tax
/// registered) and the payment catalog used for display names and ordering.
#[derive(Debug, Clone)]
pub struct InvoiceAggregator {
    tax_rate: TaxRate,
    catalog: PaymentMethodCatalog,
}

impl InvoiceAggregator {
    pub fn new(tax_rate: TaxRate, catalog: PaymentMethodCatalog) -> Self {
        InvoiceAggregator { tax_rate, catalog }
    }

    /// Builds the aggregator for a store, ignoring the rate when the store
    /// is not tax registered.
    pub fn for_store(tax_registered: bool, rate: TaxRate, catalog: PaymentMethodCatalog) -> Self {
        let effective = if tax_registered { rate } else { TaxRate::zero() };
        Self::new(effective, catalog)
    }

    pub fn tax_rate(&self) -> TaxRate {
        self.tax_rate
    }

    /// Groups records into invoices, newest first.
    pub fn aggregate(&self, records: Vec<SaleRecord>) -> Vec<Invoice> {
        let mut order: Vec<GroupKey> = Vec::new();
        let mut groups: HashMap<GroupKey, Vec<SaleRecord>> = HashMap::new();

        for record in records {
            let key = GroupKey::for_record(&record);
            groups
                .entry(key.clone())
                .or_insert_with(|| {
                    order.push(key);
                    Vec::new()
                })
                .push(record);
        }

        let mut invoices: Vec<Invoice> = order
            .into_iter()
            .filter_map(|key| {
                let group = groups.remove(&key)?;
                self.build_invoice(&key, group)
            })
            .collect();

        invoices.sort_by(|a, b| b.issued_at.cmp(&a.issued_at).then_with(|| a.id.cmp(&b.id)));
        invoices
    }

    /// [`aggregate`](Self::aggregate), then keeps invoices matching `search`.
    pub fn aggregate_matching(&self, records: Vec<SaleRecord>, search: &str) -> Vec<Invoice> {
        let needle = search.trim().to_lowercase();
        self.aggregate(records)
            .into_iter()
            .filter(|inv| inv.matches(&needle))
            .collect()
    }

    /// `None` only for an empty group, which `aggregate` never builds.
    fn build_invoice(&self, key: &GroupKey, mut group: Vec<SaleRecord>) -> Option<Invoice> {
        group.sort_by(|a, b| a.sale_date.cmp(&b.sale_date).then_with(|| a.id.cmp(&b.id)));

        let issued_at = group.first()?.sale_date;
        let barber_id = group.iter().find_map(|r| r.barber_id.clone());
        let client_data = group.iter().find_map(|r| r.client_data.clone());
        let has_refunds = group.iter().any(SaleRecord::is_refunded);

        let mut running_gross = Money::zero();
        let mut running_net = Money::zero();
        let mut lines = Vec::with_capacity(group.len());

        for record in &group {
            let total = record.displayed_total();
            running_gross += total;
            let net_so_far = running_gross.split_inclusive(self.tax_rate).net;
            let subtotal = net_so_far - running_net;
            running_net = net_so_far;

            lines.push(InvoiceLine {
                sale_id: record.id.clone(),
                line_kind: record.line_kind,
                item_name: record.item_name.clone(),
                payment_method: record.payment_method.clone(),
                quantity: record.displayed_quantity(),
                unit_price_cents: record.unit_price_cents,
                unit_price_ex_tax_cents: Money::from_cents(record.unit_price_cents)
                    .split_inclusive(self.tax_rate)
                    .net
                    .cents(),
                total_cents: total.cents(),
                subtotal_cents: subtotal.cents(),
                tax_cents: (total - subtotal).cents(),
                refunded: record.is_refunded(),
                original_quantity: record.original_quantity,
                original_total_cents: record.original_total_cents,
            });
        }

        let payments = summarize_payments(
            group
                .iter()
                .map(|r| (r.payment_method.as_str(), r.displayed_total())),
            &self.catalog,
        );
        let original_total: Money = group.iter().map(SaleRecord::original_total).sum();

        Some(Invoice {
            id: key.invoice_id(),
            cart_id: match key {
                GroupKey::Cart(id) => Some(id.clone()),
                GroupKey::Window { .. } => None,
            },
            barber_id,
            issued_at,
            kind: if client_data.is_some() {
                InvoiceKind::Formal
            } else {
                InvoiceKind::Informal
            },
            client_data,
            lines,
            subtotal_cents: running_net.cents(),
            tax_cents: (running_gross - running_net).cents(),
            total_cents: running_gross.cents(),
            original_total_cents: original_total.cents(),
            has_refunds,
            payments,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PaymentMethodConfig, SaleStatus};
    use chrono::{Duration, TimeZone};

    fn catalog() -> PaymentMethodCatalog {
        PaymentMethodCatalog::new(vec![
            PaymentMethodConfig {
                id: "cash".into(),
                display_name: "Cash".into(),
                enabled: true,
            },
            PaymentMethodConfig {
                id: "card".into(),
                display_name: "Card".into(),
                enabled: true,
            },
        ])
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, h, m, s).unwrap()
    }

    fn record(id: &str, cart: Option<&str>, barber: &str, when: DateTime<Utc>, total: i64) -> SaleRecord {
        SaleRecord {
            id: id.into(),
            cart_id: cart.map(String::from),
            line_kind: LineKind::Service,
            product_id: None,
            service_id: Some("svc-cut".into()),
            item_name: format!("Item {id}"),
            barber_id: Some(barber.into()),
            quantity: 1,
            unit_price_cents: total,
            total_cents: total,
            payment_method: "cash".into(),
            status: SaleStatus::Active,
            sale_date: when,
            client_data: None,
            original_quantity: 1,
            original_total_cents: total,
            refund_reason: None,
            refunded_at: None,
        }
    }

    fn aggregator(bps: u32) -> InvoiceAggregator {
        InvoiceAggregator::for_store(true, TaxRate::from_bps(bps), catalog())
    }

    #[test]
    fn test_window_grouping_same_minute() {
        let records = vec![
            record("s-1", None, "b-1", at(10, 0, 0), 1000),
            record("s-2", None, "b-1", at(10, 0, 10), 2000),
        ];
        let invoices = aggregator(0).aggregate(records);
        assert_eq!(invoices.len(), 1);
        assert_eq!(invoices[0].lines.len(), 2);
        assert_eq!(invoices[0].total_cents, 3000);
    }

    #[test]
    fn test_window_grouping_splits_after_a_minute() {
        let records = vec![
            record("s-1", None, "b-1", at(10, 0, 0), 1000),
            record("s-2", None, "b-1", at(10, 0, 0) + Duration::seconds(70), 2000),
        ];
        let invoices = aggregator(0).aggregate(records);
        assert_eq!(invoices.len(), 2);
        // newest first
        assert_eq!(invoices[0].total_cents, 2000);
    }

    #[test]
    fn test_window_grouping_separates_barbers() {
        let records = vec![
            record("s-1", None, "b-1", at(10, 0, 0), 1000),
            record("s-2", None, "b-2", at(10, 0, 5), 1000),
        ];
        assert_eq!(aggregator(0).aggregate(records).len(), 2);
    }

    #[test]
    fn test_cart_id_groups_across_minute_boundary() {
        let records = vec![
            record("s-1", Some("cart-9"), "b-1", at(10, 0, 59), 1000),
            record("s-2", Some("cart-9"), "b-1", at(10, 1, 1), 1500),
        ];
        let invoices = aggregator(0).aggregate(records);
        assert_eq!(invoices.len(), 1);
        assert_eq!(invoices[0].id, "cart-9");
        assert_eq!(invoices[0].cart_id.as_deref(), Some("cart-9"));
        assert_eq!(invoices[0].issued_at, at(10, 0, 59));
    }

    #[test]
    fn test_tax_back_calculation_exact() {
        let invoices = aggregator(1900).aggregate(vec![record("s-1", None, "b-1", at(9, 0, 0), 11900)]);
        let inv = &invoices[0];
        assert_eq!(inv.subtotal_cents, 10000);
        assert_eq!(inv.tax_cents, 1900);
        assert_eq!(inv.subtotal_cents + inv.tax_cents, inv.total_cents);
    }

    #[test]
    fn test_unit_price_ex_tax() {
        let mut two = record("s-1", None, "b-1", at(9, 0, 0), 23800);
        two.quantity = 2;
        two.original_quantity = 2;
        two.unit_price_cents = 11900;

        let line = &aggregator(1900).aggregate(vec![two.clone()])[0].lines[0];
        assert_eq!(line.unit_price_cents, 11900);
        assert_eq!(line.unit_price_ex_tax_cents, 10000);

        let line = &aggregator(0).aggregate(vec![two])[0].lines[0];
        assert_eq!(line.unit_price_ex_tax_cents, 11900);
    }

    #[test]
    fn test_issued_at_is_earliest_record() {
        let records = vec![
            record("s-2", Some("c"), "b-1", at(9, 0, 40), 1000),
            record("s-1", Some("c"), "b-1", at(9, 0, 5), 1000),
        ];
        let inv = &aggregator(0).aggregate(records)[0];
        assert_eq!(inv.issued_at, at(9, 0, 5));
        assert!(aggregator(0).aggregate(Vec::new()).is_empty());
    }

    #[test]
    fn test_cumulative_rounding_keeps_sum_exact() {
        let records = vec![
            record("s-1", Some("c"), "b-1", at(9, 0, 0), 1000),
            record("s-2", Some("c"), "b-1", at(9, 0, 1), 1000),
            record("s-3", Some("c"), "b-1", at(9, 0, 2), 1000),
        ];
        let inv = &aggregator(1900).aggregate(records)[0];

        let line_sub: i64 = inv.lines.iter().map(|l| l.subtotal_cents).sum();
        let line_tax: i64 = inv.lines.iter().map(|l| l.tax_cents).sum();
        assert_eq!(line_sub, inv.subtotal_cents);
        assert_eq!(line_tax, inv.tax_cents);
        assert_eq!(line_sub + line_tax, 3000);
        // 3000 / 1.19 = 2521.008
        assert_eq!(inv.subtotal_cents, 2521);

        // each line within one unit of 1000 / 1.19 = 840.34
        for line in &inv.lines {
            assert!((line.subtotal_cents - 840).abs() <= 1, "{line:?}");
        }
    }

    #[test]
    fn test_unregistered_store_has_no_tax() {
        let agg = InvoiceAggregator::for_store(false, TaxRate::from_bps(1900), catalog());
        let inv = &agg.aggregate(vec![record("s-1", None, "b-1", at(9, 0, 0), 11900)])[0];
        assert_eq!(inv.subtotal_cents, 11900);
        assert_eq!(inv.tax_cents, 0);
    }

    #[test]
    fn test_refunded_line_shows_zero_and_keeps_originals() {
        let mut refunded = record("s-2", Some("c"), "b-1", at(9, 0, 1), 4000);
        refunded.status = SaleStatus::Refunded;
        refunded.payment_method = "card".into();
        let records = vec![record("s-1", Some("c"), "b-1", at(9, 0, 0), 1000), refunded];

        let inv = &aggregator(0).aggregate(records)[0];
        assert!(inv.has_refunds);
        assert_eq!(inv.total_cents, 1000);
        assert_eq!(inv.original_total_cents, 5000);

        let line = inv.lines.iter().find(|l| l.sale_id == "s-2").unwrap();
        assert_eq!(line.quantity, 0);
        assert_eq!(line.total_cents, 0);
        assert_eq!(line.original_total_cents, 4000);

        let card = inv.payments.iter().find(|p| p.method == "card").unwrap();
        assert_eq!(card.total_cents, 0);
        assert_eq!(card.share_bps, 0);
        let cash = inv.payments.iter().find(|p| p.method == "cash").unwrap();
        assert_eq!(cash.share_bps, 10000);
    }

    #[test]
    fn test_formal_when_any_line_has_client() {
        let mut with_client = record("s-2", Some("c"), "b-1", at(9, 0, 1), 1000);
        with_client.client_data = Some(ClientData {
            name: "Ana Ruiz".into(),
            document_id: Some("NIT-900".into()),
            ..Default::default()
        });
        let records = vec![record("s-1", Some("c"), "b-1", at(9, 0, 0), 1000), with_client];
        let inv = &aggregator(0).aggregate(records)[0];
        assert_eq!(inv.kind, InvoiceKind::Formal);
        assert_eq!(inv.client_data.as_ref().unwrap().name, "Ana Ruiz");

        let plain = &aggregator(0).aggregate(vec![record("s-3", None, "b-1", at(9, 0, 0), 1000)])[0];
        assert_eq!(plain.kind, InvoiceKind::Informal);
    }

    #[test]
    fn test_search_after_grouping() {
        let mut with_client = record("s-1", Some("c-1"), "b-1", at(9, 0, 0), 1000);
        with_client.client_data = Some(ClientData {
            name: "Ana Ruiz".into(),
            ..Default::default()
        });
        let mut other = record("s-2", Some("c-2"), "b-2", at(9, 5, 0), 1000);
        other.payment_method = "card".into();
        let records = vec![with_client, other];

        let agg = aggregator(0);
        let hits = agg.aggregate_matching(records.clone(), "ana");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "c-1");

        let hits = agg.aggregate_matching(records.clone(), "CARD");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "c-2");

        assert_eq!(agg.aggregate_matching(records, "  ").len(), 2);
    }
}
