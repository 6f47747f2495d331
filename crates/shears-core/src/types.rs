//! # Domain Types
//!
//! Core domain types used throughout Shears POS.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │   SaleRecord    │   │  StockMovement  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  initial_stock  │   │  cart_id        │   │  kind           │       │
//! │  │  entries        │◄──┤  quantity       │   │  quantity       │       │
//! │  │  exits          │   │  status         │   │  reason         │       │
//! │  │  sales          │   │  original_*     │   │  cost_cents     │       │
//! │  │  real_stock     │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ InventorySnap-  │   │   StockCount    │   │  PaymentMethod- │       │
//! │  │ shot (items[])  │   │  (count audit)  │   │  Catalog        │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Ledger rows expose `*_cents` fields for storage and typed accessors
//! (`price()`, `levels()`) for arithmetic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::ledger::StockLevels;
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate in basis points (1900 = 19%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Product
// =============================================================================

/// A physical product and its ledger counters.
///
/// ## Balance
/// ```text
/// expected_stock = initial_stock + entries - exits - sales   (never < 0)
/// difference     = real_stock - expected_stock               (if counted)
/// ```
///
/// `initial_stock` is fixed at creation. `entries`/`exits` move only through
/// stock movements, `sales` only through settlement and refunds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub name: String,
    /// Business code printed on the shelf label. Unique.
    pub code: String,
    pub category: Option<String>,
    pub initial_stock: i64,
    pub entries: i64,
    pub exits: i64,
    pub sales: i64,
    /// Reorder threshold.
    pub min_stock: i64,
    /// Last physical count, if one was ever recorded.
    pub real_stock: Option<i64>,
    /// Unit price, tax included.
    pub price_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// The four ledger counters as a value.
    pub fn levels(&self) -> StockLevels {
        StockLevels {
            initial: self.initial_stock,
            entries: self.entries,
            exits: self.exits,
            sales: self.sales,
        }
    }

    /// Stock the ledger believes is on the shelf.
    #[inline]
    pub fn expected_stock(&self) -> i64 {
        self.levels().expected()
    }

    /// Counted minus expected. `None` until a count is recorded.
    pub fn difference(&self) -> Option<i64> {
        self.real_stock.map(|real| real - self.expected_stock())
    }

    /// At or below the reorder threshold.
    pub fn is_low_stock(&self) -> bool {
        self.expected_stock() <= self.min_stock
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    pub code: String,
    pub category: Option<String>,
    pub initial_stock: i64,
    pub min_stock: i64,
    pub price_cents: i64,
}

/// Catalog fields that may change after creation. Ledger counters are not
/// editable here.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductDetails {
    pub name: String,
    pub code: String,
    pub category: Option<String>,
    pub min_stock: i64,
    pub price_cents: i64,
}

// =============================================================================
// Stock Movements
// =============================================================================

/// Direction of a manual stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Goods received (purchase, return from a barber's station).
    Entry,
    /// Goods leaving without a sale (breakage, internal use, loss).
    Exit,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Entry => "entry",
            MovementKind::Exit => "exit",
        }
    }
}

/// Append-only record of a manual entry or exit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    pub kind: MovementKind,
    pub quantity: i64,
    pub reason: String,
    /// What the goods cost, when known.
    pub cost_cents: Option<i64>,
    /// How an entry was paid for (the expense side).
    pub payment_method: Option<String>,
    #[ts(as = "String")]
    pub occurred_at: DateTime<Utc>,
    pub actor_id: String,
}

/// Request to move stock in or out of a product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockAdjustment {
    pub product_id: String,
    pub kind: MovementKind,
    pub quantity: i64,
    pub reason: String,
    pub cost_cents: Option<i64>,
    pub payment_method: Option<String>,
    pub actor_id: String,
}

/// Audit row written whenever a physical count is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockCount {
    pub id: String,
    pub product_id: String,
    pub real_stock: i64,
    /// Ledger expectation at the moment of counting.
    pub expected_stock: i64,
    pub notes: Option<String>,
    pub actor_id: String,
    #[ts(as = "String")]
    pub counted_at: DateTime<Utc>,
}

// =============================================================================
// Services
// =============================================================================

/// A sellable service (haircut, beard trim). Never touches stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub price_cents: i64,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Service {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Sale Records
// =============================================================================

/// What a sale line sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Product,
    Service,
}

/// Lifecycle of a sale record. The only transition is `Active -> Refunded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    Active,
    Refunded,
}

/// Buyer details for a formal (tax) invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClientData {
    pub name: String,
    pub document_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// One settled line of a cart.
///
/// Immutable once written, apart from the refund transition which sets
/// `status`, `refund_reason` and `refunded_at`. `original_quantity` and
/// `original_total_cents` always hold what was actually sold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleRecord {
    pub id: String,
    /// Shared by every line settled in the same cart.
    pub cart_id: Option<String>,
    pub line_kind: LineKind,
    pub product_id: Option<String>,
    pub service_id: Option<String>,
    /// Item name at the time of sale.
    pub item_name: String,
    pub barber_id: Option<String>,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub total_cents: i64,
    pub payment_method: String,
    pub status: SaleStatus,
    #[ts(as = "String")]
    pub sale_date: DateTime<Utc>,
    pub client_data: Option<ClientData>,
    pub original_quantity: i64,
    pub original_total_cents: i64,
    pub refund_reason: Option<String>,
    #[ts(as = "Option<String>")]
    pub refunded_at: Option<DateTime<Utc>>,
}

impl SaleRecord {
    #[inline]
    pub fn is_refunded(&self) -> bool {
        self.status == SaleStatus::Refunded
    }

    /// Quantity to show: 0 once refunded.
    pub fn displayed_quantity(&self) -> i64 {
        if self.is_refunded() {
            0
        } else {
            self.quantity
        }
    }

    /// Total to show: 0 once refunded.
    pub fn displayed_total(&self) -> Money {
        if self.is_refunded() {
            Money::zero()
        } else {
            Money::from_cents(self.total_cents)
        }
    }

    #[inline]
    pub fn original_total(&self) -> Money {
        Money::from_cents(self.original_total_cents)
    }

    /// The referenced catalog id, whichever kind of line this is.
    pub fn item_id(&self) -> Option<&str> {
        match self.line_kind {
            LineKind::Product => self.product_id.as_deref(),
            LineKind::Service => self.service_id.as_deref(),
        }
    }
}

// =============================================================================
// Inventory Snapshots
// =============================================================================

/// Point-in-time copy of one product's ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SnapshotItem {
    pub product_id: String,
    pub product_name: String,
    pub code: String,
    pub initial_stock: i64,
    pub entries: i64,
    pub exits: i64,
    pub sales: i64,
    pub real_stock: Option<i64>,
    pub expected_stock: i64,
}

impl From<&Product> for SnapshotItem {
    fn from(p: &Product) -> Self {
        SnapshotItem {
            product_id: p.id.clone(),
            product_name: p.name.clone(),
            code: p.code.clone(),
            initial_stock: p.initial_stock,
            entries: p.entries,
            exits: p.exits,
            sales: p.sales,
            real_stock: p.real_stock,
            expected_stock: p.expected_stock(),
        }
    }
}

/// Immutable copy of the whole ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventorySnapshot {
    pub id: String,
    #[ts(as = "String")]
    pub taken_at: DateTime<Utc>,
    pub actor_id: String,
    pub note: Option<String>,
    pub items: Vec<SnapshotItem>,
}

// =============================================================================
// Payment Methods
// =============================================================================

/// One configured way of paying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentMethodConfig {
    /// Stored on sale records, e.g. `cash`, `card`, `transfer`.
    pub id: String,
    pub display_name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// The closed set of payment methods the store accepts.
///
/// Order is preserved; payment breakdowns list methods in catalog order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethodCatalog {
    methods: Vec<PaymentMethodConfig>,
}

impl PaymentMethodCatalog {
    pub fn new(methods: Vec<PaymentMethodConfig>) -> Self {
        PaymentMethodCatalog { methods }
    }

    /// Looks up an enabled method by id.
    ///
    /// Unknown and disabled ids both fail with `InvalidPaymentMethod`.
    pub fn resolve(&self, id: &str) -> CoreResult<&PaymentMethodConfig> {
        self.methods
            .iter()
            .find(|m| m.id == id && m.enabled)
            .ok_or_else(|| CoreError::InvalidPaymentMethod(id.to_string()))
    }

    pub fn enabled(&self) -> impl Iterator<Item = &PaymentMethodConfig> {
        self.methods.iter().filter(|m| m.enabled)
    }

    pub fn all(&self) -> &[PaymentMethodConfig] {
        &self.methods
    }

    /// Catalog position of `id`; unknown ids sort last.
    pub fn position(&self, id: &str) -> usize {
        self.methods
            .iter()
            .position(|m| m.id == id)
            .unwrap_or(self.methods.len())
    }

    /// Display name for `id`, falling back to the id itself.
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.methods
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.display_name.as_str())
            .unwrap_or(id)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(initial: i64, entries: i64, exits: i64, sales: i64) -> Product {
        let now = Utc::now();
        Product {
            id: "p-1".into(),
            name: "Matte Pomade".into(),
            code: "POM-01".into(),
            category: Some("styling".into()),
            initial_stock: initial,
            entries,
            exits,
            sales,
            min_stock: 2,
            real_stock: None,
            price_cents: 1000,
            created_at: now,
            updated_at: now,
        }
    }

    fn catalog() -> PaymentMethodCatalog {
        PaymentMethodCatalog::new(vec![
            PaymentMethodConfig {
                id: "cash".into(),
                display_name: "Cash".into(),
                enabled: true,
            },
            PaymentMethodConfig {
                id: "cheque".into(),
                display_name: "Cheque".into(),
                enabled: false,
            },
        ])
    }

    #[test]
    fn test_expected_and_difference() {
        let mut p = product(10, 5, 2, 4);
        assert_eq!(p.expected_stock(), 9);
        assert_eq!(p.difference(), None);

        p.real_stock = Some(7);
        assert_eq!(p.difference(), Some(-2));
    }

    #[test]
    fn test_low_stock() {
        assert!(product(2, 0, 0, 0).is_low_stock());
        assert!(!product(3, 0, 0, 0).is_low_stock());
    }

    #[test]
    fn test_catalog_resolve() {
        let catalog = catalog();
        assert_eq!(catalog.resolve("cash").unwrap().display_name, "Cash");
        assert!(matches!(
            catalog.resolve("cheque"),
            Err(CoreError::InvalidPaymentMethod(_))
        ));
        assert!(matches!(
            catalog.resolve("bitcoin"),
            Err(CoreError::InvalidPaymentMethod(_))
        ));
        assert_eq!(catalog.enabled().count(), 1);
        assert_eq!(catalog.position("bitcoin"), 2);
    }

    #[test]
    fn test_refunded_record_displays_zero() {
        let record = SaleRecord {
            id: "s-1".into(),
            cart_id: Some("c-1".into()),
            line_kind: LineKind::Product,
            product_id: Some("p-1".into()),
            service_id: None,
            item_name: "Matte Pomade".into(),
            barber_id: None,
            quantity: 4,
            unit_price_cents: 1000,
            total_cents: 4000,
            payment_method: "cash".into(),
            status: SaleStatus::Refunded,
            sale_date: Utc::now(),
            client_data: None,
            original_quantity: 4,
            original_total_cents: 4000,
            refund_reason: Some("damaged".into()),
            refunded_at: Some(Utc::now()),
        };
        assert_eq!(record.displayed_quantity(), 0);
        assert!(record.displayed_total().is_zero());
        assert_eq!(record.original_total().cents(), 4000);
        assert_eq!(record.item_id(), Some("p-1"));
    }
}
