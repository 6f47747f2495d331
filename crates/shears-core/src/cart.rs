//! # Cart Requests
//!
//! What the register submits at checkout, and the pure checks that run on it
//! before the settlement engine takes any lock.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CartRequest                                                            │
//! │    lines: [Pomade x2 (cash), Haircut x1 (card)]                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate_cart()          ← THIS MODULE (shape, prices, methods)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  product_demand()         ← quantities summed per product, sorted       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  settlement engine        ← locks, stock check, one transaction         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SettledCart { cart_id, records, total, payments[] }                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{ClientData, LineKind, PaymentMethodCatalog, SaleRecord};
use crate::validation::{
    validate_cart_size, validate_client_data, validate_price_cents, validate_quantity,
    ValidationResult,
};

// =============================================================================
// Requests
// =============================================================================

/// One line of a submitted cart.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLineRequest {
    pub kind: LineKind,
    /// Product id or service id, depending on `kind`.
    pub item_id: String,
    pub quantity: i64,
    /// Tax-inclusive unit price charged on this line.
    pub unit_price_cents: i64,
    pub payment_method: String,
    /// Overrides the cart-level client for this line.
    pub client_data: Option<ClientData>,
}

impl CartLineRequest {
    pub fn line_total(&self) -> ValidationResult<Money> {
        Money::from_cents(self.unit_price_cents)
            .checked_multiply_quantity(self.quantity)
            .ok_or_else(|| ValidationError::overflow("line total"))
    }
}

/// A whole cart as submitted at checkout.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartRequest {
    pub barber_id: Option<String>,
    /// Applied to every line without its own client.
    pub client_data: Option<ClientData>,
    pub lines: Vec<CartLineRequest>,
}

impl CartRequest {
    /// Client for a line: the line's own, else the cart's.
    pub fn client_for<'a>(&'a self, line: &'a CartLineRequest) -> Option<&'a ClientData> {
        line.client_data.as_ref().or(self.client_data.as_ref())
    }

    pub fn total(&self) -> ValidationResult<Money> {
        self.lines.iter().try_fold(Money::zero(), |acc, line| {
            acc.checked_add(line.line_total()?)
                .ok_or_else(|| ValidationError::overflow("cart total"))
        })
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Shape checks that need no ledger state.
///
/// Existence of products and services, and stock, are checked by the
/// settlement engine under lock.
pub fn validate_cart(cart: &CartRequest, catalog: &PaymentMethodCatalog) -> CoreResult<()> {
    validate_cart_size(cart.lines.len()).map_err(|e| match e {
        ValidationError::OutOfRange { max, .. } => CoreError::CartTooLarge {
            max: max as usize,
        },
        other => CoreError::Validation(other),
    })?;

    if let Some(client) = &cart.client_data {
        validate_client_data(client)?;
    }

    for line in &cart.lines {
        if line.item_id.trim().is_empty() {
            return Err(ValidationError::required("item_id").into());
        }
        validate_quantity(line.quantity)?;
        validate_price_cents(line.unit_price_cents)?;
        catalog.resolve(&line.payment_method)?;
        if let Some(client) = &line.client_data {
            validate_client_data(client)?;
        }
    }

    cart.total()?;
    Ok(())
}

/// Total quantity requested per product, keyed (and so ordered) by id.
///
/// Repeated lines for one product are summed so the stock check sees the
/// whole demand at once. The key order is also the lock order.
pub fn product_demand(cart: &CartRequest) -> BTreeMap<String, i64> {
    let mut demand = BTreeMap::new();
    for line in cart.lines.iter().filter(|l| l.kind == LineKind::Product) {
        *demand.entry(line.item_id.clone()).or_insert(0) += line.quantity;
    }
    demand
}

// =============================================================================
// Results
// =============================================================================

/// Money taken through one payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentShare {
    pub method: String,
    pub display_name: String,
    pub total_cents: i64,
    /// Share of the grand total in basis points.
    pub share_bps: u32,
}

/// Groups `(method, amount)` pairs by method, in catalog order.
///
/// Methods whose amount sums to zero are still listed, so a fully refunded
/// card payment shows as card 0.00 rather than vanishing.
pub fn summarize_payments<'a>(
    amounts: impl IntoIterator<Item = (&'a str, Money)>,
    catalog: &PaymentMethodCatalog,
) -> Vec<PaymentShare> {
    let mut by_method: BTreeMap<(usize, &'a str), Money> = BTreeMap::new();
    for (method, amount) in amounts {
        *by_method
            .entry((catalog.position(method), method))
            .or_insert_with(Money::zero) += amount;
    }

    let grand_total: Money = by_method.values().copied().sum();

    by_method
        .into_iter()
        .map(|((_, method), total)| PaymentShare {
            method: method.to_string(),
            display_name: catalog.display_name(method).to_string(),
            total_cents: total.cents(),
            share_bps: total.share_bps_of(grand_total),
        })
        .collect()
}

/// A committed cart.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SettledCart {
    pub cart_id: String,
    pub records: Vec<SaleRecord>,
    pub total_cents: i64,
    pub payments: Vec<PaymentShare>,
}

impl SettledCart {
    pub fn from_records(
        cart_id: String,
        records: Vec<SaleRecord>,
        catalog: &PaymentMethodCatalog,
    ) -> ValidationResult<Self> {
        let total = records.iter().try_fold(Money::zero(), |acc, r| {
            acc.checked_add(Money::from_cents(r.total_cents))
                .ok_or_else(|| ValidationError::overflow("cart total"))
        })?;
        let payments = summarize_payments(
            records
                .iter()
                .map(|r| (r.payment_method.as_str(), Money::from_cents(r.total_cents))),
            catalog,
        );
        Ok(SettledCart {
            cart_id,
            records,
            total_cents: total.cents(),
            payments,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
