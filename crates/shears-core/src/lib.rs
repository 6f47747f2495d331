//! # shears-core: Pure Ledger Logic for Shears POS
//!
//! The arithmetic and rules behind the barbershop register: how stock is
//! counted, how a cart is judged settleable, how tax is pulled back out of
//! tax-inclusive prices and how flat sale records are regrouped into
//! invoices. Nothing in here touches a database, a lock or a clock.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shears POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  shears-ledger (engine)                         │   │
//! │  │   settle cart, refund, adjust stock, reconcile, invoices        │   │
//! │  └──────────────┬──────────────────────────────┬───────────────────┘   │
//! │                 │                              │                        │
//! │  ┌──────────────▼──────────────────┐  ┌────────▼──────────────────┐   │
//! │  │  ★ shears-core (THIS CRATE) ★    │  │  shears-db (SQLite)       │   │
//! │  │                                  │◄─┤  repositories, write tx   │   │
//! │  │  types  money  ledger  cart      │  └───────────────────────────┘   │
//! │  │  invoice  reconcile  validation  │                                  │
//! │  │                                  │                                  │
//! │  │  NO I/O • PURE FUNCTIONS         │                                  │
//! │  └──────────────────────────────────┘                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, SaleRecord, StockMovement, ...)
//! - [`money`] - Integer money and tax-inclusive splitting
//! - [`ledger`] - The stock balance `initial + entries - exits - sales`
//! - [`cart`] - Cart requests, validation and payment breakdowns
//! - [`invoice`] - Regrouping sale records into invoices
//! - [`reconcile`] - Drift and count discrepancy reports
//! - [`validation`] - Field-level rules
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use shears_core::money::Money;
//! use shears_core::types::TaxRate;
//!
//! // 119.00 including 19% tax
//! let split = Money::from_cents(11900).split_inclusive(TaxRate::from_bps(1900));
//! assert_eq!(split.net.cents(), 10000);
//! assert_eq!(split.tax.cents(), 1900);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod invoice;
pub mod ledger;
pub mod money;
pub mod reconcile;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use ledger::StockLevels;
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity on a single cart line or stock movement.
///
/// Catches fat-fingered entries (1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Highest unit price a line or product may carry (1,000,000.00).
pub const MAX_PRICE_CENTS: i64 = 100_000_000;

/// Highest stock figure a product may hold or be counted at.
pub const MAX_STOCK_LEVEL: i64 = 1_000_000;

/// Records without a cart id that share a barber and fall in the same
/// wall-clock minute are treated as one cart.
pub const CART_GROUPING_WINDOW_SECS: i64 = 60;
