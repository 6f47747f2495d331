//! # shears-ledger: Inventory Ledger Engine for Shears POS
//!
//! Settles carts, refunds sales, moves and counts stock, reconciles the
//! ledger against its history and rebuilds invoices, all on top of the pure
//! rules in `shears-core` and the SQLite layer in `shears-db`.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     shears-ledger Architecture                          │
//! │                                                                         │
//! │  ┌───────────────────────────────────────────────────────────────────┐ │
//! │  │                  LedgerService (service.rs)                       │ │
//! │  └──┬──────────┬──────────┬───────────┬───────────┬──────────┬──────┘ │
//! │     │          │          │           │           │          │        │
//! │  ┌──▼─────┐ ┌──▼──────┐ ┌─▼───────┐ ┌─▼────────┐ ┌▼───────┐ ┌▼──────┐ │
//! │  │Product │ │Cart     │ │Refund   │ │Reconciler│ │Snapshot│ │Invoice│ │
//! │  │Ledger  │◄┤Settle-  │ │Processor│ │          │ │Manager │ │Service│ │
//! │  │        │◄┤ment     │ │         │ │          │ │        │ │       │ │
//! │  └───┬────┘ └─────────┘ └────┬────┘ └──────────┘ └────────┘ └───────┘ │
//! │      └────────────◄──────────┘                                         │
//! │                                                                         │
//! │  LedgerContext: Database · ProductLocks · EventBus · payment catalog   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Write Discipline
//!
//! Every mutation follows the same order: validate, take the per-product
//! locks (sorted), open a write transaction (which bumps the ledger
//! version), read-check-write, commit, publish a [`LedgerEvent`].
//!
//! ## Usage
//! ```rust,ignore
//! use shears_ledger::{LedgerConfig, LedgerService};
//!
//! shears_ledger::telemetry::init_tracing();
//! let config = LedgerConfig::load(None)?;
//! let ledger = LedgerService::open(&config).await?;
//!
//! let settled = ledger.create_cart_sale(cart).await?;
//! let invoices = ledger.list_invoices(Default::default()).await?;
//! ```

pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod invoices;
pub mod locks;
pub mod product_ledger;
pub mod reconcile;
pub mod refund;
pub mod service;
pub mod settlement;
pub mod snapshot;
pub mod telemetry;

#[cfg(test)]
mod test_support;

pub use config::LedgerConfig;
pub use context::LedgerContext;
pub use error::{ErrorCode, LedgerError, LedgerResult};
pub use events::{EventBus, LedgerEvent};
pub use invoices::InvoiceFilter;
pub use locks::ProductLocks;
pub use service::LedgerService;
pub use snapshot::{RestoreOutcome, RestoredItem};
