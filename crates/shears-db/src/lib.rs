//! # shears-db: Database Layer for Shears POS
//!
//! All SQLite access for the inventory ledger.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        shears-db Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Database (pool.rs)                           │   │
//! │  │   SqlitePool · WAL · foreign keys · busy timeout · migrations   │   │
//! │  └──────────┬──────────────────────────────────────┬───────────────┘   │
//! │             │ pooled reads                          │ begin_write()     │
//! │  ┌──────────▼────────────────────────┐   ┌─────────▼───────────────┐   │
//! │  │ ProductRepository  SaleRepository │   │ WriteTx                 │   │
//! │  │ StockRepository    ServiceRepo... │   │ one transaction,        │   │
//! │  │ SnapshotRepository LedgerState... │   │ version bump first      │   │
//! │  └───────────────────────────────────┘   └─────────────────────────┘   │
//! │                                                                         │
//! │  Tables: products · services · stock_movements · sale_records ·        │
//! │          stock_counts · inventory_snapshots(+items) · ledger_state     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use shears_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./ledger.db")).await?;
//! let low = db.products().list_low_stock().await?;
//!
//! let mut tx = db.begin_write().await?;
//! // ... ledger writes ...
//! tx.commit().await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::snapshot::SnapshotSummary;
pub use repository::write_tx::WriteTx;
