//! # Repositories
//!
//! One module per table family. Each module holds executor-generic query
//! functions that work on the pool and inside a [`write_tx::WriteTx`] alike,
//! plus a small repository struct for pooled reads.
//!
//! ```text
//! ┌────────────────────┐        ┌──────────────────────────────┐
//! │ ProductRepository  │──┐     │ WriteTx                      │
//! │ (pool, reads)      │  │     │ (one transaction, writes)    │
//! └────────────────────┘  │     └──────────────┬───────────────┘
//!                         ▼                    ▼
//!              product::fetch_product(executor, id)
//! ```

pub mod ledger_state;
pub mod product;
pub mod sale;
pub mod service;
pub mod snapshot;
pub mod stock;
pub mod write_tx;

use chrono::{DateTime, SecondsFormat, Utc};

/// Storage form of a timestamp.
///
/// Fixed microsecond precision with a `Z` suffix, so that SQL text
/// comparison and `ORDER BY` follow time order.
pub(crate) fn ts(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamps_sort_as_text() {
        let a = Utc.with_ymd_and_hms(2026, 1, 9, 23, 59, 59).unwrap();
        let b = Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).unwrap();
        assert!(ts(&a) < ts(&b));
        assert_eq!(ts(&b), "2026-01-10T00:00:00.000000Z");
    }
}
