//! # Reconciliation Reports
//!
//! Compares the stored ledger counters with what the history says they
//! should be.
//!
//! ```text
//! stored      products.entries / exits / sales
//! recomputed  Σ movements(entry) / Σ movements(exit) / Σ active product sales
//!
//! drift       stored != recomputed          → fixable by overwrite
//! count gap   real_stock != expected_stock  → needs a human recount
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ledger::StockLevels;
use crate::types::Product;

/// Whether reconciliation only reports or also repairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileMode {
    Report,
    Fix,
}

/// A product whose stored counters disagree with its history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DriftEntry {
    pub product_id: String,
    pub product_name: String,
    pub stored: StockLevels,
    pub recomputed: StockLevels,
    pub stored_expected: i64,
    pub recomputed_expected: i64,
    /// `recomputed_expected - stored_expected`.
    pub delta: i64,
}

impl DriftEntry {
    /// Recomputed stock below zero cannot be written back.
    pub fn is_resolvable(&self) -> bool {
        self.recomputed_expected >= 0
    }
}

/// A physical count that disagrees with the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CountDiscrepancy {
    pub product_id: String,
    pub product_name: String,
    pub real_stock: i64,
    pub expected_stock: i64,
    /// `real_stock - expected_stock`.
    pub difference: i64,
}

/// Result of a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    Report {
        drift: Vec<DriftEntry>,
        counts: Vec<CountDiscrepancy>,
    },
    Fixed {
        fixed_count: usize,
        corrected: Vec<DriftEntry>,
        /// Drift left in place because the recomputed stock is negative.
        unresolved: Vec<DriftEntry>,
    },
}

impl ReconcileOutcome {
    /// Number of products that needed attention.
    pub fn issue_count(&self) -> usize {
        match self {
            ReconcileOutcome::Report { drift, .. } => drift.len(),
            ReconcileOutcome::Fixed {
                fixed_count,
                unresolved,
                ..
            } => fixed_count + unresolved.len(),
        }
    }
}

/// Compares stored counters with recomputed ones. `None` when they agree.
pub fn detect_drift(product: &Product, recomputed: StockLevels) -> Option<DriftEntry> {
    let stored = product.levels();
    if stored == recomputed {
        return None;
    }
    Some(DriftEntry {
        product_id: product.id.clone(),
        product_name: product.name.clone(),
        stored,
        recomputed,
        stored_expected: stored.expected(),
        recomputed_expected: recomputed.expected(),
        delta: recomputed.expected() - stored.expected(),
    })
}

/// Physical count gap, if a count exists and differs.
pub fn count_discrepancy(product: &Product) -> Option<CountDiscrepancy> {
    let real_stock = product.real_stock?;
    let expected_stock = product.expected_stock();
    (real_stock != expected_stock).then(|| CountDiscrepancy {
        product_id: product.id.clone(),
        product_name: product.name.clone(),
        real_stock,
        expected_stock,
        difference: real_stock - expected_stock,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(sales: i64, real_stock: Option<i64>) -> Product {
        let now = Utc::now();
        Product {
            id: "p-1".into(),
            name: "Beard Oil".into(),
            code: "OIL-1".into(),
            category: None,
            initial_stock: 10,
            entries: 5,
            exits: 1,
            sales,
            min_stock: 0,
            real_stock,
            price_cents: 1500,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_no_drift_when_equal() {
        let p = product(4, None);
        assert!(detect_drift(&p, p.levels()).is_none());
    }

    #[test]
    fn test_drift_delta() {
        let p = product(6, None);
        let recomputed = StockLevels {
            sales: 4,
            ..p.levels()
        };
        let drift = detect_drift(&p, recomputed).unwrap();
        assert_eq!(drift.stored_expected, 8);
        assert_eq!(drift.recomputed_expected, 10);
        assert_eq!(drift.delta, 2);
        assert!(drift.is_resolvable());
    }

    #[test]
    fn test_negative_recompute_unresolvable() {
        let p = product(0, None);
        let recomputed = StockLevels {
            sales: 20,
            ..p.levels()
        };
        assert!(!detect_drift(&p, recomputed).unwrap().is_resolvable());
    }

    #[test]
    fn test_count_discrepancy() {
        assert!(count_discrepancy(&product(4, None)).is_none());
        assert!(count_discrepancy(&product(4, Some(10))).is_none());
        let gap = count_discrepancy(&product(4, Some(7))).unwrap();
        assert_eq!(gap.difference, -3);
    }
}
