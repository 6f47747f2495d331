//! # Ledger Arithmetic
//!
//! The four stock counters and the rules for moving them.
//!
//! ## Balance Invariant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   expected = initial + entries - exits - sales          expected >= 0  │
//! │                                                                         │
//! │   apply_movement(entry, q)  entries += q                                │
//! │   apply_movement(exit, q)   exits   += q    fails if expected < q       │
//! │   debit_sale(q)             sales   += q    fails if expected < q       │
//! │   credit_refund(q)          sales   -= q    floors at 0                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutation returns the new levels instead of editing in place, so a
//! failed check can never leave a half-applied value behind.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::MovementKind;
use crate::MAX_STOCK_LEVEL;

/// A product's stock counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockLevels {
    pub initial: i64,
    pub entries: i64,
    pub exits: i64,
    pub sales: i64,
}

impl StockLevels {
    /// `initial + entries - exits - sales`.
    ///
    /// Summed in `i128` and saturated, so counters edited outside the ledger
    /// can be read and reported as drift instead of overflowing.
    pub fn expected(&self) -> i64 {
        let wide = self.initial as i128 + self.entries as i128
            - self.exits as i128
            - self.sales as i128;
        wide.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    /// Levels after selling `quantity`.
    ///
    /// `product_id`/`product_name` only label the error.
    pub fn debit_sale(
        &self,
        quantity: i64,
        product_id: &str,
        product_name: &str,
    ) -> CoreResult<StockLevels> {
        let available = self.expected();
        if available < quantity {
            return Err(CoreError::insufficient_stock(
                product_id,
                product_name,
                available,
                quantity,
            ));
        }
        Ok(StockLevels {
            sales: bump(self.sales, quantity, "sales")?,
            ..*self
        })
    }

    /// Levels after returning `quantity` to the shelf.
    ///
    /// Returns the levels and whether the credit had to be clamped because
    /// `sales` would have gone negative (only possible after drift).
    pub fn credit_refund(&self, quantity: i64) -> (StockLevels, bool) {
        let clamped = self.sales < quantity;
        let levels = StockLevels {
            sales: (self.sales - quantity).max(0),
            ..*self
        };
        (levels, clamped)
    }

    /// Levels after a manual entry or exit.
    pub fn apply_movement(
        &self,
        kind: MovementKind,
        quantity: i64,
        product_id: &str,
        product_name: &str,
    ) -> CoreResult<StockLevels> {
        match kind {
            MovementKind::Entry => {
                let levels = StockLevels {
                    entries: bump(self.entries, quantity, "entries")?,
                    ..*self
                };
                if levels.expected() > MAX_STOCK_LEVEL {
                    return Err(ValidationError::OutOfRange {
                        field: "stock".to_string(),
                        min: 0,
                        max: MAX_STOCK_LEVEL,
                    }
                    .into());
                }
                Ok(levels)
            }
            MovementKind::Exit => {
                let available = self.expected();
                if available < quantity {
                    return Err(CoreError::insufficient_stock(
                        product_id,
                        product_name,
                        available,
                        quantity,
                    ));
                }
                Ok(StockLevels {
                    exits: bump(self.exits, quantity, "exits")?,
                    ..*self
                })
            }
        }
    }
}

fn bump(counter: i64, quantity: i64, field: &str) -> CoreResult<i64> {
    counter
        .checked_add(quantity)
        .ok_or_else(|| ValidationError::overflow(field).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(initial: i64) -> StockLevels {
        StockLevels {
            initial,
            ..Default::default()
        }
    }

    #[test]
    fn test_debit_sale() {
        let after = levels(10).debit_sale(4, "p", "Pomade").unwrap();
        assert_eq!(after.sales, 4);
        assert_eq!(after.expected(), 6);
    }

    #[test]
    fn test_debit_sale_exact_stock_allowed() {
        let after = levels(3).debit_sale(3, "p", "Pomade").unwrap();
        assert_eq!(after.expected(), 0);
    }

    #[test]
    fn test_debit_sale_insufficient() {
        let err = levels(2).debit_sale(3, "p", "Pomade").unwrap_err();
        match err {
            CoreError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 2);
                assert_eq!(requested, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_credit_refund_restores() {
        let sold = levels(10).debit_sale(4, "p", "Pomade").unwrap();
        let (after, clamped) = sold.credit_refund(4);
        assert!(!clamped);
        assert_eq!(after.expected(), 10);
    }

    #[test]
    fn test_credit_refund_floors_at_zero() {
        let (after, clamped) = levels(5).credit_refund(2);
        assert!(clamped);
        assert_eq!(after.sales, 0);
    }

    #[test]
    fn test_exit_movement_cannot_go_negative() {
        let start = StockLevels {
            initial: 1,
            entries: 2,
            exits: 0,
            sales: 1,
        };
        assert!(start
            .apply_movement(MovementKind::Exit, 3, "p", "Pomade")
            .is_err());
        let after = start
            .apply_movement(MovementKind::Exit, 2, "p", "Pomade")
            .unwrap();
        assert_eq!(after.expected(), 0);
    }

    #[test]
    fn test_entry_beyond_stock_cap_rejected() {
        let full = levels(MAX_STOCK_LEVEL);
        assert!(matches!(
            full.apply_movement(MovementKind::Entry, 1, "p", "Pomade"),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert!(full
            .apply_movement(MovementKind::Exit, 1, "p", "Pomade")
            .is_ok());
    }

    #[test]
    fn test_extreme_counters_do_not_overflow() {
        let corrupt = StockLevels {
            initial: i64::MAX,
            entries: 1,
            exits: 0,
            sales: 0,
        };
        assert_eq!(corrupt.expected(), i64::MAX);
        assert!(corrupt
            .apply_movement(MovementKind::Entry, 1, "p", "Pomade")
            .is_err());

        let maxed_sales = StockLevels {
            initial: i64::MAX,
            entries: i64::MAX,
            exits: 0,
            sales: i64::MAX,
        };
        assert!(maxed_sales.debit_sale(1, "p", "Pomade").is_err());
    }

    #[test]
    fn test_entry_movement() {
        let after = levels(0)
            .apply_movement(MovementKind::Entry, 12, "p", "Pomade")
            .unwrap();
        assert_eq!(after.entries, 12);
        assert_eq!(after.expected(), 12);
    }
}
