//! # Money Module
//!
//! Provides the `Money` type for monetary values in minor units.
//!
//! ## Tax-Inclusive Prices
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Shelf price already contains tax. Invoices must show it split out:    │
//! │                                                                         │
//! │    gross 11900 at 19%                                                   │
//! │      net = 11900 / 1.19 = 10000                                         │
//! │      tax = 11900 - 10000 = 1900                                         │
//! │                                                                         │
//! │  Tax is always gross - net, so net + tax == gross holds by              │
//! │  construction and never drifts by a cent.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use shears_core::money::Money;
//!
//! let price = Money::from_cents(1000);
//! let line = price.checked_multiply_quantity(4).unwrap();
//! assert_eq!(line.cents(), 4000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

/// Basis points in one whole (100%).
pub const BPS_SCALE: i128 = 10_000;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// Signed so that differences and corrections can be expressed; sale totals
/// themselves are always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Unit price times quantity, `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use shears_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(2500);
    /// assert_eq!(unit_price.checked_multiply_quantity(3).unwrap().cents(), 7500);
    /// assert!(Money::from_cents(i64::MAX / 2).checked_multiply_quantity(3).is_none());
    /// ```
    #[inline]
    pub fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        self.0.checked_mul(qty).map(Money)
    }

    #[inline]
    pub fn checked_add(&self, other: Money) -> Option<Self> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Splits a tax-inclusive amount into its net and tax parts.
    ///
    /// `net = round_half_up(gross * 10000 / (10000 + bps))`, `tax = gross - net`.
    /// A zero rate returns the whole amount as net.
    ///
    /// ## Example
    /// ```rust
    /// use shears_core::money::Money;
    /// use shears_core::types::TaxRate;
    ///
    /// let split = Money::from_cents(11900).split_inclusive(TaxRate::from_bps(1900));
    /// assert_eq!(split.net.cents(), 10000);
    /// assert_eq!(split.tax.cents(), 1900);
    /// ```
    pub fn split_inclusive(&self, rate: TaxRate) -> TaxSplit {
        if rate.is_zero() {
            return TaxSplit {
                net: *self,
                tax: Money::zero(),
            };
        }

        // i128 keeps gross * 10000 from overflowing
        let divisor = BPS_SCALE + rate.bps() as i128;
        let net = div_round_half_up(self.0 as i128 * BPS_SCALE, divisor);
        let net = Money::from_cents(net as i64);

        TaxSplit {
            net,
            tax: *self - net,
        }
    }

    /// Share of `self` in `whole`, in basis points (half-up).
    ///
    /// Returns 0 when `whole` is zero.
    pub fn share_bps_of(&self, whole: Money) -> u32 {
        if whole.0 <= 0 || self.0 <= 0 {
            return 0;
        }
        div_round_half_up(self.0 as i128 * BPS_SCALE, whole.0 as i128) as u32
    }
}

/// Rounds `num / den` half away from zero. `den` must be positive.
fn div_round_half_up(num: i128, den: i128) -> i128 {
    if num >= 0 {
        (2 * num + den) / (2 * den)
    } else {
        -((-2 * num + den) / (2 * den))
    }
}

// =============================================================================
// Tax Split
// =============================================================================

/// A tax-inclusive amount broken into net and tax. `net + tax` is always
/// the original amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxSplit {
    pub net: Money,
    pub tax: Money,
}

impl TaxSplit {
    #[inline]
    pub fn gross(&self) -> Money {
        self.net + self.tax
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-oriented display with two decimal places, no currency symbol.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
