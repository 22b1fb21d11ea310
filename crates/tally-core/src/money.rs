//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every price, line total, tax and report sum is an i64 count of minor   │
//! │  currency units. Rounding happens in exactly one place per operation:   │
//! │                                                                         │
//! │    line discount   = round(gross × percent / 100)                       │
//! │    exclusive tax   = round(subtotal × bps / 10000)                      │
//! │    inclusive tax   = subtotal − round(subtotal × 10000 / (10000 + bps)) │
//! │                                                                         │
//! │  round() is ROUND HALF UP (away from zero). The cart engine and the     │
//! │  daily report both use these helpers, so their numbers always agree.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::money::Money;
//!
//! let price = Money::from_minor(10_000);
//! let line = price.times(3);
//! assert_eq!(line.minor(), 30_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Rounding
// =============================================================================

/// Divides `numerator` by a positive `denominator`, rounding half away from zero.
fn div_round_half_up(numerator: i128, denominator: i128) -> i64 {
    let magnitude = (2 * numerator.abs() + denominator) / (2 * denominator);
    let signed = if numerator < 0 { -magnitude } else { magnitude };
    signed as i64
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: change and refunds may go negative in intermediate math
/// - **Single field tuple struct**: serializes as a bare integer in reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Returns the whole major-unit portion (truncated toward zero).
    ///
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::from_minor(1099).major(), 10);
    /// assert_eq!(Money::from_minor(-550).major(), -5);
    /// ```
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the fractional portion (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % 100).abs()
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
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit price by a quantity.
    ///
    /// Callers bound both factors first; see [`checked_times`](Self::checked_times).
    #[inline]
    pub const fn times(&self, quantity: i64) -> Self {
        Money(self.0 * quantity)
    }

    /// `times`, or `None` when the product leaves the i64 range.
    #[inline]
    pub const fn checked_times(&self, quantity: i64) -> Option<Self> {
        match self.0.checked_mul(quantity) {
            Some(minor) => Some(Money(minor)),
            None => None,
        }
    }

    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(minor) => Some(Money(minor)),
            None => None,
        }
    }

    /// Returns `percent`% of this amount, rounded half up.
    ///
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// // 15% of 3.33 = 0.4995 → 0.50
    /// assert_eq!(Money::from_minor(333).percent_of(15).minor(), 50);
    /// ```
    pub fn percent_of(&self, percent: u8) -> Money {
        Money(div_round_half_up(self.0 as i128 * percent as i128, 100))
    }

    /// Tax charged on top of this (tax-exclusive) amount.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    /// use tally_core::types::TaxRate;
    ///
    /// let subtotal = Money::from_minor(30_000);
    /// let tax = subtotal.exclusive_tax(TaxRate::from_bps(1200)); // 12%
    /// assert_eq!(tax.minor(), 3_600);
    /// ```
    pub fn exclusive_tax(&self, rate: TaxRate) -> Money {
        Money(div_round_half_up(self.0 as i128 * rate.bps() as i128, 10_000))
    }

    /// Tax already contained in this (tax-inclusive) amount.
    ///
    /// The net amount is rounded first and the tax is the remainder, so
    /// `net + tax` always reconstructs the original amount exactly.
    pub fn inclusive_tax(&self, rate: TaxRate) -> Money {
        let net = div_round_half_up(self.0 as i128 * 10_000, 10_000 + rate.bps() as i128);
        Money(self.0 - net)
    }

    /// Display adapter using `symbol` in place of `$`.
    ///
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::from_minor(-1250).with_symbol("Rp ").to_string(), "-Rp 12.50");
    /// ```
    pub fn with_symbol<'a>(&self, symbol: &'a str) -> MoneyDisplay<'a> {
        MoneyDisplay {
            amount: *self,
            symbol,
        }
    }

    /// Subtracts the smaller amount, never going below zero.
    #[inline]
    pub fn saturating_sub(self, other: Money) -> Money {
        Money((self.0 - other.0).max(0))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Human-readable `$12.34` rendering.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.with_symbol("$"), f)
    }
}

/// `Money` rendered with a configured currency symbol.
#[derive(Debug, Clone, Copy)]
pub struct MoneyDisplay<'a> {
    amount: Money,
    symbol: &'a str,
}

impl fmt::Display for MoneyDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.amount.is_negative() { "-" } else { "" };
        write!(
            f,
            "{}{}{}.{:02}",
            sign,
            self.symbol,
            self.amount.major().abs(),
            self.amount.minor_part()
        )
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
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
