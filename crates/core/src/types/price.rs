//! Monetary amounts using decimal arithmetic.
//!
//! All order amounts are in a single store currency, so [`Money`] carries only
//! the amount. Amounts are always held at two decimal places, rounding
//! midpoints away from zero (`0.005` becomes `0.01`).

use core::fmt;
use std::iter::Sum;
use std::ops::Add;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A currency amount rounded to cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Largest amount an order may carry: `9999999999.99`, the range of a
    /// `NUMERIC(12, 2)` column.
    pub const MAX: Self = Self(Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2));

    /// Create an amount, rounding to two decimal places.
    #[must_use]
    pub fn new(amount: Decimal) -> Self {
        Self(amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Create an amount, or `None` when it rounds to more than [`Self::MAX`].
    #[must_use]
    pub fn bounded(amount: Decimal) -> Option<Self> {
        let money = Self::new(amount);
        (money <= Self::MAX).then_some(money)
    }

    /// Create an amount from integer cents.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// The decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// The amount in integer cents, if it fits in an `i64`.
    #[must_use]
    pub fn cents(&self) -> Option<i64> {
        self.0.checked_mul(Decimal::ONE_HUNDRED)?.to_i64()
    }

    /// Whether the amount is below zero.
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self::new(amount)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.0 + rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

/// Formats as dollars, e.g. `$24.98`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_rounds_midpoint_away_from_zero() {
        assert_eq!(Money::new(dec("1.005")).amount(), dec("1.01"));
        assert_eq!(Money::new(dec("1.004")).amount(), dec("1.00"));
        assert_eq!(Money::new(dec("2.675")).amount(), dec("2.68"));
    }

    #[test]
    fn test_cents_conversion() {
        assert_eq!(Money::from_cents(2498).amount(), dec("24.98"));
        assert_eq!(Money::new(dec("24.98")).cents(), Some(2498));
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::new(dec("5")).to_string(), "$5.00");
        assert_eq!(Money::from_cents(1999).to_string(), "$19.99");
    }

    #[test]
    fn test_sum() {
        let total: Money = [Money::from_cents(1998), Money::from_cents(500)]
            .into_iter()
            .sum();
        assert_eq!(total, Money::from_cents(2498));
    }

    #[test]
    fn test_deserialize_number_or_string() {
        let from_number: Money = serde_json::from_str("9.99").unwrap();
        let from_string: Money = serde_json::from_str("\"9.99\"").unwrap();
        assert_eq!(from_number, from_string);
        assert_eq!(from_number.amount(), dec("9.99"));
    }

    #[test]
    fn test_bounded() {
        assert_eq!(Money::MAX.amount(), dec("9999999999.99"));
        assert_eq!(Money::MAX.to_string(), "$9999999999.99");
        assert_eq!(Money::bounded(dec("9999999999.994")), Some(Money::MAX));
        assert_eq!(Money::bounded(dec("9999999999.995")), None);
        assert_eq!(Money::bounded(Decimal::MAX), None);
        assert_eq!(Money::MAX.cents(), Some(999_999_999_999));
    }

    #[test]
    fn test_is_negative() {
        assert!(Money::new(dec("-0.01")).is_negative());
        assert!(!Money::ZERO.is_negative());
    }
}
