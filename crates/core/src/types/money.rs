//! Money in integer minor currency units.
//!
//! All arithmetic on prices, fees and discounts happens on [`Money`], which
//! wraps an `i64` count of minor units (pence, cents). Decimal major units
//! are produced only for display and for wire payloads that expect them.

use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::Quantity;

/// An amount of money in minor currency units.
///
/// The amount is signed: a discount larger than the subtotal produces a
/// negative total rather than silently clamping.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero minor units.
    pub const ZERO: Self = Self(0);

    /// Create an amount from minor units.
    #[must_use]
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// The amount in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// The amount in major units with two decimal places (e.g. `12.50`).
    #[must_use]
    pub fn to_major(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Multiply a unit price by a line quantity.
    #[must_use]
    pub fn times(self, quantity: Quantity) -> Self {
        Self(self.0.saturating_mul(i64::from(quantity.get())))
    }

    /// Take a percentage of this amount, rounding half away from zero to
    /// whole minor units.
    ///
    /// Returns `None` if the result does not fit in an `i64`.
    #[must_use]
    pub fn percent(self, percent: Decimal) -> Option<Self> {
        let exact = Decimal::from(self.0).checked_mul(percent)? / Decimal::ONE_HUNDRED;
        exact
            .round_dp_with_strategy(0, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .map(Self)
    }

    /// Whether the amount is exactly zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Format for display with the currency symbol (e.g. "£12.50").
    #[must_use]
    pub fn display(self, currency: CurrencyCode) -> String {
        let major = self.to_major();
        if major.is_sign_negative() && !major.is_zero() {
            format!("-{}{:.2}", currency.symbol(), major.abs())
        } else {
            format!("{}{:.2}", currency.symbol(), major)
        }
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self(self.0.saturating_neg())
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<i64> for Money {
    fn from(minor: i64) -> Self {
        Self(minor)
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    USD,
    EUR,
    #[default]
    GBP,
    CAD,
    AUD,
    VND,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
            Self::VND => "₫",
        }
    }

    /// Three-letter ISO code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
            Self::VND => "VND",
        }
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            "VND" => Ok(Self::VND),
            other => Err(format!("unsupported currency code: {other}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_times_quantity() {
        let unit = Money::from_minor(1000);
        assert_eq!(unit.times(Quantity::new(3).unwrap()), Money::from_minor(3000));
    }

    #[test]
    fn test_percent_exact() {
        let subtotal = Money::from_minor(2500);
        assert_eq!(subtotal.percent(Decimal::from(10)), Some(Money::from_minor(250)));
    }

    #[test]
    fn test_percent_rounds_half_away_from_zero() {
        // 15% of 1010 = 151.5
        let amount = Money::from_minor(1010).percent(Decimal::from(15)).unwrap();
        assert_eq!(amount, Money::from_minor(152));
    }

    #[test]
    fn test_percent_fractional() {
        // 12.5% of 1000 = 125
        let percent = Decimal::new(125, 1);
        assert_eq!(
            Money::from_minor(1000).percent(percent),
            Some(Money::from_minor(125))
        );
    }

    #[test]
    fn test_sum() {
        let total: Money = [100, 250, 5].into_iter().map(Money::from_minor).sum();
        assert_eq!(total.minor(), 355);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_minor(2250).display(CurrencyCode::GBP), "£22.50");
        assert_eq!(Money::from_minor(5).display(CurrencyCode::USD), "$0.05");
        assert_eq!(Money::from_minor(-150).display(CurrencyCode::GBP), "-£1.50");
    }

    #[test]
    fn test_to_major() {
        assert_eq!(Money::from_minor(1999).to_major().to_string(), "19.99");
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("gbp".parse::<CurrencyCode>(), Ok(CurrencyCode::GBP));
        assert!("XYZ".parse::<CurrencyCode>().is_err());
    }
}
