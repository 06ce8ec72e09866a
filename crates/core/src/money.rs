use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

/// A monetary amount with two decimal places. Persisted as integer cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(Decimal);

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    pub fn to_cents(self) -> i64 {
        (self.0 * Decimal::from(100)).round().to_i64().unwrap_or(0)
    }

    pub fn from_decimal(decimal: Decimal) -> Self {
        Money(decimal.round_dp(2))
    }

    pub fn to_decimal(self) -> Decimal {
        self.0
    }

    pub fn to_f64(self) -> f64 {
        self.0.to_f64().unwrap_or(0.0)
    }

    /// Scales by a non-monetary quantity (recipe kilograms, litres, tonnes).
    pub fn scale(self, qty: f64) -> Self {
        let factor = Decimal::from_f64(qty).unwrap_or(Decimal::ZERO);
        Money::from_decimal(self.0 * factor)
    }

    pub fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Money(self.0 - rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::zero(), |a, b| a + b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cents_round_trip() {
        assert_eq!(Money::from_cents(123_45).to_cents(), 123_45);
        assert_eq!(Money::from_cents(-500).to_cents(), -500);
    }

    #[test]
    fn from_decimal_rounds_to_two_places() {
        assert_eq!(Money::from_decimal(Decimal::new(10_004, 3)).to_cents(), 10_00);
        assert_eq!(Money::from_decimal(Decimal::new(10_006, 3)).to_cents(), 10_01);
    }

    #[test]
    fn display_two_decimal_places() {
        assert_eq!(Money::from_cents(4500_00).to_string(), "4500.00");
    }

    #[test]
    fn net_is_income_minus_expense() {
        let net = Money::from_cents(1000_00) - Money::from_cents(250_50);
        assert_eq!(net.to_cents(), 749_50);
    }

    #[test]
    fn scale_by_quantity() {
        // 5.50 per kg, 310 kg
        let line = Money::from_cents(550).scale(310.0);
        assert_eq!(line.to_cents(), 1705_00);
    }

    #[test]
    fn sum_of_moneys() {
        let total: Money = [100, 200, 300].into_iter().map(Money::from_cents).sum();
        assert_eq!(total.to_cents(), 600);
    }
}
