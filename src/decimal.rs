use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

/// Money amount held at full internal precision.
///
/// Arithmetic on Money never rounds. Quantization to the 2-decimal-place cash
/// value happens only when a field is emitted on an output record, via
/// `quantize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// create from a decimal, keeping every digit
    pub fn from_decimal(d: Decimal) -> Self {
        Money(d)
    }

    /// create from a whole currency amount
    pub fn from_major(amount: i64) -> Self {
        Money(Decimal::from(amount))
    }

    /// create from string with exact parsing
    pub fn from_str_exact(s: &str) -> Result<Self, rust_decimal::Error> {
        Ok(Money(Decimal::from_str(s)?))
    }

    /// get underlying decimal
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// round to the 2-decimal-place cash value, half-even
    pub fn quantize(&self) -> Self {
        Money(self.0.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven))
    }

    /// check if zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// check if strictly negative
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// absolute value
    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// minimum of two values
    pub fn min(self, other: Self) -> Self {
        Money(self.0.min(other.0))
    }

    /// maximum of two values
    pub fn max(self, other: Self) -> Self {
        Money(self.0.max(other.0))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::from_str_exact(s)
    }
}

impl From<Decimal> for Money {
    fn from(d: Decimal) -> Self {
        Money::from_decimal(d)
    }
}

impl From<i64> for Money {
    fn from(i: i64) -> Self {
        Money::from_major(i)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Money) {
        self.0 -= other.0;
    }
}

impl Mul<Decimal> for Money {
    type Output = Money;

    fn mul(self, other: Decimal) -> Money {
        Money(self.0 * other)
    }
}

impl Div<Decimal> for Money {
    type Output = Money;

    fn div(self, other: Decimal) -> Money {
        Money(self.0 / other)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

/// interest rate expressed as a percent (5 means 5%)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Rate(Decimal);

impl Rate {
    pub const ZERO: Rate = Rate(Decimal::ZERO);

    /// create from a percent value (5 for 5%)
    pub fn from_percent(p: Decimal) -> Self {
        Rate(p)
    }

    /// get as percent
    pub fn as_percent(&self) -> Decimal {
        self.0
    }

    /// the rate as a plain fraction (5% gives 0.05)
    pub fn fraction(&self) -> Decimal {
        self.0 / Decimal::ONE_HUNDRED
    }

    /// check if strictly negative
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl From<Decimal> for Rate {
    fn from(d: Decimal) -> Self {
        Rate::from_percent(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_keeps_full_precision() {
        let a = Money::from_str_exact("0.1").unwrap();
        let b = Money::from_str_exact("0.2").unwrap();
        assert_eq!((a + b).as_decimal(), dec!(0.3));

        // a third of 100 keeps its long tail until quantization
        let c = Money::from_major(100) / dec!(3);
        assert!(c.as_decimal().to_string().len() > 10);
        assert_eq!(c.quantize().as_decimal(), dec!(33.33));
    }

    #[test]
    fn test_quantize_half_even() {
        assert_eq!(Money::from_decimal(dec!(2.125)).quantize().as_decimal(), dec!(2.12));
        assert_eq!(Money::from_decimal(dec!(2.135)).quantize().as_decimal(), dec!(2.14));
        assert_eq!(Money::from_decimal(dec!(2.1251)).quantize().as_decimal(), dec!(2.13));
        assert_eq!(Money::from_decimal(dec!(-2.125)).quantize().as_decimal(), dec!(-2.12));
    }

    #[test]
    fn test_money_sign_checks() {
        assert!(Money::from_major(-1).is_negative());
        assert!(!Money::ZERO.is_negative());
        assert!(Money::ZERO.is_zero());
        assert_eq!(Money::from_major(-3).abs(), Money::from_major(3));
    }

    #[test]
    fn test_rate_fraction() {
        let r = Rate::from_percent(dec!(5));
        assert_eq!(r.as_percent(), dec!(5));
        assert_eq!(r.fraction(), dec!(0.05));
        assert_eq!(r.to_string(), "5%");
    }

    #[test]
    fn test_rate_negative() {
        assert!(Rate::from_percent(dec!(-0.5)).is_negative());
        assert!(!Rate::ZERO.is_negative());
    }
}
