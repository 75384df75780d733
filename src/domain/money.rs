use crate::error::MarketError;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// Cached wallet figure. May legitimately sit at zero.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Balance(pub Decimal);

/// Represents a positive monetary amount moved by a single ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, MarketError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(MarketError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = MarketError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl From<Amount> for Balance {
    fn from(amount: Amount) -> Self {
        Self(amount.0)
    }
}

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn checked_add(self, rhs: Self) -> Result<Self, MarketError> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or_else(|| out_of_range(self.0, "+", rhs.0))
    }
}

fn out_of_range(lhs: Decimal, op: &str, rhs: Decimal) -> MarketError {
    MarketError::ValidationError(format!("{} {} {} is out of range", lhs, op, rhs))
}

/// `value * factor`, rejecting products a `Decimal` cannot hold.
pub fn multiply(value: Decimal, factor: Decimal) -> Result<Decimal, MarketError> {
    value
        .checked_mul(factor)
        .ok_or_else(|| out_of_range(value, "x", factor))
}

impl Add for Balance {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Balance {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl AddAssign for Balance {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Balance {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

/// Validates a commission percentage.
pub fn percent(value: Decimal) -> Result<Decimal, MarketError> {
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(MarketError::ValidationError(format!(
            "Percentage must be between 0 and 100, got {}",
            value
        )));
    }
    Ok(value)
}

/// `round(base * pct / 100)` with halves rounded up, the way the platform
/// has always rounded its cut.
pub fn percentage_of(base: Decimal, pct: Decimal) -> Result<Decimal, MarketError> {
    Ok((multiply(base, pct)? / Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_balance_arithmetic() {
        let b1 = Balance::new(dec!(10.0));
        let b2 = Balance::new(dec!(5.0));
        assert_eq!(b1 + b2, Balance::new(dec!(15.0)));
        assert_eq!(b1 - b2, Balance::new(dec!(5.0)));
    }

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(1.0)).is_ok());
        assert!(matches!(
            Amount::new(dec!(0.0)),
            Err(MarketError::ValidationError(_))
        ));
        assert!(matches!(
            Amount::new(dec!(-1.0)),
            Err(MarketError::ValidationError(_))
        ));
    }

    #[test]
    fn test_amount_rejects_non_positive_on_deserialize() {
        let ok: Amount = serde_json::from_str("\"12.5\"").unwrap();
        assert_eq!(ok.value(), dec!(12.5));
        assert!(serde_json::from_str::<Amount>("\"0\"").is_err());
    }

    #[test]
    fn test_percentage_of_rounds_half_up() {
        assert_eq!(percentage_of(dec!(2000), dec!(10)).unwrap(), dec!(200));
        assert_eq!(percentage_of(dec!(125), dec!(10)).unwrap(), dec!(13));
        assert_eq!(percentage_of(dec!(124), dec!(10)).unwrap(), dec!(12));
        assert_eq!(percentage_of(dec!(999), dec!(0)).unwrap(), dec!(0));
        assert_eq!(percentage_of(dec!(999), dec!(100)).unwrap(), dec!(999));
    }

    #[test]
    fn test_percent_bounds() {
        assert!(percent(dec!(0)).is_ok());
        assert!(percent(dec!(100)).is_ok());
        assert!(percent(dec!(-0.1)).is_err());
        assert!(percent(dec!(100.5)).is_err());
    }

    #[test]
    fn test_overflow_is_a_validation_error() {
        let err = Balance::new(Decimal::MAX)
            .checked_add(Balance::new(dec!(1)))
            .unwrap_err();
        assert!(matches!(err, MarketError::ValidationError(_)));
        assert!(matches!(
            multiply(Decimal::MAX / dec!(2), dec!(3)),
            Err(MarketError::ValidationError(_))
        ));
        assert!(percentage_of(Decimal::MAX, dec!(50)).is_err());
        assert_eq!(multiply(dec!(250), dec!(4)).unwrap(), dec!(1000));
    }
}
