//! Type-safe price representation using decimal arithmetic.
//!
//! The backend and the persisted cart both carry prices as plain JSON
//! numbers (`29.99`), so `Price` serializes as a float while doing all
//! arithmetic in [`Decimal`].

use core::fmt;
use core::iter::Sum;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Prices cannot be negative.
    #[error("price cannot be negative (got {0})")]
    Negative(Decimal),
}

/// A non-negative price in the shop's currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(Decimal);

impl Price {
    /// A zero price.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price, rejecting negative amounts.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] when `amount < 0`.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        Ok(Self(amount))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Multiply by a whole number of units, saturating at [`Decimal::MAX`].
    #[must_use]
    pub fn times(self, units: u32) -> Self {
        Self(self.0.saturating_mul(Decimal::from(units)))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl std::str::FromStr for Price {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount = s
            .trim()
            .trim_start_matches('$')
            .parse::<Decimal>()
            .map_err(|e| format!("invalid price '{s}': {e}"))?;
        Self::new(amount).map_err(|e| e.to_string())
    }
}

/// Saturates at [`Decimal::MAX`] instead of panicking.
impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self(iter.fold(Decimal::ZERO, |total, p| total.saturating_add(p.0)))
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = rust_decimal::serde::float::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_negative() {
        assert!(matches!(
            Price::new(Decimal::new(-1, 2)),
            Err(PriceError::Negative(_))
        ));
        assert!(Price::new(Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_serializes_as_json_number() {
        let price = Price::new(Decimal::new(2999, 2)).unwrap();
        assert_eq!(serde_json::to_string(&price).unwrap(), "29.99");
    }

    #[test]
    fn test_deserializes_integers_and_floats() {
        let whole: Price = serde_json::from_str("10").unwrap();
        assert_eq!(whole.amount(), Decimal::from(10));

        let fractional: Price = serde_json::from_str("29.99").unwrap();
        assert_eq!(fractional.amount(), Decimal::new(2999, 2));
    }

    #[test]
    fn test_deserialize_negative_fails() {
        assert!(serde_json::from_str::<Price>("-5").is_err());
    }

    #[test]
    fn test_times_and_sum() {
        let price = Price::new(Decimal::new(250, 2)).unwrap();
        let total: Price = [price.times(2), price].into_iter().sum();
        assert_eq!(total.amount(), Decimal::new(750, 2));
        assert_eq!(total.to_string(), "$7.50");
    }

    #[test]
    fn test_arithmetic_saturates() {
        let huge = Price::new(Decimal::MAX).unwrap();
        assert_eq!(huge.times(2).amount(), Decimal::MAX);

        let total: Price = [huge, huge, Price::new(Decimal::ONE).unwrap()]
            .into_iter()
            .sum();
        assert_eq!(total.amount(), Decimal::MAX);
    }

    #[test]
    fn test_from_str() {
        let price: Price = "$12.5".parse().unwrap();
        assert_eq!(price.amount(), Decimal::new(125, 1));
        assert!("-3".parse::<Price>().is_err());
        assert!("abc".parse::<Price>().is_err());
    }
}
