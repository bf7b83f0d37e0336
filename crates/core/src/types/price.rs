//! Type-safe price representation using decimal arithmetic.
//!
//! The commerce API sends prices and cart totals as bare JSON numbers in the
//! store's single currency. They are decoded straight into [`Decimal`] so no
//! float rounding leaks into display.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Prices are never negative.
    #[error("price cannot be negative (got {0})")]
    Negative(Decimal),
}

/// A non-negative amount in the store currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize)]
#[serde(try_from = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// A price of zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price, rejecting negative amounts.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` if `amount` is below zero.
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

    /// Format with thousands separators and exactly two fraction digits,
    /// e.g. `1,234.50`.
    #[must_use]
    pub fn display(&self) -> String {
        let mut rounded = self.0.round_dp(2);
        rounded.rescale(2);
        let fixed = rounded.to_string();
        let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

        let digits: Vec<char> = whole.chars().collect();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.iter().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(*c);
        }

        format!("{grouped}.{fraction}")
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&self.0, serializer)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.display())
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
    fn test_rejects_negative() {
        assert!(matches!(
            Price::new(dec("-0.01")),
            Err(PriceError::Negative(_))
        ));
        assert!(Price::new(Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_display_two_fraction_digits() {
        assert_eq!(Price::new(dec("5")).unwrap().display(), "5.00");
        assert_eq!(Price::new(dec("19.9")).unwrap().display(), "19.90");
        assert_eq!(Price::new(dec("0.006")).unwrap().display(), "0.01");
    }

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Price::new(dec("1234.5")).unwrap().display(), "1,234.50");
        assert_eq!(Price::new(dec("1234567")).unwrap().display(), "1,234,567.00");
        assert_eq!(Price::new(dec("123")).unwrap().display(), "123.00");
    }

    #[test]
    fn test_deserialize_from_json_number() {
        let price: Price = serde_json::from_str("49.99").unwrap();
        assert_eq!(price.amount(), dec("49.99"));
        assert!(serde_json::from_str::<Price>("-1").is_err());
    }
}
