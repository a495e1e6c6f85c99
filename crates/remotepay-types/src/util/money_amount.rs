//! Human-readable currency amount parsing.
//!
//! This module provides [`MoneyAmount`], a type for parsing human-readable
//! currency strings into precise decimal values suitable for conversion to
//! whole-cent charge amounts.
//!
//! # Supported Formats
//!
//! - Plain numbers: `"100"`, `"0.01"`
//! - With currency symbols: `"$10.50"`
//! - With thousand separators: `"1,000"`, `"1,000.50"`
//!
//! # Example
//!
//! ```rust
//! use remotepay_types::util::MoneyAmount;
//!
//! let amount = MoneyAmount::parse("$10.50").unwrap();
//! assert_eq!(amount.to_cents().unwrap().value(), 1050);
//! ```

use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::fmt;
use std::fmt::Display;
use std::str::FromStr;

use crate::proto::Cents;

/// A parsed monetary amount with decimal precision.
///
/// This type represents a non-negative decimal value parsed from a
/// human-readable string. Charge amounts on the wire are whole cents, so a
/// parsed amount must have at most two decimal places before it can be
/// converted with [`to_cents`](MoneyAmount::to_cents).
#[derive(Debug, Clone, PartialEq)]
pub struct MoneyAmount(pub Decimal);

/// Errors that can occur when parsing a monetary amount.
#[derive(Debug, thiserror::Error)]
pub enum MoneyAmountParseError {
    /// The input string could not be parsed as a number.
    #[error("Invalid number format")]
    InvalidFormat,
    /// The value is outside the allowed range.
    #[error(
        "Amount must be between {} and {}",
        constants::MIN_STR,
        constants::MAX_STR
    )]
    OutOfRange,
    /// Negative values are not allowed.
    #[error("Negative value is not allowed")]
    Negative,
    /// The input has more decimal places than a whole-cent amount allows.
    #[error("Amounts are limited to whole cents, got {scale} decimal places")]
    SubCentPrecision {
        /// Decimal places in the input.
        scale: u32,
    },
}

mod constants {
    use super::*;
    use std::sync::LazyLock;

    pub const MIN_STR: &str = "0.01";
    pub const MAX_STR: &str = "99999.99";

    pub static MIN: LazyLock<Decimal> =
        LazyLock::new(|| Decimal::from_str(MIN_STR).expect("valid decimal"));
    pub static MAX: LazyLock<Decimal> =
        LazyLock::new(|| Decimal::from_str(MAX_STR).expect("valid decimal"));
}

impl MoneyAmount {
    /// Returns the number of decimal places in the original input.
    pub fn scale(&self) -> u32 {
        self.0.scale()
    }

    /// Parses a human-readable currency string into a [`MoneyAmount`].
    ///
    /// Currency symbols, thousand separators, and whitespace are stripped
    /// before parsing. The result must be a non-negative number within
    /// the allowed range.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The string cannot be parsed as a number
    /// - The value is negative
    /// - The value is outside the allowed range
    pub fn parse(input: &str) -> Result<Self, MoneyAmountParseError> {
        // Remove anything that isn't digit, dot, minus
        let cleaned = Regex::new(r"[^\d\.\-]+")
            .unwrap()
            .replace_all(input, "")
            .to_string();

        let parsed =
            Decimal::from_str(&cleaned).map_err(|_| MoneyAmountParseError::InvalidFormat)?;

        if parsed.is_sign_negative() {
            return Err(MoneyAmountParseError::Negative);
        }

        if parsed < *constants::MIN || parsed > *constants::MAX {
            return Err(MoneyAmountParseError::OutOfRange);
        }

        Ok(MoneyAmount(parsed))
    }

    /// Converts the amount to whole cents.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyAmountParseError::SubCentPrecision`] if the input had
    /// more than two decimal places.
    pub fn to_cents(&self) -> Result<Cents, MoneyAmountParseError> {
        let normalized = self.0.normalize();
        if normalized.scale() > 2 {
            return Err(MoneyAmountParseError::SubCentPrecision {
                scale: normalized.scale(),
            });
        }
        let cents = (normalized * Decimal::ONE_HUNDRED)
            .to_u64()
            .ok_or(MoneyAmountParseError::OutOfRange)?;
        Ok(Cents::from(cents))
    }
}

impl FromStr for MoneyAmount {
    type Err = MoneyAmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MoneyAmount::parse(s)
    }
}

impl TryFrom<&str> for MoneyAmount {
    type Error = MoneyAmountParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        MoneyAmount::from_str(value)
    }
}

impl Display for MoneyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}
