//! Helper types shared across the remotepay crates.

pub mod money_amount;

pub use money_amount::{MoneyAmount, MoneyAmountParseError};
