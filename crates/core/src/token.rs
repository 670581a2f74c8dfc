//! A basic fungible token: integer amounts and coins of a named denomination.

use std::fmt::Display;
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSchema, BorshSerialize};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::arith::{self, checked};

/// Amount in the smallest unit of a coin. Amounts are integral; fractional
/// values only exist as [`crate::dec::Dec`] during intermediate computation.
#[derive(
    Clone,
    Copy,
    Default,
    BorshSerialize,
    BorshDeserialize,
    BorshSchema,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Debug,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct Amount {
    raw: u64,
}

impl Amount {
    /// Zero amount
    pub const fn zero() -> Self {
        Self { raw: 0 }
    }

    /// Check if [`Amount`] is zero.
    pub fn is_zero(&self) -> bool {
        self.raw == 0
    }

    /// Get the raw integer value
    pub fn raw_amount(&self) -> u64 {
        self.raw
    }

    /// Checked addition. Returns `None` on overflow.
    pub fn checked_add(&self, amount: Amount) -> Option<Self> {
        self.raw.checked_add(amount.raw).map(|raw| Self { raw })
    }

    /// Checked subtraction. Returns `None` on underflow.
    pub fn checked_sub(&self, amount: Amount) -> Option<Self> {
        self.raw.checked_sub(amount.raw).map(|raw| Self { raw })
    }

    /// Sum an iterator of amounts, failing on overflow.
    pub fn sum<I>(amounts: I) -> Result<Self, arith::Error>
    where
        I: IntoIterator<Item = Amount>,
    {
        amounts.into_iter().try_fold(Self::zero(), |acc, amount| {
            let raw = checked!(acc.raw + amount.raw)?;
            Ok(Self { raw })
        })
    }
}

impl From<u64> for Amount {
    fn from(raw: u64) -> Self {
        Self { raw }
    }
}

impl From<Amount> for u64 {
    fn from(amount: Amount) -> Self {
        amount.raw
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

#[allow(missing_docs)]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountParseError {
    #[error("Error decoding token amount: {0}")]
    InvalidDecimal(String),
    #[error("Error parsing coin: {0}")]
    InvalidCoin(String),
}

impl FromStr for Amount {
    type Err = AmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(Self::from)
            .map_err(|e| AmountParseError::InvalidDecimal(e.to_string()))
    }
}

/// An amount of a coin in a named denomination, e.g. `"1000atom"`.
#[derive(
    Clone,
    BorshSerialize,
    BorshDeserialize,
    BorshSchema,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Debug,
    Serialize,
    Deserialize,
)]
pub struct Coin {
    /// Denomination of the coin
    pub denom: String,
    /// The amount
    pub amount: Amount,
}

impl Coin {
    /// Construct a new coin
    pub fn new(denom: impl Into<String>, amount: Amount) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    /// A coin is non-positive when its amount is zero
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }
}

impl Display for Coin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

impl FromStr for Coin {
    type Err = AmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| AmountParseError::InvalidCoin(s.to_owned()))?;
        let (amount, denom) = s.split_at(split);
        if amount.is_empty()
            || !denom.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(AmountParseError::InvalidCoin(s.to_owned()));
        }
        Ok(Self::new(denom, amount.parse::<Amount>()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coin_parse() {
        let coin = Coin::from_str("1000atom").unwrap();
        assert_eq!(coin, Coin::new("atom", Amount::from(1000)));
        assert_eq!(coin.to_string(), "1000atom");
        assert!(Coin::from_str("atom").is_err());
        assert!(Coin::from_str("1000").is_err());
        assert!(Coin::from_str("10 atom").is_err());
    }

    #[test]
    fn test_amount_checked_ops() {
        let max = Amount::from(u64::MAX);
        assert!(max.checked_add(Amount::from(1)).is_none());
        assert!(Amount::zero().checked_sub(Amount::from(1)).is_none());
        assert_eq!(
            Amount::sum([Amount::from(1), Amount::from(2)]).unwrap(),
            Amount::from(3)
        );
        assert!(Amount::sum([max, Amount::from(1)]).is_err());
    }
}
