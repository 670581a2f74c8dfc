//! A signed fixed precision decimal type for the bonding computations. Any
//! computation that exceeds the specified precision is truncated toward zero
//! to the closest value with the specified precision.

use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSchema, BorshSerialize};
use eyre::eyre;
use serde::{Deserialize, Serialize};

use crate::token;
use crate::uint::Uint;

/// The number of Dec places for bonding rational calculations
pub const POS_DECIMAL_PRECISION: u8 = 12;

/// `10 ^ POS_DECIMAL_PRECISION`
const PRECISION_SCALE: i128 = 1_000_000_000_000;

#[derive(thiserror::Error, Debug)]
#[error(transparent)]
/// Generic error [`Dec`] operations can return
pub struct Error(#[from] eyre::Error);

/// Generic result type for fallible [`Dec`] operations
pub type Result<T> = std::result::Result<T, Error>;

/// A 128 bit signed number with [`POS_DECIMAL_PRECISION`] number of Dec
/// places.
///
/// An instance `x` of this type should be interpreted as the decimal
/// `x * 10 ^ (-POS_DECIMAL_PRECISION)`.
#[derive(
    Clone,
    Copy,
    Default,
    BorshSerialize,
    BorshDeserialize,
    BorshSchema,
    PartialEq,
    Serialize,
    Deserialize,
    Eq,
    PartialOrd,
    Ord,
    Hash,
)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub struct Dec(pub i128);

impl Dec {
    /// Performs division with truncation.
    ///
    /// The absolute values are divided to [`POS_DECIMAL_PRECISION`] places
    /// using a 256 bit intermediate, and the result is negated if exactly one
    /// of the operands is negative. Division by zero or a result that doesn't
    /// fit returns `None`.
    ///
    /// ```
    /// use stakebond_core::dec::Dec;
    ///
    /// let x = Dec::new(3, 1).unwrap(); // Represents 0.3
    /// let y = Dec::new(2, 1).unwrap(); // Represents 0.2
    /// let result = x.trunc_div(&y).unwrap();
    /// assert_eq!(result, Dec::new(15, 1).unwrap());
    /// ```
    pub fn trunc_div(&self, rhs: &Self) -> Option<Self> {
        let is_neg = self.is_negative() ^ rhs.is_negative();
        let res = Uint::from(self.0.unsigned_abs()).checked_mul_div(
            Uint::from(PRECISION_SCALE.unsigned_abs()),
            Uint::from(rhs.0.unsigned_abs()),
        )?;
        Self::from_abs_parts(is_neg, res)
    }

    /// The representation of 0
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Check if value is zero
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// The representation of 1
    pub const fn one() -> Self {
        Self(PRECISION_SCALE)
    }

    /// The representation of 2
    pub const fn two() -> Self {
        Self(2 * PRECISION_SCALE)
    }

    /// Create a new [`Dec`] using a mantissa and a scale.
    pub fn new(mantissa: i128, scale: u8) -> Option<Self> {
        if scale > POS_DECIMAL_PRECISION {
            None
        } else {
            // Cannot underflow
            #[allow(clippy::arithmetic_side_effects)]
            let scale_diff = POS_DECIMAL_PRECISION - scale;
            10_i128
                .checked_pow(u32::from(scale_diff))
                .and_then(|factor| mantissa.checked_mul(factor))
                .map(Self)
        }
    }

    /// Do addition of two [`Dec`]s
    pub fn checked_add(&self, rhs: Self) -> Option<Self> {
        Some(Self(self.0.checked_add(rhs.0)?))
    }

    /// Do subtraction of two [`Dec`]s
    pub fn checked_sub(&self, rhs: Self) -> Option<Self> {
        Some(Self(self.0.checked_sub(rhs.0)?))
    }

    /// Checked multiplication with truncation. Return `None` if the result
    /// doesn't fit.
    pub fn checked_mul(&self, other: impl Into<Self>) -> Option<Self> {
        let other: Self = other.into();
        let is_neg = self.is_negative() ^ other.is_negative();
        let res = Uint::from(self.0.unsigned_abs()).checked_mul_div(
            Uint::from(other.0.unsigned_abs()),
            Uint::from(PRECISION_SCALE.unsigned_abs()),
        )?;
        Self::from_abs_parts(is_neg, res)
    }

    /// Checked division
    pub fn checked_div(self, rhs: impl Into<Self>) -> Option<Self> {
        let rhs: Self = rhs.into();
        self.trunc_div(&rhs)
    }

    /// Checked negation
    pub fn checked_neg(&self) -> Option<Self> {
        Some(Self(self.0.checked_neg()?))
    }

    /// Return if the [`Dec`] is negative
    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    /// Return if the [`Dec`] is strictly positive
    pub fn is_positive(&self) -> bool {
        self.0.is_positive()
    }

    /// The absolute value. Returns `None` only for the minimal value.
    pub fn checked_abs(&self) -> Option<Self> {
        Some(Self(self.0.checked_abs()?))
    }

    /// Convert the Dec type into an i128 with truncation
    pub fn to_i128(&self) -> i128 {
        // Cannot panic as rhs > 0
        #[allow(clippy::arithmetic_side_effects)]
        let res = self.0 / PRECISION_SCALE;
        res
    }

    /// Convert the Dec into a token amount with truncation. Returns `None`
    /// for negative values or ones too large for an amount.
    pub fn to_amount(&self) -> Option<token::Amount> {
        if self.is_negative() {
            None
        } else {
            u64::try_from(self.to_i128()).ok().map(token::Amount::from)
        }
    }

    fn from_abs_parts(is_neg: bool, abs: Uint) -> Option<Self> {
        let abs = i128::try_from(abs.to_u128()?).ok()?;
        if is_neg {
            Some(Self(abs.checked_neg()?))
        } else {
            Some(Self(abs))
        }
    }
}

impl FromStr for Dec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (unsigned, is_neg) = match s.strip_prefix('-') {
            Some(strip) => (strip, true),
            None => (s, false),
        };
        let (large, small) = match unsigned.split_once('.') {
            Some(parts) => parts,
            None if unsigned.is_empty() => {
                return Err(eyre!("Could not parse {:?} as a Dec", s).into());
            }
            None => (unsigned, "0"),
        };

        // The integer part may be left out only before a decimal point, as
        // in ".5"
        let num_large = if large.is_empty() {
            0
        } else {
            if !large.chars().all(|c| c.is_ascii_digit()) {
                return Err(eyre!("Could not parse {} as an integer", large)
                    .into());
            }
            large.parse::<i128>().map_err(|e| {
                eyre!("Could not parse {} as an integer: {}", large, e)
            })?
        };

        // In theory we could allow this, but it is aesthetically offensive.
        // Thus we don't.
        if small.is_empty() {
            return Err(eyre!(
                "Failed to parse Dec from string as there were no numbers \
                 following the decimal point."
            )
            .into());
        }
        if !small.chars().all(|c| c.is_ascii_digit()) {
            return Err(eyre!("Could not parse .{} as decimals", small).into());
        }

        let trimmed = small
            .trim_end_matches('0')
            .chars()
            .take(usize::from(POS_DECIMAL_PRECISION))
            .collect::<String>();
        let decimal_part = if trimmed.is_empty() {
            0
        } else {
            // `trimmed.len` <= `POS_DECIMAL_PRECISION`
            #[allow(clippy::arithmetic_side_effects)]
            let len_diff = usize::from(POS_DECIMAL_PRECISION) - trimmed.len();
            let digits = trimmed.parse::<i128>().map_err(|e| {
                eyre!("Could not parse .{} as decimals: {}", small, e)
            })?;
            u32::try_from(len_diff)
                .ok()
                .and_then(|diff| 10_i128.checked_pow(diff))
                .and_then(|factor| digits.checked_mul(factor))
                .ok_or_else(|| eyre!("Decimal part overflow"))?
        };
        let int_part =
            num_large.checked_mul(PRECISION_SCALE).ok_or_else(|| {
                eyre!(
                    "The number {} is too large to fit in the Dec type.",
                    num_large
                )
            })?;
        let inner = int_part
            .checked_add(decimal_part)
            .ok_or_else(|| eyre!("Failed to add integral and decimal part"))?;
        if is_neg {
            Ok(Dec(inner
                .checked_neg()
                .ok_or_else(|| eyre!("Failed to negate"))?))
        } else {
            Ok(Dec(inner))
        }
    }
}

impl TryFrom<String> for Dec {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::from_str(&value)
    }
}

impl From<token::Amount> for Dec {
    fn from(amt: token::Amount) -> Self {
        Self::from(amt.raw_amount())
    }
}

impl From<u64> for Dec {
    fn from(num: u64) -> Self {
        // Cannot overflow as the value is in `u64` range
        #[allow(clippy::arithmetic_side_effects)]
        let inner = i128::from(num) * PRECISION_SCALE;
        Self(inner)
    }
}

impl From<Dec> for String {
    fn from(value: Dec) -> String {
        value.to_string()
    }
}

impl Display for Dec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let is_neg = self.is_negative();
        let mut string = self.0.unsigned_abs().to_string();
        if string.len() > usize::from(POS_DECIMAL_PRECISION) {
            // Cannot underflow as we checked above
            #[allow(clippy::arithmetic_side_effects)]
            let idx = string.len() - usize::from(POS_DECIMAL_PRECISION);
            string.insert(idx, '.');
        } else {
            let mut str_pre = "0.".to_string();
            // Cannot underflow as we checked above
            #[allow(clippy::arithmetic_side_effects)]
            let end = usize::from(POS_DECIMAL_PRECISION) - string.len();
            for _ in 0..end {
                str_pre.push('0');
            }
            str_pre.push_str(string.as_str());
            string = str_pre;
        };
        let stripped_string = string.trim_end_matches('0');
        let stripped_string = stripped_string.trim_end_matches('.');
        if stripped_string.is_empty() {
            f.write_str("0")
        } else if is_neg {
            let stripped_string = format!("-{}", stripped_string);
            f.write_str(stripped_string.as_str())
        } else {
            f.write_str(stripped_string)
        }
    }
}

impl Debug for Dec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_string())
    }
}

/// Helpers for testing.
#[cfg(any(test, feature = "testing"))]
#[allow(clippy::arithmetic_side_effects)]
pub mod testing {
    use proptest::prelude::*;

    use super::*;

    impl std::ops::Add<Dec> for Dec {
        type Output = Dec;

        fn add(self, rhs: Dec) -> Self::Output {
            self.checked_add(rhs).unwrap()
        }
    }

    impl std::ops::Sub<Dec> for Dec {
        type Output = Dec;

        fn sub(self, rhs: Dec) -> Self::Output {
            self.checked_sub(rhs).unwrap()
        }
    }

    impl<T> std::ops::Mul<T> for Dec
    where
        T: Into<Self>,
    {
        type Output = Dec;

        fn mul(self, rhs: T) -> Self::Output {
            self.checked_mul(rhs.into()).unwrap()
        }
    }

    impl<T> std::ops::Div<T> for Dec
    where
        T: Into<Self>,
    {
        type Output = Self;

        fn div(self, rhs: T) -> Self::Output {
            self.trunc_div(&rhs.into()).unwrap()
        }
    }

    /// Generate an arbitrary non-negative `Dec`
    pub fn arb_non_negative_dec() -> impl Strategy<Value = Dec> {
        (any::<u64>(), 0_u8..POS_DECIMAL_PRECISION).prop_map(
            |(mantissa, scale)| Dec::new(mantissa.into(), scale).unwrap(),
        )
    }

    /// Generate an arbitrary `Dec` in the closed range [0, 1]
    pub fn arb_fraction() -> impl Strategy<Value = Dec> {
        (0_i128..=1_000_000).prop_map(|mantissa| Dec::new(mantissa, 6).unwrap())
    }
}

#[cfg(test)]
mod test_dec {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    struct SerializerTest {
        dec: Dec,
    }

    #[test]
    fn dump_toml() {
        let serializer = SerializerTest {
            dec: Dec::new(3, 0).unwrap(),
        };
        let dumped = toml::to_string(&serializer).unwrap();
        assert_eq!(dumped.trim(), r#"dec = "3""#);
    }

    #[test]
    fn test_dec_basics() {
        assert_eq!(
            Dec::one() + Dec::new(3, 0).unwrap() / Dec::new(5, 0).unwrap(),
            Dec::new(16, 1).unwrap()
        );
        assert_eq!(Dec::new(1, 0).expect("Test failed"), Dec::one());
        assert_eq!(Dec::new(2, 0).expect("Test failed"), Dec::two());
        assert_eq!(
            Dec(1653),
            Dec::new(1653, POS_DECIMAL_PRECISION).expect("Test failed")
        );
        assert_eq!(
            Dec(-48756),
            Dec::new(-48756, POS_DECIMAL_PRECISION).expect("Test failed")
        );
        assert_eq!(Dec::new(123456789, 4).expect("Test failed").to_i128(), 12345);
        assert_eq!(
            Dec::new(-123456789, 4).expect("Test failed").to_i128(),
            -12345
        );
        assert_eq!(Dec::new(123, 4).expect("Test failed").to_i128(), 0);
        assert_eq!(
            Dec::from_str("4876.3855")
                .expect("Test failed")
                .to_amount()
                .unwrap(),
            token::Amount::from(4876)
        );
        assert!(Dec::from_str("-1.5").unwrap().to_amount().is_none());

        // Sanity checks that the precision is correct.
        assert_eq!(
            Dec::new(1, POS_DECIMAL_PRECISION).expect("Test failed")
                / Dec::new(1, POS_DECIMAL_PRECISION).expect("Test failed"),
            Dec::one(),
        );
        assert_eq!(
            Dec::new(1, POS_DECIMAL_PRECISION).expect("Test failed")
                / Dec::two(),
            Dec::zero(),
        );
        // Test Dec * Dec multiplication
        assert!(Dec::new(32353, POS_DECIMAL_PRECISION + 1u8).is_none());
        let dec1 = Dec::new(12345654321, 12).expect("Test failed");
        let dec2 = Dec::new(9876789, 12).expect("Test failed");
        let exp_prod = Dec::new(121935, 12).expect("Test failed");
        let exp_quot = Dec::new(1249966393025101, 12).expect("Test failed");
        assert_eq!(dec1 * dec2, exp_prod);
        assert_eq!(dec1 / dec2, exp_quot);
    }

    #[test]
    fn test_signs_and_division_by_zero() {
        let neg = Dec::from_str("-2.5").unwrap();
        let pos = Dec::from_str("0.5").unwrap();
        assert_eq!(neg * pos, Dec::from_str("-1.25").unwrap());
        assert_eq!(neg / pos, Dec::from_str("-5").unwrap());
        assert_eq!(neg / neg, Dec::one());
        assert!(pos.checked_div(Dec::zero()).is_none());
        assert_eq!(neg.checked_abs(), Some(Dec::from_str("2.5").unwrap()));
    }

    /// Products of large mantissas must not overflow before scaling down.
    #[test]
    fn test_large_products() {
        let large = Dec::from(u64::MAX);
        let rate = Dec::from_str("1.000000000001").unwrap();
        let prod = large.checked_mul(rate).unwrap();
        assert!(prod > large);
        let back = prod.checked_div(rate).unwrap();
        let error = back.checked_sub(large).unwrap().checked_abs().unwrap();
        assert!(error <= Dec::new(2, 12).unwrap());
        // Beyond the representable range
        assert!(large.checked_mul(large).is_none());
    }

    #[test]
    fn test_into() {
        assert_eq!(
            Dec::from(u64::MAX),
            Dec::from_str("18446744073709551615.000000000000")
                .expect("only 104 bits")
        );
        assert_eq!(
            Dec::from(token::Amount::from(1018)),
            Dec::new(1018, 0).unwrap()
        );
    }

    /// Test that parsing from string is correct.
    #[test]
    fn test_dec_from_string() {
        assert_eq!(
            Dec::from_str("3.14").expect("Test failed"),
            Dec::new(314, 2).expect("Test failed"),
        );

        // more than 12 decimal places and zero integer part
        assert_eq!(
            Dec::from_str("0.1234567654321").expect("Test failed"),
            Dec::new(123456765432, 12).expect("Test failed"),
        );

        // No zero before the decimal
        assert_eq!(
            Dec::from_str(".333333").expect("Test failed"),
            Dec::new(333333, 6).expect("Test failed"),
        );

        // No decimal places
        assert_eq!(
            Dec::from_str("50").expect("Test failed"),
            Dec::new(50, 0).expect("Test failed"),
        );

        // Test zero representations
        assert_eq!(Dec::from_str("0").expect("Test failed"), Dec::zero());
        assert_eq!(Dec::from_str("0.0").expect("Test failed"), Dec::zero());
        assert_eq!(Dec::from_str(".0").expect("Test failed"), Dec::zero());

        // Error conditions

        // Test that a decimal point must be followed by numbers
        assert!(Dec::from_str("0.").is_err());
        // Test that there must be some digits
        assert!(Dec::from_str("").is_err());
        assert!(Dec::from_str("-").is_err());
        assert!(Dec::from_str(".").is_err());
        assert!(Dec::from_str("-.").is_err());
        assert_eq!(
            Dec::from_str("-.5").expect("Test failed"),
            Dec::new(-5, 1).expect("Test failed"),
        );
        // Test that multiple decimal points get caught
        assert!(Dec::from_str("1.2.3").is_err());
        // Test that non-numerics are caught
        assert!(Dec::from_str("DEADBEEF.12").is_err());
        assert!(Dec::from_str("23.DEADBEEF").is_err());
        assert!(Dec::from_str("+1.5").is_err());
        // Test that we catch strings overflowing 128 bits
        let mut yuge = String::from("1");
        for _ in 0..40 {
            yuge.push('0');
        }
        assert!(Dec::from_str(&yuge).is_err());
    }

    #[test]
    fn test_dec_from_serde() {
        assert_eq!(
            serde_json::from_str::<Dec>(r#""0.667""#).expect("all good"),
            Dec::from_str("0.667").expect("should work")
        );

        let dec = Dec::from_str("0.667").unwrap();
        assert_eq!(
            dec,
            serde_json::from_str::<Dec>(&serde_json::to_string(&dec).unwrap())
                .unwrap()
        );
    }

    #[test]
    fn test_dec_display() {
        let num = Dec::from_str("14000.0000").unwrap();
        assert_eq!(num.to_string(), String::from("14000"));
        assert_eq!(Dec::from_str("-0.05").unwrap().to_string(), "-0.05");
        assert_eq!(Dec::zero().to_string(), "0");
    }
}
