//! Storage keys and block heights.

use std::fmt::Display;
use std::num::ParseIntError;
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSchema, BorshSerialize};
use data_encoding::BASE32HEX_NOPAD;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::{self, Address};

#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum Error {
    #[error("Error parsing address: {0}")]
    ParseAddress(address::DecodeError),
    #[error("Error parsing address from a storage key")]
    ParseAddressFromKey,
    #[error("Reserved prefix or string is specified: {0}")]
    InvalidKeySeg(String),
    #[error("Error parsing key segment: {0}")]
    ParseKeySeg(String),
}

/// Result for functions that may fail
pub type Result<T> = std::result::Result<T, Error>;

/// The separator of storage key segments
pub const KEY_SEGMENT_SEPARATOR: char = '/';
/// The reserved storage key prefix for addresses
pub const RESERVED_ADDRESS_PREFIX: char = '#';

/// Height of a block, i.e. the level. The first block height is 1.
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
pub struct BlockHeight(pub u64);

impl Display for BlockHeight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<BlockHeight> for u64 {
    fn from(height: BlockHeight) -> Self {
        height.0
    }
}

impl From<u64> for BlockHeight {
    fn from(height: u64) -> Self {
        BlockHeight(height)
    }
}

impl FromStr for BlockHeight {
    type Err = ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.parse::<u64>()?))
    }
}

impl BlockHeight {
    /// The number of blocks elapsed since `earlier`, saturating at zero if
    /// `earlier` is in the future.
    pub fn blocks_since(self, earlier: BlockHeight) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

/// A storage key is made of storage key segments [`DbKeySeg`], separated by
/// [`KEY_SEGMENT_SEPARATOR`].
#[derive(
    Clone,
    BorshSerialize,
    BorshDeserialize,
    BorshSchema,
    Debug,
    Default,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
)]
pub struct Key {
    /// The segments of the key in the original (left-to-right) order.
    pub segments: Vec<DbKeySeg>,
}

impl From<DbKeySeg> for Key {
    fn from(seg: DbKeySeg) -> Self {
        Self {
            segments: vec![seg],
        }
    }
}

impl FromStr for Key {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Key::parse(s)
    }
}

impl Key {
    /// Parses string and returns a key
    pub fn parse(string: impl AsRef<str>) -> Result<Self> {
        let string = string.as_ref();
        if string.is_empty() {
            Err(Error::ParseKeySeg(string.to_string()))
        } else {
            let mut segments = Vec::new();
            for s in string.split(KEY_SEGMENT_SEPARATOR) {
                segments.push(DbKeySeg::parse(s.to_owned())?);
            }
            Ok(Key { segments })
        }
    }

    /// Takes ownership of the key, appends a new segment to it,
    /// and returns the modified key.
    #[must_use]
    pub fn with_segment<T: KeySeg>(mut self, other: T) -> Self {
        self.segments.push(other.to_db_key());
        self
    }

    /// Returns the address from the first key segment if it's an address.
    pub fn fst_address(&self) -> Option<&Address> {
        self.segments.first().and_then(|s| match s {
            DbKeySeg::AddressSeg(addr) => Some(addr),
            DbKeySeg::StringSeg(_) => None,
        })
    }

    /// Check if the key starts with all the segments of the given prefix
    pub fn is_prefixed_by(&self, prefix: &Self) -> bool {
        self.segments.starts_with(&prefix.segments)
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let key = self
            .segments
            .iter()
            .map(DbKeySeg::raw)
            .collect::<Vec<String>>()
            .join(&KEY_SEGMENT_SEPARATOR.to_string());
        f.write_str(&key)
    }
}

/// Represents a segment in a path that may be used as a database key
pub trait KeySeg {
    /// Reverse of `into_string`. Convert key segment to `Self`.
    fn parse(string: String) -> Result<Self>
    where
        Self: Sized;

    /// Convert `Self` to a string.
    fn raw(&self) -> String;

    /// Convert `Self` to a key segment. This mapping should preserve the
    /// ordering of `Self`
    fn to_db_key(&self) -> DbKeySeg;
}

/// A storage key segment
#[derive(
    Clone,
    BorshSerialize,
    BorshDeserialize,
    BorshSchema,
    Debug,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
)]
pub enum DbKeySeg {
    /// A segment made of an address
    AddressSeg(Address),
    /// Any other key segment
    StringSeg(String),
}

impl KeySeg for DbKeySeg {
    fn parse(mut string: String) -> Result<Self> {
        // a separator should not be included
        if string.contains(KEY_SEGMENT_SEPARATOR) {
            return Err(Error::InvalidKeySeg(string));
        }
        match string.chars().next() {
            // addresses are prefixed with `'#'`
            Some(c) if c == RESERVED_ADDRESS_PREFIX => {
                let _ = string.remove(0);
                Address::decode(&string)
                    .map_err(Error::ParseAddress)
                    .map(DbKeySeg::AddressSeg)
            }
            _ => Ok(DbKeySeg::StringSeg(string)),
        }
    }

    fn raw(&self) -> String {
        match self {
            DbKeySeg::AddressSeg(addr) => {
                format!("{}{}", RESERVED_ADDRESS_PREFIX, addr.encode())
            }
            DbKeySeg::StringSeg(seg) => seg.to_owned(),
        }
    }

    fn to_db_key(&self) -> DbKeySeg {
        self.clone()
    }
}

impl KeySeg for String {
    fn parse(string: String) -> Result<Self> {
        Ok(string)
    }

    fn raw(&self) -> String {
        self.to_owned()
    }

    fn to_db_key(&self) -> DbKeySeg {
        DbKeySeg::StringSeg(self.clone())
    }
}

impl KeySeg for BlockHeight {
    fn parse(string: String) -> Result<Self> {
        u64::parse(string).map(BlockHeight)
    }

    fn raw(&self) -> String {
        self.0.raw()
    }

    fn to_db_key(&self) -> DbKeySeg {
        DbKeySeg::StringSeg(self.raw())
    }
}

impl KeySeg for Address {
    fn parse(mut seg: String) -> Result<Self> {
        match seg.chars().next() {
            Some(c) if c == RESERVED_ADDRESS_PREFIX => {
                let _ = seg.remove(0);
                Address::decode(seg).map_err(Error::ParseAddress)
            }
            _ => Err(Error::ParseAddressFromKey),
        }
    }

    fn raw(&self) -> String {
        format!("{}{}", RESERVED_ADDRESS_PREFIX, self.encode())
    }

    fn to_db_key(&self) -> DbKeySeg {
        DbKeySeg::AddressSeg(self.clone())
    }
}

/// Implement [`KeySeg`] for an unsigned integer via base32hex of its BE
/// bytes, which maintains the sort order of the original data.
macro_rules! impl_int_key_seg {
    ($unsigned:ty, $len:literal) => {
        impl KeySeg for $unsigned {
            fn parse(string: String) -> Result<Self> {
                let bytes =
                    BASE32HEX_NOPAD.decode(string.as_ref()).map_err(|err| {
                        Error::ParseKeySeg(format!(
                            "Failed parsing {} with {}",
                            string, err
                        ))
                    })?;
                let fixed_bytes: [u8; $len] =
                    bytes.as_slice().try_into().map_err(|_| {
                        Error::ParseKeySeg(format!(
                            "Unexpected length of {}, expected {} bytes",
                            string, $len
                        ))
                    })?;
                Ok(<$unsigned>::from_be_bytes(fixed_bytes))
            }

            fn raw(&self) -> String {
                BASE32HEX_NOPAD.encode(&self.to_be_bytes())
            }

            fn to_db_key(&self) -> DbKeySeg {
                DbKeySeg::StringSeg(self.raw())
            }
        }
    };
}

impl_int_key_seg!(u32, 4);
impl_int_key_seg!(u64, 8);

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::address::testing::established_address_1;
    use crate::address::POS;

    proptest! {
        /// The string ordering of int key segments matches the numeric one
        #[test]
        fn test_u64_key_seg_order(a: u64, b: u64) {
            let (raw_a, raw_b) = (a.raw(), b.raw());
            prop_assert_eq!(a.cmp(&b), raw_a.cmp(&raw_b));
            prop_assert_eq!(u64::parse(raw_a).unwrap(), a);
        }
    }

    #[test]
    fn test_key_parse_and_display() {
        let owner = established_address_1();
        let key = Key::from(POS.to_db_key())
            .with_segment("delegator_bonds".to_owned())
            .with_segment(owner.clone());
        let parsed = Key::parse(key.to_string()).unwrap();
        assert_eq!(parsed, key);
        assert_eq!(parsed.fst_address(), Some(&POS));
        assert_eq!(
            parsed.segments.last(),
            Some(&DbKeySeg::AddressSeg(owner))
        );
        assert!(key.to_string().starts_with("#pos/delegator_bonds/#est1"));
    }

    #[test]
    fn test_is_prefixed_by() {
        let pos = Key::from(POS.to_db_key());
        let prefix = pos.clone().with_segment("queue".to_owned());
        let key = prefix.clone().with_segment(7_u64);
        assert!(key.is_prefixed_by(&prefix));
        assert!(prefix.is_prefixed_by(&prefix));
        assert!(!prefix.is_prefixed_by(&key));
        // Segment-wise, not a string prefix
        let other = pos.with_segment("queued".to_owned());
        assert!(!other.is_prefixed_by(&prefix));
    }

    #[test]
    fn test_invalid_key_seg() {
        assert!(matches!(
            DbKeySeg::parse("a/b".to_owned()),
            Err(Error::InvalidKeySeg(_))
        ));
        assert!(matches!(
            Address::parse("pos".to_owned()),
            Err(Error::ParseAddressFromKey)
        ));
        assert!(u64::parse("AA".to_owned()).is_err());
    }
}
