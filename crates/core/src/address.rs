//! Implements transparent addresses as described in the bonding schema:
//! established accounts, escrow accounts derived from a delegatee and the
//! internal addresses that own a storage namespace.

use std::fmt::{Debug, Display};
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSchema, BorshSerialize};
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::borsh::BorshSerializeExt;

/// The length of an established or escrow address hash in bytes
pub const HASH_LEN: usize = 20;

/// The length of [`sha2::Sha256`] digests
pub const SHA_HASH_LEN: usize = 32;

/// Human-readable part of an established address
pub const ESTABLISHED_HRP: &str = "est";
/// Human-readable part of an escrow address
pub const ESCROW_HRP: &str = "esc";
/// The separator between the human-readable part and the hash
const HRP_SEPARATOR: char = '1';

/// Internal PoS address
pub const POS: Address = Address::Internal(InternalAddress::PoS);
/// Internal multitoken address
pub const MULTITOKEN: Address = Address::Internal(InternalAddress::Multitoken);

#[allow(missing_docs)]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Unexpected address prefix in {0}")]
    UnexpectedPrefix(String),
    #[error("Error decoding address hash from hex: {0}")]
    DecodeHex(String),
    #[error("Unexpected address hash length {0}, expected {HASH_LEN}")]
    UnexpectedHashLen(usize),
}

/// Result of a function that may fail
pub type Result<T> = std::result::Result<T, DecodeError>;

/// An account's address
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
)]
pub enum Address {
    /// An established address is generated on-chain
    Established(EstablishedAddress),
    /// An internal address represents a module with a native logic
    Internal(InternalAddress),
}

impl Address {
    /// Encode an address to a string.
    pub fn encode(&self) -> String {
        match self {
            Address::Established(established) => {
                encode_hash(ESTABLISHED_HRP, &established.hash)
            }
            Address::Internal(InternalAddress::Escrow(escrow)) => {
                encode_hash(ESCROW_HRP, &escrow.hash)
            }
            Address::Internal(InternalAddress::PoS) => "pos".to_owned(),
            Address::Internal(InternalAddress::Multitoken) => {
                "multitoken".to_owned()
            }
        }
    }

    /// Decode an address from a string.
    pub fn decode(string: impl AsRef<str>) -> Result<Self> {
        let string = string.as_ref();
        match string {
            "pos" => return Ok(POS),
            "multitoken" => return Ok(MULTITOKEN),
            _ => {}
        }
        let (hrp, hex) = string
            .split_once(HRP_SEPARATOR)
            .ok_or_else(|| DecodeError::UnexpectedPrefix(string.to_owned()))?;
        match hrp {
            ESTABLISHED_HRP => Ok(Address::Established(EstablishedAddress {
                hash: decode_hash(hex)?,
            })),
            ESCROW_HRP => Ok(Address::Internal(InternalAddress::Escrow(
                EstablishedAddress {
                    hash: decode_hash(hex)?,
                },
            ))),
            _ => Err(DecodeError::UnexpectedPrefix(string.to_owned())),
        }
    }

    /// Derive the escrow account that holds the coin bonded to the given
    /// delegatee. The same delegatee always maps to the same escrow.
    pub fn escrow_of(delegatee: &Address) -> Address {
        let encoded = delegatee.serialize_to_vec();
        let bytes = [b"escrow".as_slice(), encoded.as_slice()].concat();
        let hash: [u8; SHA_HASH_LEN] = Sha256::digest(&bytes).into();
        Address::Internal(InternalAddress::Escrow(hash.into()))
    }

    /// Check if the address is an established address
    pub fn is_established(&self) -> bool {
        matches!(self, Address::Established(_))
    }

    /// Check if the address is an escrow address
    pub fn is_escrow(&self) -> bool {
        matches!(self, Address::Internal(InternalAddress::Escrow(_)))
    }
}

fn encode_hash(hrp: &str, hash: &[u8; HASH_LEN]) -> String {
    format!("{hrp}{HRP_SEPARATOR}{}", HEXLOWER.encode(hash))
}

fn decode_hash(hex: &str) -> Result<[u8; HASH_LEN]> {
    let bytes = HEXLOWER
        .decode(hex.as_bytes())
        .map_err(|e| DecodeError::DecodeHex(e.to_string()))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| DecodeError::UnexpectedHashLen(bytes.len()))
}

impl Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Address {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self> {
        Address::decode(s)
    }
}

impl serde::Serialize for Address {
    fn serialize<S>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> serde::Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;
        let encoded: String = serde::Deserialize::deserialize(deserializer)?;
        Self::decode(encoded).map_err(D::Error::custom)
    }
}

/// An established address is generated on-chain
#[derive(
    Debug,
    Clone,
    BorshSerialize,
    BorshDeserialize,
    BorshSchema,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
pub struct EstablishedAddress {
    hash: [u8; HASH_LEN],
}

impl From<[u8; HASH_LEN]> for EstablishedAddress {
    fn from(hash: [u8; HASH_LEN]) -> Self {
        Self { hash }
    }
}

impl From<[u8; SHA_HASH_LEN]> for EstablishedAddress {
    fn from(input_hash: [u8; SHA_HASH_LEN]) -> Self {
        let mut hash = [0; HASH_LEN];
        hash.copy_from_slice(&input_hash[..HASH_LEN]);
        Self { hash }
    }
}

/// A generator of established addresses
#[derive(
    Debug,
    Default,
    Clone,
    PartialEq,
    Eq,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct EstablishedAddressGen {
    last_hash: [u8; SHA_HASH_LEN],
}

impl EstablishedAddressGen {
    /// Initialize a new address generator with a given seed.
    pub fn new(seed: impl AsRef<str>) -> Self {
        Self {
            last_hash: Sha256::digest(seed.as_ref().as_bytes()).into(),
        }
    }

    /// Generate a new established address. The `rng_source` must be a value
    /// every replica agrees on, such as the hash of the transaction that
    /// initializes the address.
    pub fn generate_address(
        &mut self,
        rng_source: impl AsRef<[u8]>,
    ) -> Address {
        let gen_bytes = self.serialize_to_vec();
        let bytes = [gen_bytes.as_slice(), rng_source.as_ref()].concat();
        let full_hash: [u8; SHA_HASH_LEN] = Sha256::digest(&bytes).into();
        self.last_hash = full_hash;
        Address::Established(full_hash.into())
    }
}

/// Generate a new established address that is the same for the same `seed`.
pub fn gen_deterministic_established_address(seed: impl AsRef<str>) -> Address {
    let mut key_gen = EstablishedAddressGen::new(seed);
    key_gen.generate_address("")
}

/// An internal address represents a module with a native logic
#[derive(
    Debug,
    Clone,
    BorshSerialize,
    BorshDeserialize,
    BorshSchema,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
)]
pub enum InternalAddress {
    /// Proof-of-stake bonding module
    PoS,
    /// Coin ledger holding all balances
    Multitoken,
    /// Escrow of a single delegatee
    Escrow(EstablishedAddress),
}

/// Helpers for testing with addresses.
#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use proptest::prelude::*;

    use super::*;

    /// Derive an established address from a simple seed (`u64`).
    pub fn address_from_simple_seed(seed: u64) -> Address {
        gen_deterministic_established_address(seed.to_string())
    }

    /// A sampled established address for tests
    pub fn established_address_1() -> Address {
        gen_deterministic_established_address("such randomness")
    }

    /// A sampled established address for tests
    pub fn established_address_2() -> Address {
        gen_deterministic_established_address("much wow")
    }

    /// A sampled established address for tests
    pub fn established_address_3() -> Address {
        gen_deterministic_established_address("very delegate")
    }

    /// Generate an arbitrary established [`Address`].
    pub fn arb_established_address() -> impl Strategy<Value = Address> {
        any::<u64>().prop_map(address_from_simple_seed)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        /// Check that all the address types are encoded and decoded back
        #[test]
        fn test_encoding_roundtrip(address in testing::arb_established_address()) {
            let encoded = address.encode();
            assert_eq!(Address::decode(&encoded).unwrap(), address);
            let escrow = Address::escrow_of(&address);
            assert_eq!(Address::decode(escrow.encode()).unwrap(), escrow);
        }
    }

    #[test]
    fn test_escrow_derivation_is_stable() {
        let delegatee = testing::established_address_1();
        let escrow = Address::escrow_of(&delegatee);
        assert!(escrow.is_escrow());
        assert_eq!(escrow, Address::escrow_of(&delegatee));
        assert_ne!(
            escrow,
            Address::escrow_of(&testing::established_address_2())
        );
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            Address::decode("nope"),
            Err(DecodeError::UnexpectedPrefix(_))
        ));
        assert!(matches!(
            Address::decode("abc1deadbeef"),
            Err(DecodeError::UnexpectedPrefix(_))
        ));
        assert!(matches!(
            Address::decode("est1deadbeef"),
            Err(DecodeError::UnexpectedHashLen(4))
        ));
        assert!(matches!(
            Address::decode("est1zz"),
            Err(DecodeError::DecodeHex(_))
        ));
        assert_eq!(Address::decode("pos").unwrap(), POS);
    }
}
