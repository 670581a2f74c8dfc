//! Coin ledger storage keys

use stakebond_core::address::{Address, MULTITOKEN};
use stakebond_core::storage::{self, DbKeySeg, KeySeg};

/// Key segment for a balance key
pub const BALANCE_STORAGE_KEY: &str = "balance";
/// Key segment for minted balance
pub const MINTED_STORAGE_KEY: &str = "minted";

/// Check that a denomination can be used as a storage key segment. Valid
/// denominations are non-empty and ASCII alphanumeric.
pub fn is_valid_denom(denom: &str) -> bool {
    !denom.is_empty() && denom.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Obtain a storage key prefix for all the keys of a denomination.
fn denom_prefix(denom: &str) -> storage::Key {
    storage::Key::from(MULTITOKEN.to_db_key()).with_segment(denom.to_owned())
}

/// Obtain a storage key for user's balance.
pub fn balance_key(denom: &str, owner: &Address) -> storage::Key {
    balance_prefix(denom).with_segment(owner.clone())
}

/// Obtain a storage key prefix for all users' balances.
pub fn balance_prefix(denom: &str) -> storage::Key {
    denom_prefix(denom).with_segment(BALANCE_STORAGE_KEY.to_owned())
}

/// Obtain a storage key for the minted supply of a denomination.
pub fn minted_balance_key(denom: &str) -> storage::Key {
    denom_prefix(denom).with_segment(MINTED_STORAGE_KEY.to_owned())
}

/// Check if a key is part of the coin ledger's storage
pub fn is_multitoken_key(key: &storage::Key) -> bool {
    key.fst_address() == Some(&MULTITOKEN)
}

/// Check if the given storage key is a balance key for the given
/// denomination. If it is, return the owner.
pub fn is_balance_key<'a>(
    denom: &str,
    key: &'a storage::Key,
) -> Option<&'a Address> {
    match &key.segments[..] {
        [
            DbKeySeg::AddressSeg(addr),
            DbKeySeg::StringSeg(key_denom),
            DbKeySeg::StringSeg(balance),
            DbKeySeg::AddressSeg(owner),
        ] if *addr == MULTITOKEN
            && key_denom == denom
            && balance == BALANCE_STORAGE_KEY =>
        {
            Some(owner)
        }
        _ => None,
    }
}
