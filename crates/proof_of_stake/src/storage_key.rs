//! Proof-of-Stake storage keys

use stakebond_core::address::{Address, POS};
use stakebond_core::storage::{DbKeySeg, Key, KeySeg};

const DELEGATEE_BONDS_STORAGE_KEY: &str = "delegatee_bonds";
const DELEGATOR_BONDS_STORAGE_KEY: &str = "delegator_bonds";
const RETIRED_DELEGATEE_STORAGE_KEY: &str = "retired_delegatee";
const QUEUE_STORAGE_PREFIX: &str = "queue";
const UNBOND_QUEUE_STORAGE_KEY: &str = "unbond";
const COMMISSION_QUEUE_STORAGE_KEY: &str = "commission";
const VALIDATOR_SET_STORAGE_KEY: &str = "validator_set";
const LAST_REWARDED_HEIGHT_STORAGE_KEY: &str = "last_rewarded_height";

/// Is the given key a PoS storage key?
pub fn is_pos_key(key: &Key) -> bool {
    key.fst_address() == Some(&POS)
}

fn pos_key(segment: &str) -> Key {
    Key::from(POS.to_db_key()).with_segment(segment.to_owned())
}

/// Storage key for the collection of all active delegatee bonds.
pub fn delegatee_bonds_key() -> Key {
    pos_key(DELEGATEE_BONDS_STORAGE_KEY)
}

/// Storage key prefix for the bonds of all delegators.
pub fn delegator_bonds_prefix() -> Key {
    pos_key(DELEGATOR_BONDS_STORAGE_KEY)
}

/// Storage key for the bonds of the given delegator.
pub fn delegator_bonds_key(delegator: &Address) -> Key {
    delegator_bonds_prefix().with_segment(delegator.clone())
}

/// Is storage key for the bonds of a delegator? Returns the delegator.
pub fn is_delegator_bonds_key(key: &Key) -> Option<&Address> {
    match &key.segments[..] {
        [
            DbKeySeg::AddressSeg(addr),
            DbKeySeg::StringSeg(prefix),
            DbKeySeg::AddressSeg(delegator),
        ] if addr == &POS && prefix == DELEGATOR_BONDS_STORAGE_KEY => {
            Some(delegator)
        }
        _ => None,
    }
}

/// Storage key prefix for the retired delegatees.
pub fn retired_delegatees_prefix() -> Key {
    pos_key(RETIRED_DELEGATEE_STORAGE_KEY)
}

/// Storage key for a retired delegatee with unbonds still waiting for
/// payout.
pub fn retired_delegatee_key(delegatee: &Address) -> Key {
    retired_delegatees_prefix().with_segment(delegatee.clone())
}

/// Storage key for the queue of unbonds waiting for payout.
pub fn unbond_queue_key() -> Key {
    pos_key(QUEUE_STORAGE_PREFIX)
        .with_segment(UNBOND_QUEUE_STORAGE_KEY.to_owned())
}

/// Storage key for the queue of commission changes still in the history
/// window.
pub fn commission_queue_key() -> Key {
    pos_key(QUEUE_STORAGE_PREFIX)
        .with_segment(COMMISSION_QUEUE_STORAGE_KEY.to_owned())
}

/// Storage key for the voting powers last reported to consensus.
pub fn validator_set_key() -> Key {
    pos_key(VALIDATOR_SET_STORAGE_KEY)
}

/// Storage key for the height at which rewards were last distributed.
pub fn last_rewarded_height_key() -> Key {
    pos_key(LAST_REWARDED_HEIGHT_STORAGE_KEY)
}
