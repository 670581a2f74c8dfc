//! Proof-of-Stake types shared with the consensus boundary

use borsh::{BorshDeserialize, BorshSchema, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::address::Address;

/// A change in a delegatee's voting power reported to consensus. A voting
/// power of zero removes the delegatee from the validator set.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    BorshSerialize,
    BorshDeserialize,
    BorshSchema,
    Serialize,
    Deserialize,
)]
pub struct ValidatorSetUpdate {
    /// The delegatee identity
    pub address: Address,
    /// The new voting power
    pub voting_power: u64,
}

impl ValidatorSetUpdate {
    /// Is this update a removal from the validator set?
    pub fn is_removal(&self) -> bool {
        self.voting_power == 0
    }
}
