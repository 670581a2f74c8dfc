//! Types used for PoS system logic

use std::collections::BTreeMap;
use std::fmt::Display;

use borsh::{BorshDeserialize, BorshSchema, BorshSerialize};
use serde::{Deserialize, Serialize};
use stakebond_core::address::Address;
use stakebond_core::dec::Dec;
use stakebond_core::storage::BlockHeight;
use stakebond_core::token::{Amount, Coin};
use stakebond_storage::collections::LazyQueue;

/// The queue of unbonds waiting for their payout
pub type UnbondQueue = LazyQueue<QueueElemUnbond>;

/// The queue of commission changes within the history window
pub type CommissionQueue = LazyQueue<QueueElemModComm>;

/// The bond record of a nominated delegatee.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    BorshDeserialize,
    BorshSerialize,
    BorshSchema,
    Serialize,
    Deserialize,
)]
pub struct DelegateeBond {
    /// The delegatee identity
    pub delegatee: Address,
    /// The escrow account that holds the deposit and the bonded coin
    pub account: Address,
    /// The account that nominated the delegatee. It receives the commission
    /// and the deposit refund.
    pub owner: Address,
    /// The nomination deposit held in the escrow. It's not part of the
    /// bonded stake.
    pub deposit: Amount,
    /// The fraction of rewards kept by the owner
    pub commission: Dec,
    /// Coin per bond token
    pub exchange_rate: Dec,
    /// Bond tokens held by delegators
    pub total_bond_tokens: Dec,
    /// Bond tokens of unbonds queued and not yet paid out
    pub unbonding_tokens: Dec,
    /// Number of unbonds queued and not yet paid out
    pub pending_unbonds: u64,
}

impl DelegateeBond {
    /// A freshly nominated delegatee with no bonds
    pub fn new(
        delegatee: Address,
        owner: Address,
        deposit: Amount,
        commission: Dec,
    ) -> Self {
        Self {
            account: Address::escrow_of(&delegatee),
            delegatee,
            owner,
            deposit,
            commission,
            exchange_rate: Dec::one(),
            total_bond_tokens: Dec::zero(),
            unbonding_tokens: Dec::zero(),
            pending_unbonds: 0,
        }
    }

    /// The coin bonded by the delegators, `total_bond_tokens *
    /// exchange_rate`. `None` on overflow.
    pub fn bonded_coin(&self) -> Option<Dec> {
        self.total_bond_tokens.checked_mul(self.exchange_rate)
    }

    /// All the bond tokens that have a claim on the escrow, including the
    /// ones waiting in the unbonding queue. `None` on overflow.
    pub fn claim_tokens(&self) -> Option<Dec> {
        self.total_bond_tokens.checked_add(self.unbonding_tokens)
    }

    /// The voting power reported to consensus, the bonded coin truncated to
    /// an integer. `None` on overflow.
    pub fn voting_power(&self) -> Option<u64> {
        self.bonded_coin()?.to_amount().map(u64::from)
    }
}

/// The active delegatees, in the order of their nomination.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    BorshDeserialize,
    BorshSerialize,
    BorshSchema,
    Serialize,
    Deserialize,
)]
pub struct DelegateeBonds(Vec<DelegateeBond>);

impl DelegateeBonds {
    /// Find the bond of the given delegatee with its index in the collection
    pub fn get(&self, delegatee: &Address) -> Option<(usize, &DelegateeBond)> {
        self.0
            .iter()
            .enumerate()
            .find(|(_, bond)| &bond.delegatee == delegatee)
    }

    /// Find the bond of the given delegatee with its index in the
    /// collection, for modification
    pub fn get_mut(
        &mut self,
        delegatee: &Address,
    ) -> Option<(usize, &mut DelegateeBond)> {
        self.0
            .iter_mut()
            .enumerate()
            .find(|(_, bond)| &bond.delegatee == delegatee)
    }

    /// Remove the bond at the given index, preserving the order of the
    /// remaining ones. Returns `None` if the index is out of bounds.
    pub fn remove(&mut self, index: usize) -> Option<DelegateeBond> {
        (index < self.0.len()).then(|| self.0.remove(index))
    }

    /// Append a newly nominated delegatee
    pub fn push(&mut self, bond: DelegateeBond) {
        self.0.push(bond)
    }

    /// Iterate the bonds in the collection order
    pub fn iter(&self) -> impl Iterator<Item = &DelegateeBond> {
        self.0.iter()
    }

    /// Iterate the bonds in the collection order, for modification
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut DelegateeBond> {
        self.0.iter_mut()
    }

    /// The number of active delegatees
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Are there no active delegatees?
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The escrow accounts of the delegatees, in the collection order
    pub fn validator_accounts(&self) -> Vec<Address> {
        self.0.iter().map(|bond| bond.account.clone()).collect()
    }

    /// The voting powers of the delegatees with a positive voting power.
    /// `None` on overflow.
    pub fn voting_powers(&self) -> Option<BTreeMap<Address, u64>> {
        let mut powers = BTreeMap::new();
        for bond in &self.0 {
            let power = bond.voting_power()?;
            if power > 0 {
                powers.insert(bond.delegatee.clone(), power);
            }
        }
        Some(powers)
    }
}

impl FromIterator<DelegateeBond> for DelegateeBonds {
    fn from_iter<I: IntoIterator<Item = DelegateeBond>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The bond tokens a delegator holds of a delegatee.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    BorshDeserialize,
    BorshSerialize,
    BorshSchema,
    Serialize,
    Deserialize,
)]
pub struct DelegatorBond {
    /// The delegatee identity
    pub delegatee: Address,
    /// Bond tokens held, never negative
    pub bond_tokens: Dec,
}

/// All the bonds of a delegator, in the order they were created.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    BorshDeserialize,
    BorshSerialize,
    BorshSchema,
    Serialize,
    Deserialize,
)]
pub struct DelegatorBonds(Vec<DelegatorBond>);

impl DelegatorBonds {
    /// Find the bond with the given delegatee with its index
    pub fn get(&self, delegatee: &Address) -> Option<(usize, &DelegatorBond)> {
        self.0
            .iter()
            .enumerate()
            .find(|(_, bond)| &bond.delegatee == delegatee)
    }

    /// Find the bond with the given delegatee with its index, for
    /// modification
    pub fn get_mut(
        &mut self,
        delegatee: &Address,
    ) -> Option<(usize, &mut DelegatorBond)> {
        self.0
            .iter_mut()
            .enumerate()
            .find(|(_, bond)| &bond.delegatee == delegatee)
    }

    /// Remove the bond at the given index. Returns `None` if the index is
    /// out of bounds.
    pub fn remove(&mut self, index: usize) -> Option<DelegatorBond> {
        (index < self.0.len()).then(|| self.0.remove(index))
    }

    /// Append a new bond
    pub fn push(&mut self, bond: DelegatorBond) {
        self.0.push(bond)
    }

    /// Iterate the bonds
    pub fn iter(&self) -> impl Iterator<Item = &DelegatorBond> {
        self.0.iter()
    }

    /// Does the delegator hold no bonds?
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<DelegatorBond> for DelegatorBonds {
    fn from_iter<I: IntoIterator<Item = DelegatorBond>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The common part of the queue elements
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    BorshDeserialize,
    BorshSerialize,
    BorshSchema,
    Serialize,
    Deserialize,
)]
pub struct QueueElem {
    /// The delegatee the element refers to
    pub delegatee: Address,
    /// The height of the block in which the element was queued
    pub height_at_init: BlockHeight,
}

impl QueueElem {
    /// Has the element spent more than `period` blocks in the queue at the
    /// given height?
    pub fn is_expired(&self, height: BlockHeight, period: u64) -> bool {
        height.blocks_since(self.height_at_init) > period
    }
}

/// An unbond waiting for its payout
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    BorshDeserialize,
    BorshSerialize,
    BorshSchema,
    Serialize,
    Deserialize,
)]
pub struct QueueElemUnbond {
    #[allow(missing_docs)]
    pub elem: QueueElem,
    /// The unbonding account that receives the payout
    pub account: Address,
    /// The unbonded bond tokens
    pub bond_tokens: Dec,
}

/// A commission change kept in the history window
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    BorshDeserialize,
    BorshSerialize,
    BorshSchema,
    Serialize,
    Deserialize,
)]
pub struct QueueElemModComm {
    #[allow(missing_docs)]
    pub elem: QueueElem,
    /// The signed change of the commission rate
    pub change: Dec,
}

/// Bond coin to a delegatee
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    BorshDeserialize,
    BorshSerialize,
    BorshSchema,
    Serialize,
    Deserialize,
)]
pub struct Bond {
    /// The delegatee to bond to
    pub delegatee: Address,
    /// The coin to bond
    pub amount: Coin,
}

/// Unbond bond tokens from a delegatee
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    BorshDeserialize,
    BorshSerialize,
    BorshSchema,
    Serialize,
    Deserialize,
)]
pub struct Unbond {
    /// The delegatee to unbond from
    pub delegatee: Address,
    /// The amount to unbond, in bond tokens
    pub bond_tokens: Dec,
}

/// Nominate a new delegatee
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    BorshDeserialize,
    BorshSerialize,
    BorshSchema,
    Serialize,
    Deserialize,
)]
pub struct Nominate {
    /// The identity of the new delegatee
    pub nominee: Address,
    /// The initial commission rate
    pub commission: Dec,
    /// The deposit moved into the escrow
    pub amount: Coin,
}

/// Change the commission rate of a delegatee
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    BorshDeserialize,
    BorshSerialize,
    BorshSchema,
    Serialize,
    Deserialize,
)]
pub struct ModifyCommission {
    /// The delegatee
    pub delegatee: Address,
    /// The new commission rate
    pub commission: Dec,
}

/// A transaction of the bonding module
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    BorshDeserialize,
    BorshSerialize,
    BorshSchema,
    Serialize,
    Deserialize,
)]
#[allow(missing_docs)]
pub enum StakeTx {
    Bond(Bond),
    Unbond(Unbond),
    Nominate(Nominate),
    ModifyCommission(ModifyCommission),
}

impl Display for StakeTx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StakeTx::Bond(Bond { delegatee, amount }) => {
                write!(f, "bond {amount} to {delegatee}")
            }
            StakeTx::Unbond(Unbond {
                delegatee,
                bond_tokens,
            }) => write!(f, "unbond {bond_tokens} tokens from {delegatee}"),
            StakeTx::Nominate(Nominate {
                nominee,
                commission,
                amount,
            }) => write!(
                f,
                "nominate {nominee} with commission {commission} and \
                 deposit {amount}"
            ),
            StakeTx::ModifyCommission(ModifyCommission {
                delegatee,
                commission,
            }) => write!(f, "set commission of {delegatee} to {commission}"),
        }
    }
}
