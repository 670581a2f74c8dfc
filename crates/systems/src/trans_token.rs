//! Coin ledger abstract interfaces

use stakebond_core::address::Address;
pub use stakebond_core::token::*;
use thiserror::Error;

/// A coin movement refused by the coin ledger. The ledger is left untouched.
#[allow(missing_docs)]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferRejection {
    #[error("Invalid coin denomination {0:?}")]
    InvalidDenomination(String),
    #[error(
        "Insufficient balance of {owner}: has {balance}{denom}, requires \
         {required}{denom}"
    )]
    InsufficientBalance {
        owner: Address,
        denom: String,
        balance: Amount,
        required: Amount,
    },
    #[error("The balance of {owner} in {denom} would overflow")]
    BalanceOverflow { owner: Address, denom: String },
    #[error("The minted supply of {0} would overflow")]
    SupplyOverflow(String),
}

#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Transfer rejected: {0}")]
    Rejected(#[from] TransferRejection),
    #[error("Storage error in the coin ledger: {0}")]
    Storage(#[from] stakebond_storage::Error),
}

/// Outcome of a successful dispatch to the coin ledger
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Human-readable log of what the ledger did
    pub log: String,
}

/// Sub-dispatch into the coin ledger. A dispatch either fully applies or, on
/// any `Err`, leaves the ledger untouched.
pub trait SubDispatch<S> {
    /// Move `coin` from `src` to `dest`.
    fn transfer(
        &mut self,
        storage: &mut S,
        src: &Address,
        dest: &Address,
        coin: &Coin,
    ) -> Result<DispatchOutcome, DispatchError>;

    /// Mint `coin` into `dest`. Used by the protocol to pay rewards.
    fn credit(
        &mut self,
        storage: &mut S,
        dest: &Address,
        coin: &Coin,
    ) -> Result<DispatchOutcome, DispatchError>;
}
