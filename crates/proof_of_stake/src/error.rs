/// Custom error types
use stakebond_core::address::Address;
use stakebond_core::arith;
use stakebond_core::dec::Dec;
use stakebond_systems::trans_token::{DispatchError, TransferRejection};
use thiserror::Error;

/// A rejection of a single transaction. A rejected transaction's handler
/// leaves the storage untouched.
#[allow(missing_docs)]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxError {
    #[error("Invalid coin denomination {found:?}, expected {expected:?}")]
    InvalidDenomination { expected: String, found: String },
    #[error("The amount must be positive")]
    NonPositiveAmount,
    #[error("The delegatee {0} has not been nominated")]
    UnknownDelegatee(Address),
    #[error("The transaction must be signed by exactly one account")]
    MissingSignature,
    #[error(
        "Insufficient bond tokens: {delegator} holds {held} tokens of \
         {delegatee}, requested {requested}"
    )]
    InsufficientBondTokens {
        delegator: Address,
        delegatee: Address,
        held: Dec,
        requested: Dec,
    },
    #[error("No bond account for {0}")]
    UnknownAccount(Address),
    #[error("Invalid commission rate {0}, it must be in [0, 1]")]
    InvalidCommissionRate(Dec),
    #[error(
        "Commission change of {delegatee} is too large: {requested} with \
         {in_window} already changed in the window, maximum is {max}"
    )]
    CommissionChangeTooLarge {
        delegatee: Address,
        requested: Dec,
        in_window: Dec,
        max: Dec,
    },
    #[error("The delegatee {0} has already been nominated")]
    DelegateeAlreadyNominated(Address),
    #[error("{signer} is not the owner of the delegatee {delegatee}")]
    NotDelegateeOwner { signer: Address, delegatee: Address },
    #[error("Only an established address can be nominated, got {0}")]
    InvalidNominee(Address),
    #[error("Coin transfer failed: {0}")]
    Dispatch(TransferRejection),
}

/// An error of the bonding module. Anything but [`Error::Tx`] is fatal: it
/// means that the ledger and its queues have diverged or that the storage
/// failed, and the block must be aborted.
#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum Error {
    #[error("Transaction rejected: {0}")]
    Tx(#[from] TxError),
    #[error("Internal consistency failure: {0}")]
    InternalConsistency(String),
    #[error("Serialization failure: {0}")]
    SerializationFailure(String),
    #[error("Storage error: {0}")]
    Storage(#[from] stakebond_storage::Error),
    #[error("Arithmetic error: {0}")]
    Arith(#[from] arith::Error),
    #[error("Arithmetic overflow in {0}")]
    Overflow(&'static str),
}

/// Result of a bonding module function that may fail
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Does the error require aborting the block?
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Tx(_))
    }
}

/// Conversion of a failed checked `Dec` or amount computation into an
/// [`Error`]
pub(crate) trait OverflowExt<T> {
    fn ok_or_overflow(self, what: &'static str) -> Result<T>;
}

impl<T> OverflowExt<T> for Option<T> {
    fn ok_or_overflow(self, what: &'static str) -> Result<T> {
        self.ok_or(Error::Overflow(what))
    }
}

/// A coin dispatch made by the per-block processing failed. Unlike a
/// handler's dispatch, nothing can be rejected at this point, so the failure
/// is fatal.
pub(crate) fn dispatch_failure(err: DispatchError, what: &str) -> Error {
    match err {
        DispatchError::Rejected(rejection) => {
            tracing::error!(%rejection, what, "Coin dispatch failed");
            Error::InternalConsistency(format!("{what} failed: {rejection}"))
        }
        DispatchError::Storage(err) => Error::Storage(err),
    }
}

impl From<DispatchError> for Error {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Rejected(rejection) => {
                Error::Tx(TxError::Dispatch(rejection))
            }
            DispatchError::Storage(err) => Error::Storage(err),
        }
    }
}

impl From<Error> for stakebond_storage::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Storage(err) => err,
            err => Self::new(err),
        }
    }
}
