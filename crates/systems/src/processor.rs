//! Transaction processor abstract interface

use stakebond_core::address::Address;
use stakebond_core::proof_of_stake::ValidatorSetUpdate;
use stakebond_core::storage::BlockHeight;

use crate::trans_token::SubDispatch;

/// An address whose signature has already been verified by the middleware in
/// front of the processor. Processors never verify signatures themselves.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AuthenticatedSender(Address);

impl AuthenticatedSender {
    /// Wrap an address that the caller has authenticated.
    pub fn new(address: Address) -> Self {
        Self(address)
    }

    /// The authenticated address
    pub fn address(&self) -> &Address {
        &self.0
    }
}

/// The context a transaction is delivered in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxContext {
    /// Height of the block the transaction is included in
    pub height: BlockHeight,
    /// The authenticated signers of the transaction
    pub signers: Vec<AuthenticatedSender>,
}

impl TxContext {
    /// Create a new context
    pub fn new(height: BlockHeight, signers: Vec<AuthenticatedSender>) -> Self {
        Self { height, signers }
    }

    /// The signer of a transaction that must be signed by exactly one
    /// account, or `None` if there are zero or several signers.
    pub fn sole_signer(&self) -> Option<&Address> {
        match self.signers.as_slice() {
            [signer] => Some(signer.address()),
            _ => None,
        }
    }
}

/// The result of a delivered transaction reported back to consensus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverResult<E> {
    /// Data returned by the handler, or the reason the transaction was
    /// rejected. A transaction that fails the stateless check is rejected
    /// before any per-block processing. The handler of any other rejected
    /// transaction leaves no changes in storage, but the per-block
    /// processing that ran before it is kept.
    pub result: Result<Vec<u8>, E>,
    /// Human-readable log
    pub log: String,
    /// Changes of the validator set after the transaction, ordered by
    /// address
    pub validator_set_updates: Vec<ValidatorSetUpdate>,
}

impl<E> DeliverResult<E> {
    /// Was the transaction accepted?
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// A module that processes transactions. The host calls
/// [`TransactionProcessor::check_stateless`] before inclusion and
/// [`TransactionProcessor::deliver`] for every included transaction, in
/// block order.
///
/// `deliver` returns `Err` only for failures that leave the storage in an
/// unknown state. The host must then drop the transaction's write log and
/// abort the block.
pub trait TransactionProcessor<S> {
    /// The transactions handled by this processor
    type Tx;
    /// Rejection of a single transaction
    type TxError;
    /// A fatal failure
    type Error;

    /// Validate a transaction without reading storage.
    fn check_stateless(&self, tx: &Self::Tx) -> Result<(), Self::TxError>;

    /// Apply a transaction on top of the storage.
    fn deliver(
        &self,
        ctx: &TxContext,
        storage: &mut S,
        tx: &Self::Tx,
        dispatch: &mut dyn SubDispatch<S>,
    ) -> Result<DeliverResult<Self::TxError>, Self::Error>;
}

#[cfg(test)]
mod tests {
    use stakebond_core::address::testing::{
        established_address_1, established_address_2,
    };

    use super::*;

    #[test]
    fn test_sole_signer() {
        let alice = AuthenticatedSender::new(established_address_1());
        let bob = AuthenticatedSender::new(established_address_2());

        let ctx = TxContext::new(BlockHeight(1), vec![]);
        assert_eq!(ctx.sole_signer(), None);

        let ctx = TxContext::new(BlockHeight(1), vec![alice.clone()]);
        assert_eq!(ctx.sole_signer(), Some(&established_address_1()));

        let ctx = TxContext::new(BlockHeight(1), vec![alice, bob]);
        assert_eq!(ctx.sole_signer(), None);
    }
}
