//! The bonding module's transaction processor

use stakebond_core::borsh::BorshDeserialize;
use stakebond_core::storage::BlockHeight;
use stakebond_storage::{StorageRead, StorageWrite};
use stakebond_systems::processor::{
    DeliverResult, TransactionProcessor, TxContext,
};
use stakebond_systems::trans_token::SubDispatch;

use crate::error::{Error, Result, TxError};
use crate::handlers::{
    bond_tokens, check_bond_tokens, check_coin, check_commission_rate,
    check_nominee, modify_commission, nominate, unbond_tokens, TxOutcome,
};
use crate::parameters::PosParams;
use crate::queues::{process_commission_queue, process_unbond_queue};
use crate::rewards::distribute_rewards;
use crate::storage::read_delegatee_bonds;
use crate::types::StakeTx;
use crate::validator_set_update::update_validator_set;

/// Decode a borsh encoded transaction of the bonding module.
pub fn decode_tx(bytes: &[u8]) -> Result<StakeTx> {
    StakeTx::try_from_slice(bytes)
        .map_err(|err| Error::SerializationFailure(err.to_string()))
}

/// Processes the bonding module's transactions. Before every transaction it
/// pays out the expired unbonds, prunes the commission history and
/// distributes the block rewards, and after it reports the validator set
/// changes.
#[derive(Debug, Clone, Copy)]
pub struct StakeProcessor<'p> {
    params: &'p PosParams,
}

impl<'p> StakeProcessor<'p> {
    /// Create a processor with the given parameters
    pub fn new(params: &'p PosParams) -> Self {
        Self { params }
    }

    /// The parameters of the processor
    pub fn params(&self) -> &PosParams {
        self.params
    }

    /// Validate a transaction without reading storage.
    pub fn check_tx(&self, tx: &StakeTx) -> std::result::Result<(), TxError> {
        match tx {
            StakeTx::Bond(tx) => check_coin(self.params, &tx.amount),
            StakeTx::Unbond(tx) => check_bond_tokens(tx.bond_tokens),
            StakeTx::Nominate(tx) => {
                check_nominee(&tx.nominee)?;
                check_commission_rate(tx.commission)?;
                check_coin(self.params, &tx.amount)
            }
            StakeTx::ModifyCommission(tx) => {
                check_commission_rate(tx.commission)
            }
        }
    }

    /// Run the per-block processing at the given height.
    pub fn begin_tx<S>(
        &self,
        storage: &mut S,
        height: BlockHeight,
        dispatch: &mut dyn SubDispatch<S>,
    ) -> Result<()>
    where
        S: StorageRead + StorageWrite,
    {
        process_unbond_queue(storage, self.params, height, dispatch)?;
        process_commission_queue(storage, self.params, height)?;
        distribute_rewards(storage, self.params, height, dispatch)
    }

    fn apply<S>(
        &self,
        ctx: &TxContext,
        storage: &mut S,
        tx: &StakeTx,
        dispatch: &mut dyn SubDispatch<S>,
    ) -> Result<TxOutcome>
    where
        S: StorageRead + StorageWrite,
    {
        match tx {
            StakeTx::Bond(tx) => {
                bond_tokens(storage, self.params, ctx, tx, dispatch)
            }
            StakeTx::Unbond(tx) => unbond_tokens(storage, ctx, tx),
            StakeTx::Nominate(tx) => {
                nominate(storage, self.params, ctx, tx, dispatch)
            }
            StakeTx::ModifyCommission(tx) => {
                modify_commission(storage, self.params, ctx, tx)
            }
        }
    }
}

impl<'p, S> TransactionProcessor<S> for StakeProcessor<'p>
where
    S: StorageRead + StorageWrite,
{
    type Error = Error;
    type Tx = StakeTx;
    type TxError = TxError;

    fn check_stateless(
        &self,
        tx: &StakeTx,
    ) -> std::result::Result<(), TxError> {
        self.check_tx(tx)
    }

    fn deliver(
        &self,
        ctx: &TxContext,
        storage: &mut S,
        tx: &StakeTx,
        dispatch: &mut dyn SubDispatch<S>,
    ) -> Result<DeliverResult<TxError>> {
        let height = ctx.height;
        // A malformed transaction is rejected before touching storage
        if let Err(err) = self.check_tx(tx) {
            tracing::warn!(
                %height,
                %tx,
                %err,
                "Rejected a malformed transaction"
            );
            return Ok(DeliverResult {
                log: err.to_string(),
                result: Err(err),
                validator_set_updates: vec![],
            });
        }
        self.begin_tx(storage, height, dispatch).map_err(|err| {
            tracing::error!(%height, %err, "Per-block processing failed");
            err
        })?;

        let (result, log) = match self.apply(ctx, storage, tx, dispatch) {
            Ok(TxOutcome { data, log }) => {
                tracing::debug!(%height, %tx, "Applied a transaction");
                (Ok(data), log)
            }
            Err(Error::Tx(err)) => {
                tracing::warn!(%height, %tx, %err, "Rejected a transaction");
                let log = err.to_string();
                (Err(err), log)
            }
            Err(err) => {
                tracing::error!(
                    %height,
                    %tx,
                    %err,
                    "Failed to apply a transaction"
                );
                return Err(err);
            }
        };

        let bonds = read_delegatee_bonds(storage)?;
        let validator_set_updates = update_validator_set(storage, &bonds)?;
        Ok(DeliverResult {
            result,
            log,
            validator_set_updates,
        })
    }
}
