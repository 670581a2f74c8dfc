//! PoS rewards distribution.

use stakebond_core::dec::Dec;
use stakebond_core::storage::BlockHeight;
use stakebond_core::token::{Amount, Coin};
use stakebond_storage::{StorageRead, StorageWrite};
use stakebond_systems::trans_token::SubDispatch;

use crate::error::{dispatch_failure, OverflowExt, Result};
use crate::parameters::PosParams;
use crate::storage::{
    read_delegatee_bonds, read_last_rewarded_height, write_delegatee_bonds,
    write_last_rewarded_height,
};
use crate::types::DelegateeBond;

/// The reward of a single delegatee for one block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockReward {
    /// The whole minted reward
    pub total: Amount,
    /// The part of the reward paid to the delegatee's owner
    pub commission: Amount,
    /// The part of the reward added to the escrow, raising the exchange rate
    pub delegators: Amount,
}

/// Compute the block reward of a delegatee. The reward is proportional to
/// the coin backing all the delegatee's bond tokens, including the ones
/// waiting for their unbonding payout. Returns `None` on overflow.
pub fn block_reward(
    bond: &DelegateeBond,
    params: &PosParams,
) -> Option<BlockReward> {
    let backed = bond.claim_tokens()?.checked_mul(bond.exchange_rate)?;
    let total = backed
        .checked_mul(params.inflation)?
        .checked_div(params.blocks_per_year)?
        .to_amount()?;
    let commission =
        Dec::from(total).checked_mul(bond.commission)?.to_amount()?;
    let delegators = total.checked_sub(commission)?;
    Some(BlockReward {
        total,
        commission,
        delegators,
    })
}

/// Mint the block rewards of all the active delegatees. The rewards are
/// distributed at most once per block height. The commission is credited to
/// the owner and the rest to the escrow, raising the exchange rate of the
/// delegatee's bond tokens.
pub fn distribute_rewards<S>(
    storage: &mut S,
    params: &PosParams,
    height: BlockHeight,
    dispatch: &mut dyn SubDispatch<S>,
) -> Result<()>
where
    S: StorageRead + StorageWrite,
{
    if read_last_rewarded_height(storage)? == Some(height) {
        return Ok(());
    }
    let mut bonds = read_delegatee_bonds(storage)?;
    let mut changed = false;
    for bond in bonds.iter_mut() {
        let claims = bond.claim_tokens().ok_or_overflow("bond claims")?;
        if claims.is_zero() {
            continue;
        }
        let reward =
            block_reward(bond, params).ok_or_overflow("block reward")?;
        if reward.total.is_zero() {
            continue;
        }
        tracing::debug!(
            delegatee = %bond.delegatee,
            %height,
            total = %reward.total,
            commission = %reward.commission,
            "Distributing block reward"
        );
        if !reward.commission.is_zero() {
            let coin = Coin::new(&params.bond_denom, reward.commission);
            dispatch
                .credit(storage, &bond.owner, &coin)
                .map_err(|err| dispatch_failure(err, "commission credit"))?;
        }
        if !reward.delegators.is_zero() {
            let coin = Coin::new(&params.bond_denom, reward.delegators);
            dispatch
                .credit(storage, &bond.account, &coin)
                .map_err(|err| dispatch_failure(err, "reward credit"))?;
            let rate_change = Dec::from(reward.delegators)
                .trunc_div(&claims)
                .ok_or_overflow("exchange rate change")?;
            bond.exchange_rate = bond
                .exchange_rate
                .checked_add(rate_change)
                .ok_or_overflow("exchange rate")?;
            changed = true;
        }
    }
    if changed {
        write_delegatee_bonds(storage, &bonds)?;
    }
    write_last_rewarded_height(storage, height)?;
    Ok(())
}
