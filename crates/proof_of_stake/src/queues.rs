//! Processing of the unbonding and commission history queues, run before
//! every delivered transaction.

use stakebond_core::address::Address;
use stakebond_core::arith::checked;
use stakebond_core::dec::Dec;
use stakebond_core::storage::BlockHeight;
use stakebond_core::token::Coin;
use stakebond_storage::{StorageRead, StorageWrite};
use stakebond_systems::trans_token::SubDispatch;

use crate::error::{dispatch_failure, Error, OverflowExt, Result};
use crate::parameters::PosParams;
use crate::storage::{
    commission_queue_handle, read_delegatee_bonds, read_retired_delegatee,
    remove_retired_delegatee, unbond_queue_handle, write_delegatee_bonds,
    write_retired_delegatee,
};
use crate::types::{DelegateeBond, QueueElemUnbond};

/// Pay out all the unbonds that have waited in the queue for more than the
/// unbonding period, in the order they were queued. The payout uses the
/// delegatee's exchange rate at the time of the payout.
///
/// Returns the number of paid out unbonds.
pub fn process_unbond_queue<S>(
    storage: &mut S,
    params: &PosParams,
    height: BlockHeight,
    dispatch: &mut dyn SubDispatch<S>,
) -> Result<u64>
where
    S: StorageRead + StorageWrite,
{
    let queue = unbond_queue_handle();
    let mut paid: u64 = 0;
    while let Some(unbond) = queue.front(storage)? {
        if !unbond.elem.is_expired(height, params.unbonding_period) {
            break;
        }
        queue.pop_front(storage)?;
        pay_out_unbond(storage, params, &unbond, dispatch)?;
        paid = checked!(paid + 1)?;
    }
    if paid > 0 {
        tracing::debug!(%height, paid, "Processed the unbonding queue");
    }
    Ok(paid)
}

fn pay_out_unbond<S>(
    storage: &mut S,
    params: &PosParams,
    unbond: &QueueElemUnbond,
    dispatch: &mut dyn SubDispatch<S>,
) -> Result<()>
where
    S: StorageRead + StorageWrite,
{
    let delegatee = &unbond.elem.delegatee;
    let mut bonds = read_delegatee_bonds(storage)?;
    if let Some((_, bond)) = bonds.get_mut(delegatee) {
        transfer_payout(storage, params, bond, unbond, dispatch)?;
        settle_unbond(bond, unbond)?;
        write_delegatee_bonds(storage, &bonds)?;
        return Ok(());
    }

    let mut retired = read_retired_delegatee(storage, delegatee)?
        .ok_or_else(|| {
            tracing::error!(
                %delegatee,
                account = %unbond.account,
                "A queued unbond refers to an unknown delegatee"
            );
            Error::InternalConsistency(format!(
                "the unbonding queue refers to the unknown delegatee \
                 {delegatee}"
            ))
        })?;
    transfer_payout(storage, params, &retired, unbond, dispatch)?;
    settle_unbond(&mut retired, unbond)?;
    if retired.pending_unbonds > 0 {
        write_retired_delegatee(storage, &retired)?;
        return Ok(());
    }

    // The last pending unbond of a retired delegatee has been paid out
    if !retired.deposit.is_zero() {
        let coin = Coin::new(&params.bond_denom, retired.deposit);
        dispatch
            .transfer(storage, &retired.account, &retired.owner, &coin)
            .map_err(|err| dispatch_failure(err, "deposit refund"))?;
    }
    remove_retired_delegatee(storage, delegatee)?;
    tracing::info!(
        %delegatee,
        owner = %retired.owner,
        deposit = %retired.deposit,
        "Settled a retired delegatee"
    );
    Ok(())
}

fn transfer_payout<S>(
    storage: &mut S,
    params: &PosParams,
    bond: &DelegateeBond,
    unbond: &QueueElemUnbond,
    dispatch: &mut dyn SubDispatch<S>,
) -> Result<()>
where
    S: StorageRead + StorageWrite,
{
    let payout = unbond
        .bond_tokens
        .checked_mul(bond.exchange_rate)
        .and_then(|coin| coin.to_amount())
        .ok_or_overflow("unbond payout")?;
    tracing::info!(
        delegatee = %bond.delegatee,
        account = %unbond.account,
        bond_tokens = %unbond.bond_tokens,
        rate = %bond.exchange_rate,
        %payout,
        "Paying out an unbond"
    );
    if payout.is_zero() {
        return Ok(());
    }
    let coin = Coin::new(&params.bond_denom, payout);
    dispatch
        .transfer(storage, &bond.account, &unbond.account, &coin)
        .map_err(|err| dispatch_failure(err, "unbond payout"))?;
    Ok(())
}

/// Remove a paid out unbond from the delegatee's pending unbonds.
fn settle_unbond(
    bond: &mut DelegateeBond,
    unbond: &QueueElemUnbond,
) -> Result<()> {
    let unbonding_tokens = bond
        .unbonding_tokens
        .checked_sub(unbond.bond_tokens)
        .filter(|tokens| !tokens.is_negative());
    let pending_unbonds = bond.pending_unbonds.checked_sub(1);
    match (unbonding_tokens, pending_unbonds) {
        (Some(unbonding_tokens), Some(pending_unbonds)) => {
            bond.unbonding_tokens = unbonding_tokens;
            bond.pending_unbonds = pending_unbonds;
            Ok(())
        }
        _ => {
            tracing::error!(
                delegatee = %bond.delegatee,
                unbonding_tokens = %bond.unbonding_tokens,
                pending_unbonds = bond.pending_unbonds,
                bond_tokens = %unbond.bond_tokens,
                "The pending unbonds of a delegatee are smaller than a \
                 queued unbond"
            );
            Err(Error::InternalConsistency(format!(
                "the pending unbonds of {} don't cover a queued unbond of {} \
                 tokens",
                bond.delegatee, unbond.bond_tokens
            )))
        }
    }
}

/// Prune the commission changes that are older than the commission history
/// period. Returns the number of pruned changes.
pub fn process_commission_queue<S>(
    storage: &mut S,
    params: &PosParams,
    height: BlockHeight,
) -> Result<u64>
where
    S: StorageRead + StorageWrite,
{
    let queue = commission_queue_handle();
    let mut pruned: u64 = 0;
    while let Some(change) = queue.front(storage)? {
        if !change
            .elem
            .is_expired(height, params.commission_history_period)
        {
            break;
        }
        queue.pop_front(storage)?;
        pruned = checked!(pruned + 1)?;
    }
    if pruned > 0 {
        tracing::debug!(%height, pruned, "Pruned the commission history");
    }
    Ok(pruned)
}

/// The sum of the absolute commission changes of a delegatee that are still
/// in the commission history.
pub fn commission_changes_in_window<S>(
    storage: &S,
    delegatee: &Address,
) -> Result<Dec>
where
    S: StorageRead,
{
    let queue = commission_queue_handle();
    let mut sum = Dec::zero();
    for change in queue.iter(storage)? {
        let change = change?;
        if &change.elem.delegatee != delegatee {
            continue;
        }
        let abs = change.change.checked_abs().ok_or_overflow("change")?;
        sum = sum.checked_add(abs).ok_or_overflow("changes in window")?;
    }
    Ok(sum)
}
