//! The transaction handlers. Every handler checks all its preconditions
//! before it writes anything and it only writes after its coin dispatch
//! succeeded, so that a rejected transaction leaves no changes behind.

use stakebond_core::address::Address;
use stakebond_core::arith::checked;
use stakebond_core::borsh::BorshSerializeExt;
use stakebond_core::dec::Dec;
use stakebond_core::storage::BlockHeight;
use stakebond_core::token::Coin;
use stakebond_storage::{StorageRead, StorageWrite};
use stakebond_systems::processor::TxContext;
use stakebond_systems::trans_token::SubDispatch;

use crate::error::{Error, OverflowExt, Result, TxError};
use crate::parameters::PosParams;
use crate::queues::commission_changes_in_window;
use crate::storage::{
    commission_queue_handle, read_delegatee_bonds, read_delegator_bonds,
    read_retired_delegatee, unbond_queue_handle, write_delegatee_bonds,
    write_delegator_bonds, write_retired_delegatee,
};
use crate::types::{
    Bond, DelegateeBond, DelegatorBond, ModifyCommission, Nominate,
    QueueElem, QueueElemModComm, QueueElemUnbond, Unbond,
};

/// The outcome of an applied transaction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxOutcome {
    /// Borsh encoded data returned to the sender
    pub data: Vec<u8>,
    /// Human-readable log
    pub log: String,
}

/// Check that a coin can be bonded or deposited.
pub fn check_coin(
    params: &PosParams,
    coin: &Coin,
) -> std::result::Result<(), TxError> {
    if coin.denom != params.bond_denom {
        return Err(TxError::InvalidDenomination {
            expected: params.bond_denom.clone(),
            found: coin.denom.clone(),
        });
    }
    if coin.is_zero() {
        return Err(TxError::NonPositiveAmount);
    }
    Ok(())
}

/// Check that a commission rate is within [0, 1].
pub fn check_commission_rate(rate: Dec) -> std::result::Result<(), TxError> {
    if rate.is_negative() || rate > Dec::one() {
        Err(TxError::InvalidCommissionRate(rate))
    } else {
        Ok(())
    }
}

/// Check that an amount of bond tokens is positive.
pub fn check_bond_tokens(bond_tokens: Dec) -> std::result::Result<(), TxError> {
    if bond_tokens.is_positive() {
        Ok(())
    } else {
        Err(TxError::NonPositiveAmount)
    }
}

/// Check that a nominee can have an escrow.
pub fn check_nominee(nominee: &Address) -> std::result::Result<(), TxError> {
    if nominee.is_established() {
        Ok(())
    } else {
        Err(TxError::InvalidNominee(nominee.clone()))
    }
}

fn sole_signer(
    ctx: &TxContext,
) -> std::result::Result<&Address, TxError> {
    ctx.sole_signer().ok_or(TxError::MissingSignature)
}

/// Bond coin of the signer to a nominated delegatee. The coin is moved into
/// the delegatee's escrow and the signer receives bond tokens at the
/// delegatee's current exchange rate.
pub fn bond_tokens<S>(
    storage: &mut S,
    params: &PosParams,
    ctx: &TxContext,
    tx: &Bond,
    dispatch: &mut dyn SubDispatch<S>,
) -> Result<TxOutcome>
where
    S: StorageRead + StorageWrite,
{
    check_coin(params, &tx.amount)?;
    let source = sole_signer(ctx)?;
    let mut delegatee_bonds = read_delegatee_bonds(storage)?;
    let (_, delegatee_bond) = delegatee_bonds
        .get_mut(&tx.delegatee)
        .ok_or_else(|| TxError::UnknownDelegatee(tx.delegatee.clone()))?;

    let bond_tokens = Dec::from(tx.amount.amount)
        .trunc_div(&delegatee_bond.exchange_rate)
        .ok_or_overflow("bond tokens")?;
    if bond_tokens.is_zero() {
        // The amount is too small to mint any bond token
        return Err(TxError::NonPositiveAmount.into());
    }
    let total_bond_tokens = delegatee_bond
        .total_bond_tokens
        .checked_add(bond_tokens)
        .ok_or_overflow("total bond tokens")?;
    let mut delegator_bonds =
        read_delegator_bonds(storage, source)?.unwrap_or_default();
    match delegator_bonds.get_mut(&tx.delegatee) {
        Some((_, bond)) => {
            bond.bond_tokens = bond
                .bond_tokens
                .checked_add(bond_tokens)
                .ok_or_overflow("delegator bond tokens")?;
        }
        None => delegator_bonds.push(DelegatorBond {
            delegatee: tx.delegatee.clone(),
            bond_tokens,
        }),
    }

    let dispatched = dispatch.transfer(
        storage,
        source,
        &delegatee_bond.account,
        &tx.amount,
    )?;
    delegatee_bond.total_bond_tokens = total_bond_tokens;
    tracing::debug!(
        %source,
        delegatee = %tx.delegatee,
        amount = %tx.amount,
        %bond_tokens,
        rate = %delegatee_bond.exchange_rate,
        "Bonded"
    );
    write_delegatee_bonds(storage, &delegatee_bonds)?;
    write_delegator_bonds(storage, source, &delegator_bonds)?;
    Ok(TxOutcome {
        data: bond_tokens.serialize_to_vec(),
        log: dispatched.log,
    })
}

/// Unbond bond tokens of the signer from a delegatee. The tokens are taken
/// out of the delegator's and the delegatee's totals right away, and the
/// unbond is queued for a payout after the unbonding period.
pub fn unbond_tokens<S>(
    storage: &mut S,
    ctx: &TxContext,
    tx: &Unbond,
) -> Result<TxOutcome>
where
    S: StorageRead + StorageWrite,
{
    check_bond_tokens(tx.bond_tokens)?;
    let source = sole_signer(ctx)?;
    let mut delegator_bonds = read_delegator_bonds(storage, source)?
        .ok_or_else(|| TxError::UnknownAccount(source.clone()))?;
    let (index, delegator_bond) = delegator_bonds
        .get_mut(&tx.delegatee)
        .ok_or_else(|| TxError::UnknownDelegatee(tx.delegatee.clone()))?;
    if delegator_bond.bond_tokens < tx.bond_tokens {
        return Err(TxError::InsufficientBondTokens {
            delegator: source.clone(),
            delegatee: tx.delegatee.clone(),
            held: delegator_bond.bond_tokens,
            requested: tx.bond_tokens,
        }
        .into());
    }
    let remaining = delegator_bond
        .bond_tokens
        .checked_sub(tx.bond_tokens)
        .ok_or_overflow("delegator bond tokens")?;
    delegator_bond.bond_tokens = remaining;
    if remaining.is_zero() {
        delegator_bonds.remove(index);
    }

    let mut delegatee_bonds = read_delegatee_bonds(storage)?;
    let (delegatee_index, delegatee_bond) = delegatee_bonds
        .get_mut(&tx.delegatee)
        .ok_or_else(|| {
            tracing::error!(
                %source,
                delegatee = %tx.delegatee,
                "A delegator holds bond tokens of an inactive delegatee"
            );
            Error::InternalConsistency(format!(
                "{source} holds bond tokens of the inactive delegatee {}",
                tx.delegatee
            ))
        })?;
    let total_bond_tokens = delegatee_bond
        .total_bond_tokens
        .checked_sub(tx.bond_tokens)
        .filter(|tokens| !tokens.is_negative())
        .ok_or_else(|| {
            Error::InternalConsistency(format!(
                "the bond tokens of {source} exceed the total of {}",
                tx.delegatee
            ))
        })?;
    delegatee_bond.total_bond_tokens = total_bond_tokens;
    delegatee_bond.unbonding_tokens = delegatee_bond
        .unbonding_tokens
        .checked_add(tx.bond_tokens)
        .ok_or_overflow("unbonding tokens")?;
    let pending_unbonds = delegatee_bond.pending_unbonds;
    delegatee_bond.pending_unbonds = checked!(pending_unbonds + 1)?;

    let height = ctx.height;
    tracing::debug!(
        %source,
        delegatee = %tx.delegatee,
        bond_tokens = %tx.bond_tokens,
        %height,
        "Unbonded, queueing the payout"
    );
    write_delegator_bonds(storage, source, &delegator_bonds)?;
    if total_bond_tokens.is_zero() {
        let retired = delegatee_bonds
            .remove(delegatee_index)
            .ok_or_overflow("delegatee index")?;
        tracing::info!(
            delegatee = %retired.delegatee,
            pending_unbonds = retired.pending_unbonds,
            "Retired a delegatee with no bond tokens left"
        );
        write_retired_delegatee(storage, &retired)?;
    }
    write_delegatee_bonds(storage, &delegatee_bonds)?;
    unbond_queue_handle().push_back(
        storage,
        QueueElemUnbond {
            elem: QueueElem {
                delegatee: tx.delegatee.clone(),
                height_at_init: height,
            },
            account: source.clone(),
            bond_tokens: tx.bond_tokens,
        },
    )?;
    Ok(TxOutcome {
        data: vec![],
        log: format!(
            "unbonded {} tokens from {}, queued at height {height}",
            tx.bond_tokens, tx.delegatee
        ),
    })
}

/// Nominate a new delegatee. The signer's deposit is moved into the
/// delegatee's escrow and the signer becomes the delegatee's owner.
pub fn nominate<S>(
    storage: &mut S,
    params: &PosParams,
    ctx: &TxContext,
    tx: &Nominate,
    dispatch: &mut dyn SubDispatch<S>,
) -> Result<TxOutcome>
where
    S: StorageRead + StorageWrite,
{
    check_nominee(&tx.nominee)?;
    check_commission_rate(tx.commission)?;
    check_coin(params, &tx.amount)?;
    let owner = sole_signer(ctx)?;
    let mut delegatee_bonds = read_delegatee_bonds(storage)?;
    if delegatee_bonds.get(&tx.nominee).is_some()
        || read_retired_delegatee(storage, &tx.nominee)?.is_some()
    {
        return Err(
            TxError::DelegateeAlreadyNominated(tx.nominee.clone()).into()
        );
    }
    let bond = DelegateeBond::new(
        tx.nominee.clone(),
        owner.clone(),
        tx.amount.amount,
        tx.commission,
    );
    let dispatched =
        dispatch.transfer(storage, owner, &bond.account, &tx.amount)?;
    tracing::info!(
        nominee = %tx.nominee,
        %owner,
        escrow = %bond.account,
        deposit = %tx.amount,
        commission = %tx.commission,
        "Nominated a delegatee"
    );
    let data = bond.account.serialize_to_vec();
    delegatee_bonds.push(bond);
    write_delegatee_bonds(storage, &delegatee_bonds)?;
    Ok(TxOutcome {
        data,
        log: dispatched.log,
    })
}

/// Change the commission rate of a delegatee. The sum of the absolute
/// changes within the commission history window, including this one, may
/// not exceed the maximum commission change.
pub fn modify_commission<S>(
    storage: &mut S,
    params: &PosParams,
    ctx: &TxContext,
    tx: &ModifyCommission,
) -> Result<TxOutcome>
where
    S: StorageRead + StorageWrite,
{
    check_commission_rate(tx.commission)?;
    let signer = sole_signer(ctx)?;
    let mut delegatee_bonds = read_delegatee_bonds(storage)?;
    let (_, delegatee_bond) = delegatee_bonds
        .get_mut(&tx.delegatee)
        .ok_or_else(|| TxError::UnknownDelegatee(tx.delegatee.clone()))?;
    if &delegatee_bond.owner != signer {
        return Err(TxError::NotDelegateeOwner {
            signer: signer.clone(),
            delegatee: tx.delegatee.clone(),
        }
        .into());
    }
    let change = tx
        .commission
        .checked_sub(delegatee_bond.commission)
        .ok_or_overflow("commission change")?;
    if change.is_zero() {
        return Ok(TxOutcome {
            data: vec![],
            log: format!("commission of {} unchanged", tx.delegatee),
        });
    }
    let in_window = commission_changes_in_window(storage, &tx.delegatee)?;
    let requested = change.checked_abs().ok_or_overflow("commission change")?;
    let cumulative = in_window
        .checked_add(requested)
        .ok_or_overflow("cumulative commission change")?;
    if cumulative > params.max_commission_change {
        return Err(TxError::CommissionChangeTooLarge {
            delegatee: tx.delegatee.clone(),
            requested,
            in_window,
            max: params.max_commission_change,
        }
        .into());
    }

    let height: BlockHeight = ctx.height;
    tracing::debug!(
        delegatee = %tx.delegatee,
        from = %delegatee_bond.commission,
        to = %tx.commission,
        %height,
        "Changed the commission rate"
    );
    delegatee_bond.commission = tx.commission;
    write_delegatee_bonds(storage, &delegatee_bonds)?;
    commission_queue_handle().push_back(
        storage,
        QueueElemModComm {
            elem: QueueElem {
                delegatee: tx.delegatee.clone(),
                height_at_init: height,
            },
            change,
        },
    )?;
    Ok(TxOutcome {
        data: vec![],
        log: format!("commission of {} set to {}", tx.delegatee, tx.commission),
    })
}
