use stakebond_core::address::Address;
use stakebond_core::token::Amount;
use stakebond_storage as storage;
use stakebond_storage::{StorageRead, StorageWrite};
use stakebond_systems::trans_token::{DispatchError, TransferRejection};

use crate::storage_key::*;

/// Read the balance of a given denomination and owner.
pub fn read_balance<S>(
    storage: &S,
    denom: &str,
    owner: &Address,
) -> storage::Result<Amount>
where
    S: StorageRead,
{
    let key = balance_key(denom, owner);
    let balance = storage.read::<Amount>(&key)?.unwrap_or_default();
    Ok(balance)
}

/// Read the total minted supply of a given denomination.
pub fn read_total_supply<S>(storage: &S, denom: &str) -> storage::Result<Amount>
where
    S: StorageRead,
{
    let key = minted_balance_key(denom);
    let balance = storage.read::<Amount>(&key)?.unwrap_or_default();
    Ok(balance)
}

fn check_denom(denom: &str) -> Result<(), TransferRejection> {
    if is_valid_denom(denom) {
        Ok(())
    } else {
        Err(TransferRejection::InvalidDenomination(denom.to_owned()))
    }
}

/// Transfer `amount` of `denom` from `src` to `dest`. Returns an `Err` if
/// `src` has insufficient balance or if the transfer to `dest` would
/// overflow. Nothing is written unless the whole transfer succeeds.
pub fn transfer<S>(
    storage: &mut S,
    denom: &str,
    src: &Address,
    dest: &Address,
    amount: Amount,
) -> Result<(), DispatchError>
where
    S: StorageRead + StorageWrite,
{
    check_denom(denom)?;
    if amount.is_zero() {
        return Ok(());
    }
    let src_key = balance_key(denom, src);
    let src_balance = read_balance(storage, denom, src)?;
    let new_src_balance = src_balance.checked_sub(amount).ok_or_else(|| {
        TransferRejection::InsufficientBalance {
            owner: src.clone(),
            denom: denom.to_owned(),
            balance: src_balance,
            required: amount,
        }
    })?;
    if src == dest {
        return Ok(());
    }
    let dest_key = balance_key(denom, dest);
    let dest_balance = read_balance(storage, denom, dest)?;
    let new_dest_balance = dest_balance.checked_add(amount).ok_or_else(|| {
        TransferRejection::BalanceOverflow {
            owner: dest.clone(),
            denom: denom.to_owned(),
        }
    })?;
    tracing::debug!(
        %src,
        %dest,
        %amount,
        denom,
        "Transferring coin"
    );
    write_balance(storage, &src_key, new_src_balance)?;
    write_balance(storage, &dest_key, new_dest_balance)?;
    Ok(())
}

/// Credit newly minted coin to an account, to be used only by protocol. The
/// minted supply of the denomination is adjusted.
pub fn credit_tokens<S>(
    storage: &mut S,
    denom: &str,
    dest: &Address,
    amount: Amount,
) -> Result<(), DispatchError>
where
    S: StorageRead + StorageWrite,
{
    check_denom(denom)?;
    let balance_key = balance_key(denom, dest);
    let cur_balance = read_balance(storage, denom, dest)?;
    let new_balance = cur_balance.checked_add(amount).ok_or_else(|| {
        TransferRejection::BalanceOverflow {
            owner: dest.clone(),
            denom: denom.to_owned(),
        }
    })?;

    let total_supply_key = minted_balance_key(denom);
    let cur_supply = read_total_supply(storage, denom)?;
    let new_supply = cur_supply
        .checked_add(amount)
        .ok_or_else(|| TransferRejection::SupplyOverflow(denom.to_owned()))?;

    write_balance(storage, &balance_key, new_balance)?;
    storage.write(&total_supply_key, new_supply)?;
    Ok(())
}

/// Zero balances are deleted so that an emptied account leaves nothing in
/// storage.
fn write_balance<S>(
    storage: &mut S,
    key: &stakebond_core::storage::Key,
    balance: Amount,
) -> storage::Result<()>
where
    S: StorageWrite,
{
    if balance.is_zero() {
        storage.delete(key)
    } else {
        storage.write(key, balance)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use proptest::prelude::*;
    use stakebond_core::address::testing::{
        arb_established_address, established_address_1,
        established_address_2,
    };
    use stakebond_storage::testing::TestStorage;
    use test_log::test;

    use super::*;

    #[test]
    fn test_transfer_is_all_or_nothing() {
        let mut storage = TestStorage::default();
        let alice = established_address_1();
        let bob = established_address_2();
        credit_tokens(&mut storage, "atom", &alice, Amount::from(100)).unwrap();

        let res =
            transfer(&mut storage, "atom", &alice, &bob, Amount::from(101));
        assert_matches!(
            res,
            Err(DispatchError::Rejected(
                TransferRejection::InsufficientBalance { .. }
            ))
        );
        assert_eq!(
            read_balance(&storage, "atom", &alice).unwrap(),
            Amount::from(100)
        );
        assert!(read_balance(&storage, "atom", &bob).unwrap().is_zero());

        transfer(&mut storage, "atom", &alice, &bob, Amount::from(100))
            .unwrap();
        assert!(read_balance(&storage, "atom", &alice).unwrap().is_zero());
        assert!(!storage.has_key(&balance_key("atom", &alice)).unwrap());
        assert_eq!(
            read_balance(&storage, "atom", &bob).unwrap(),
            Amount::from(100)
        );
        assert_eq!(
            read_total_supply(&storage, "atom").unwrap(),
            Amount::from(100)
        );
    }

    #[test]
    fn test_denominations_are_separate() {
        let mut storage = TestStorage::default();
        let alice = established_address_1();
        let bob = established_address_2();
        credit_tokens(&mut storage, "atom", &alice, Amount::from(5)).unwrap();

        assert_matches!(
            transfer(&mut storage, "photon", &alice, &bob, Amount::from(1)),
            Err(DispatchError::Rejected(
                TransferRejection::InsufficientBalance { .. }
            ))
        );
        assert_matches!(
            transfer(&mut storage, "a/b", &alice, &bob, Amount::from(1)),
            Err(DispatchError::Rejected(
                TransferRejection::InvalidDenomination(_)
            ))
        );
    }

    #[test]
    fn test_credit_overflow() {
        let mut storage = TestStorage::default();
        let alice = established_address_1();
        credit_tokens(&mut storage, "atom", &alice, Amount::from(u64::MAX))
            .unwrap();
        assert_matches!(
            credit_tokens(&mut storage, "atom", &alice, Amount::from(1)),
            Err(DispatchError::Rejected(
                TransferRejection::BalanceOverflow { .. }
            ))
        );
    }

    proptest! {
        /// Transfers never change the minted supply
        #[test]
        fn test_transfers_preserve_supply(
            src in arb_established_address(),
            dest in arb_established_address(),
            credited in 1..=1_000_000_u64,
            amounts in proptest::collection::vec(0..=2_000_000_u64, 1..10),
        ) {
            let mut storage = TestStorage::default();
            credit_tokens(&mut storage, "atom", &src, credited.into()).unwrap();
            for amount in amounts {
                let _ = transfer(&mut storage, "atom", &src, &dest, amount.into());
                let src_balance = read_balance(&storage, "atom", &src).unwrap();
                let dest_balance = read_balance(&storage, "atom", &dest).unwrap();
                let total = if src == dest {
                    src_balance
                } else {
                    src_balance.checked_add(dest_balance).unwrap()
                };
                prop_assert_eq!(total, Amount::from(credited));
            }
            prop_assert_eq!(
                read_total_supply(&storage, "atom").unwrap(),
                Amount::from(credited)
            );
        }
    }
}
