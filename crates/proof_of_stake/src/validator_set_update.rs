//! Validator set updates

use std::collections::BTreeMap;

use itertools::{EitherOrBoth, Itertools};
use stakebond_core::address::Address;
use stakebond_core::proof_of_stake::ValidatorSetUpdate;
use stakebond_storage::{StorageRead, StorageWrite};

use crate::error::{OverflowExt, Result};
use crate::storage::{read_validator_set, write_validator_set};
use crate::types::DelegateeBonds;

/// The changes between two validator sets, ordered by address. A delegatee
/// that is new or whose voting power changed is reported with its new voting
/// power and a removed delegatee is reported with a voting power of zero.
pub fn validator_set_diff(
    previous: &BTreeMap<Address, u64>,
    current: &BTreeMap<Address, u64>,
) -> Vec<ValidatorSetUpdate> {
    previous
        .iter()
        .merge_join_by(current.iter(), |(prev, _), (cur, _)| prev.cmp(cur))
        .filter_map(|entry| match entry {
            EitherOrBoth::Left((address, _)) => Some(ValidatorSetUpdate {
                address: address.clone(),
                voting_power: 0,
            }),
            EitherOrBoth::Right((address, &voting_power)) => {
                Some(ValidatorSetUpdate {
                    address: address.clone(),
                    voting_power,
                })
            }
            EitherOrBoth::Both((_, prev_power), (address, &voting_power)) => {
                (*prev_power != voting_power).then(|| ValidatorSetUpdate {
                    address: address.clone(),
                    voting_power,
                })
            }
        })
        .collect()
}

/// Compare the voting powers of the given delegatee bonds with the last
/// reported validator set, persist the new set and return the changes.
pub fn update_validator_set<S>(
    storage: &mut S,
    bonds: &DelegateeBonds,
) -> Result<Vec<ValidatorSetUpdate>>
where
    S: StorageRead + StorageWrite,
{
    let previous = read_validator_set(storage)?;
    let current = bonds.voting_powers().ok_or_overflow("voting powers")?;
    let diff = validator_set_diff(&previous, &current);
    if !diff.is_empty() {
        tracing::debug!(
            changes = diff.len(),
            validators = current.len(),
            "Validator set changed"
        );
        write_validator_set(storage, &current)?;
    }
    Ok(diff)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use stakebond_core::address::testing::{
        established_address_1, established_address_2, established_address_3,
    };
    use stakebond_core::dec::Dec;
    use stakebond_core::token::Amount;
    use stakebond_storage::testing::TestStorage;
    use test_log::test;

    use super::*;
    use crate::types::DelegateeBond;

    #[test]
    fn test_validator_set_diff() {
        let (a, b, c) = (
            established_address_1(),
            established_address_2(),
            established_address_3(),
        );
        let previous = BTreeMap::from([(a.clone(), 10), (b.clone(), 20)]);
        let current = BTreeMap::from([(b.clone(), 25), (c.clone(), 5)]);

        let mut expected = vec![
            ValidatorSetUpdate {
                address: a.clone(),
                voting_power: 0,
            },
            ValidatorSetUpdate {
                address: b.clone(),
                voting_power: 25,
            },
            ValidatorSetUpdate {
                address: c.clone(),
                voting_power: 5,
            },
        ];
        expected.sort_by(|x, y| x.address.cmp(&y.address));
        assert_eq!(validator_set_diff(&previous, &current), expected);

        assert!(validator_set_diff(&current, &current).is_empty());
        let empty = BTreeMap::new();
        assert!(validator_set_diff(&empty, &empty).is_empty());
    }

    #[test]
    fn test_update_validator_set_persists() -> Result<()> {
        let mut storage = TestStorage::default();
        let delegatee = established_address_1();
        let mut bonds: DelegateeBonds = [DelegateeBond::new(
            delegatee.clone(),
            established_address_2(),
            Amount::from(100),
            Dec::zero(),
        )]
        .into_iter()
        .collect();

        // Only the deposit, no voting power
        assert!(update_validator_set(&mut storage, &bonds)?.is_empty());
        assert!(storage.is_empty());

        if let Some((_, bond)) = bonds.get_mut(&delegatee) {
            bond.total_bond_tokens = Dec::from(7_u64);
        }
        let diff = update_validator_set(&mut storage, &bonds)?;
        assert_eq!(
            diff,
            vec![ValidatorSetUpdate {
                address: delegatee.clone(),
                voting_power: 7,
            }]
        );
        assert!(update_validator_set(&mut storage, &bonds)?.is_empty());

        let diff =
            update_validator_set(&mut storage, &DelegateeBonds::default())?;
        assert_eq!(
            diff,
            vec![ValidatorSetUpdate {
                address: delegatee,
                voting_power: 0,
            }]
        );
        assert!(storage.is_empty());
        Ok(())
    }
}
