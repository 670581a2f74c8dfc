//! PoS functions for reading and writing to storage and the lazy collection
//! handles of the queues.

use std::collections::BTreeMap;

use stakebond_core::address::Address;
use stakebond_core::storage::BlockHeight;
use stakebond_storage::collections::LazyCollection;
use stakebond_storage::{self as storage, StorageRead, StorageWrite};

use crate::storage_key;
use crate::types::{
    CommissionQueue, DelegateeBond, DelegateeBonds, DelegatorBonds,
    UnbondQueue,
};

/// Get the storage handle to the queue of unbonds waiting for payout
pub fn unbond_queue_handle() -> UnbondQueue {
    UnbondQueue::open(storage_key::unbond_queue_key())
}

/// Get the storage handle to the commission change history
pub fn commission_queue_handle() -> CommissionQueue {
    CommissionQueue::open(storage_key::commission_queue_key())
}

/// Read the active delegatee bonds. An empty collection is returned if none
/// have been nominated yet.
pub fn read_delegatee_bonds<S>(storage: &S) -> storage::Result<DelegateeBonds>
where
    S: StorageRead,
{
    let key = storage_key::delegatee_bonds_key();
    Ok(storage.read(&key)?.unwrap_or_default())
}

/// Write the active delegatee bonds. An empty collection deletes the
/// record.
pub fn write_delegatee_bonds<S>(
    storage: &mut S,
    bonds: &DelegateeBonds,
) -> storage::Result<()>
where
    S: StorageWrite,
{
    let key = storage_key::delegatee_bonds_key();
    if bonds.is_empty() {
        storage.delete(&key)
    } else {
        storage.write(&key, bonds)
    }
}

/// Read the bonds of a delegator, `None` if the delegator holds no bonds.
pub fn read_delegator_bonds<S>(
    storage: &S,
    delegator: &Address,
) -> storage::Result<Option<DelegatorBonds>>
where
    S: StorageRead,
{
    storage.read(&storage_key::delegator_bonds_key(delegator))
}

/// Write the bonds of a delegator. An empty collection deletes the
/// delegator's record.
pub fn write_delegator_bonds<S>(
    storage: &mut S,
    delegator: &Address,
    bonds: &DelegatorBonds,
) -> storage::Result<()>
where
    S: StorageWrite,
{
    if bonds.is_empty() {
        return remove_delegator_bonds(storage, delegator);
    }
    storage.write(&storage_key::delegator_bonds_key(delegator), bonds)
}

/// Delete the bonds record of a delegator.
pub fn remove_delegator_bonds<S>(
    storage: &mut S,
    delegator: &Address,
) -> storage::Result<()>
where
    S: StorageWrite,
{
    storage.delete(&storage_key::delegator_bonds_key(delegator))
}

/// Read a retired delegatee that still has unbonds waiting for payout.
pub fn read_retired_delegatee<S>(
    storage: &S,
    delegatee: &Address,
) -> storage::Result<Option<DelegateeBond>>
where
    S: StorageRead,
{
    storage.read(&storage_key::retired_delegatee_key(delegatee))
}

/// Write a retired delegatee.
pub fn write_retired_delegatee<S>(
    storage: &mut S,
    bond: &DelegateeBond,
) -> storage::Result<()>
where
    S: StorageWrite,
{
    storage.write(&storage_key::retired_delegatee_key(&bond.delegatee), bond)
}

/// Delete a retired delegatee.
pub fn remove_retired_delegatee<S>(
    storage: &mut S,
    delegatee: &Address,
) -> storage::Result<()>
where
    S: StorageWrite,
{
    storage.delete(&storage_key::retired_delegatee_key(delegatee))
}

/// Read the voting powers last reported to consensus.
pub fn read_validator_set<S>(
    storage: &S,
) -> storage::Result<BTreeMap<Address, u64>>
where
    S: StorageRead,
{
    Ok(storage
        .read(&storage_key::validator_set_key())?
        .unwrap_or_default())
}

/// Write the voting powers reported to consensus. An empty set deletes the
/// record.
pub fn write_validator_set<S>(
    storage: &mut S,
    validator_set: &BTreeMap<Address, u64>,
) -> storage::Result<()>
where
    S: StorageWrite,
{
    let key = storage_key::validator_set_key();
    if validator_set.is_empty() {
        storage.delete(&key)
    } else {
        storage.write(&key, validator_set)
    }
}

/// Read the height at which rewards were last distributed, if ever.
pub fn read_last_rewarded_height<S>(
    storage: &S,
) -> storage::Result<Option<BlockHeight>>
where
    S: StorageRead,
{
    storage.read(&storage_key::last_rewarded_height_key())
}

/// Write the height at which rewards were last distributed.
pub fn write_last_rewarded_height<S>(
    storage: &mut S,
    height: BlockHeight,
) -> storage::Result<()>
where
    S: StorageWrite,
{
    storage.write(&storage_key::last_rewarded_height_key(), height)
}
