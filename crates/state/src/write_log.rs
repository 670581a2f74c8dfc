//! Write log is temporary storage for modifications performed by a transaction.
//! before they are committed to the ledger's storage.

use std::collections::{BTreeMap, BTreeSet};

use stakebond_core::storage;

/// A storage modification
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageModification {
    /// Write a new value
    Write {
        /// Value bytes
        value: Vec<u8>,
    },
    /// Delete an existing key-value
    Delete,
}

/// The write log storage. Modifications of the current transaction are kept
/// apart from the ones accepted earlier in the block, so that a rejected
/// transaction can be dropped without touching anything else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteLog {
    /// All the storage modifications of accepted transactions are stored in
    /// block write-log, before being committed to the storage
    pub(crate) block_write_log: BTreeMap<storage::Key, StorageModification>,
    /// The storage modifications for the current transaction
    pub(crate) tx_write_log: BTreeMap<storage::Key, StorageModification>,
}

/// Write log prefix iterator
#[derive(Debug)]
pub struct PrefixIter {
    /// The concrete iterator for modifications sorted by storage keys
    pub iter: std::collections::btree_map::IntoIter<
        storage::Key,
        StorageModification,
    >,
}

impl Iterator for PrefixIter {
    type Item = (storage::Key, StorageModification);

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next()
    }
}

impl WriteLog {
    /// Read a value at the given key, returns [`None`] if the key is not
    /// present in the write log
    pub fn read(&self, key: &storage::Key) -> Option<&StorageModification> {
        // try to read from tx write log first
        self.tx_write_log
            .get(key)
            .or_else(|| self.block_write_log.get(key))
    }

    /// Read a value before the current tx at the given key, returns
    /// [`None`] if the key is not present in the write log
    pub fn read_pre(
        &self,
        key: &storage::Key,
    ) -> Option<&StorageModification> {
        self.block_write_log.get(key)
    }

    /// Write a key and a value
    pub fn write(&mut self, key: &storage::Key, value: Vec<u8>) {
        self.tx_write_log
            .insert(key.clone(), StorageModification::Write { value });
    }

    /// Delete a key and its value
    pub fn delete(&mut self, key: &storage::Key) {
        self.tx_write_log
            .insert(key.clone(), StorageModification::Delete);
    }

    /// Get the storage keys changed by the current transaction
    pub fn get_keys(&self) -> BTreeSet<storage::Key> {
        self.tx_write_log.keys().cloned().collect()
    }

    /// Commit the current transaction's write log to the block when it's
    /// accepted. Starts a new transaction write log.
    pub fn commit_tx(&mut self) {
        let tx_write_log = std::mem::take(&mut self.tx_write_log);
        self.block_write_log.extend(tx_write_log);
    }

    /// Drop the current transaction's write log when it's declined. Starts a
    /// new transaction write log.
    pub fn drop_tx(&mut self) {
        self.tx_write_log = Default::default();
    }

    /// Drop the current tx and the entire block log.
    pub fn drop_block(&mut self) {
        self.drop_tx();
        self.block_write_log = Default::default();
    }

    /// Take the block write log to be flushed to the DB. The current
    /// transaction must have been committed or dropped before.
    pub(crate) fn take_block_log(
        &mut self,
    ) -> BTreeMap<storage::Key, StorageModification> {
        std::mem::take(&mut self.block_write_log)
    }

    /// Iterate modifications posterior of the current tx, whose storage key
    /// matches the given prefix, sorted by their storage key.
    pub fn iter_prefix_post(&self, prefix: &storage::Key) -> PrefixIter {
        let mut matches = BTreeMap::new();

        for (key, modification) in self
            .block_write_log
            .iter()
            .chain(self.tx_write_log.iter())
        {
            if key.is_prefixed_by(prefix) {
                matches.insert(key.clone(), modification.clone());
            }
        }

        let iter = matches.into_iter();
        PrefixIter { iter }
    }
}

/// Helpers for testing with write log.
#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use proptest::collection;
    use proptest::prelude::{any, prop_oneof, Just, Strategy};
    use stakebond_core::address::POS;
    use stakebond_core::storage::KeySeg;

    use super::*;

    /// Generate an arbitrary storage key under the PoS namespace
    pub fn arb_key() -> impl Strategy<Value = storage::Key> {
        "[a-z]{1,8}".prop_map(|seg| {
            storage::Key::from(POS.to_db_key()).with_segment(seg)
        })
    }

    /// Generate an arbitrary tx write log.
    pub fn arb_tx_write_log(
    ) -> impl Strategy<Value = BTreeMap<storage::Key, StorageModification>>
    {
        collection::btree_map(arb_key(), arb_storage_modification(), 0..20)
    }

    /// Generate arbitrary [`StorageModification`].
    pub fn arb_storage_modification(
    ) -> impl Strategy<Value = StorageModification> {
        prop_oneof![
            collection::vec(any::<u8>(), 1..32)
                .prop_map(|value| StorageModification::Write { value }),
            Just(StorageModification::Delete),
        ]
    }
}
