//! Ledger's state storage: a key-value backed store with a two-level write
//! log in front of it.
//!
//! Every delivered transaction writes into the tx-level log. The host then
//! either commits it into the block-level log or drops it, and at the end of
//! the block the block-level log is flushed into the store.

#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_lossless,
    clippy::arithmetic_side_effects,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]

pub mod write_log;

use std::collections::BTreeMap;
use std::fmt::Debug;

use itertools::{EitherOrBoth, Itertools};
use sha2::{Digest, Sha256};
pub use stakebond_core::storage::{BlockHeight, Key, KeySeg};
use stakebond_core::storage;
pub use stakebond_storage::{
    collections, iter_prefix, iter_prefix_bytes, Error as StorageError,
    OptionExt, Result as StorageResult, ResultExt, StorageRead, StorageWrite,
};
use thiserror::Error;
use write_log::{StorageModification, WriteLog};

#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum Error {
    #[error("Block {committing} cannot follow the last committed block {last}")]
    NonIncreasingHeight {
        committing: BlockHeight,
        last: BlockHeight,
    },
    #[error("A transaction is still pending in the write log")]
    PendingTx,
}

/// A result of a function that may fail
pub type Result<T> = std::result::Result<T, Error>;

/// The storage state: the committed key-values together with the write log of
/// the block that's being applied.
#[derive(Debug, Default, Clone)]
pub struct State {
    db: BTreeMap<Key, Vec<u8>>,
    write_log: WriteLog,
    last_committed_height: Option<BlockHeight>,
}

impl State {
    /// Borrow the write log
    pub fn write_log(&self) -> &WriteLog {
        &self.write_log
    }

    /// Height of the last committed block, if any
    pub fn last_committed_height(&self) -> Option<BlockHeight> {
        self.last_committed_height
    }

    /// Commit the current transaction's changes into the block.
    pub fn commit_tx(&mut self) {
        self.write_log.commit_tx();
    }

    /// Drop the current transaction's changes.
    pub fn drop_tx(&mut self) {
        self.write_log.drop_tx();
    }

    /// Drop the current transaction and all the changes of the block.
    pub fn drop_block(&mut self) {
        tracing::warn!("Dropping the changes of an aborted block");
        self.write_log.drop_block();
    }

    /// Flush the block write log into the store. The block height must be
    /// greater than the last committed one and the current transaction must
    /// have been committed or dropped.
    pub fn commit_block(&mut self, height: BlockHeight) -> Result<()> {
        if !self.write_log.tx_write_log.is_empty() {
            return Err(Error::PendingTx);
        }
        if let Some(last) = self.last_committed_height {
            if height <= last {
                return Err(Error::NonIncreasingHeight {
                    committing: height,
                    last,
                });
            }
        }
        let block_log = self.write_log.take_block_log();
        tracing::debug!(
            %height,
            changes = block_log.len(),
            "Committing block"
        );
        for (key, modification) in block_log {
            match modification {
                StorageModification::Write { value } => {
                    self.db.insert(key, value);
                }
                StorageModification::Delete => {
                    self.db.remove(&key);
                }
            }
        }
        self.last_committed_height = Some(height);
        Ok(())
    }

    /// The committed key-values, ordered by key.
    pub fn db_entries(&self) -> impl Iterator<Item = (&Key, &[u8])> {
        self.db.iter().map(|(key, val)| (key, val.as_slice()))
    }

    /// A hash of all the committed key-values. Two states with the same
    /// committed data have the same root.
    pub fn root_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        for (key, val) in &self.db {
            let key = key.to_string();
            hasher.update((key.len() as u64).to_be_bytes());
            hasher.update(key.as_bytes());
            hasher.update((val.len() as u64).to_be_bytes());
            hasher.update(val);
        }
        hasher.finalize().into()
    }

    /// Iterate the key-values matching the prefix as they'd be seen after the
    /// current transaction, sorted by their key.
    fn iter_prefix_post(&self, prefix: &Key) -> Vec<(String, Vec<u8>)> {
        let db_iter = self
            .db
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.is_prefixed_by(prefix));
        let log_iter = self.write_log.iter_prefix_post(prefix);
        db_iter
            .merge_join_by(log_iter, |(db_key, _), (log_key, _)| {
                (*db_key).cmp(log_key)
            })
            .filter_map(|entry| match entry {
                EitherOrBoth::Left((key, val)) => {
                    Some((key.to_string(), val.clone()))
                }
                EitherOrBoth::Right((key, modification))
                | EitherOrBoth::Both(_, (key, modification)) => {
                    match modification {
                        StorageModification::Write { value } => {
                            Some((key.to_string(), value))
                        }
                        StorageModification::Delete => None,
                    }
                }
            })
            .collect()
    }
}

impl StorageRead for State {
    type PrefixIter<'iter> = std::vec::IntoIter<(String, Vec<u8>)>;

    fn read_bytes(&self, key: &storage::Key) -> StorageResult<Option<Vec<u8>>> {
        tracing::trace!("storage read key {}", key);
        // try to read from the write log first
        match self.write_log.read(key) {
            Some(StorageModification::Write { value }) => {
                Ok(Some(value.clone()))
            }
            Some(StorageModification::Delete) => Ok(None),
            // when not found in write log try to read from the storage
            None => Ok(self.db.get(key).cloned()),
        }
    }

    fn has_key(&self, key: &storage::Key) -> StorageResult<bool> {
        match self.write_log.read(key) {
            Some(StorageModification::Write { .. }) => Ok(true),
            // the given key has been deleted
            Some(StorageModification::Delete) => Ok(false),
            None => Ok(self.db.contains_key(key)),
        }
    }

    fn iter_prefix<'iter>(
        &'iter self,
        prefix: &storage::Key,
    ) -> StorageResult<Self::PrefixIter<'iter>> {
        Ok(self.iter_prefix_post(prefix).into_iter())
    }

    fn iter_next<'iter>(
        &'iter self,
        iter: &mut Self::PrefixIter<'iter>,
    ) -> StorageResult<Option<(String, Vec<u8>)>> {
        Ok(iter.next())
    }
}

impl StorageWrite for State {
    fn write_bytes(
        &mut self,
        key: &storage::Key,
        val: impl AsRef<[u8]>,
    ) -> StorageResult<()> {
        self.write_log.write(key, val.as_ref().to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &storage::Key) -> StorageResult<()> {
        self.write_log.delete(key);
        Ok(())
    }
}
