//! Lazy FIFO queue.

use std::marker::PhantomData;

use stakebond_core::arith::checked;
use stakebond_core::borsh::{BorshDeserialize, BorshSerialize};
use stakebond_core::storage;

use super::super::Result;
use super::{LazyCollection, ReadError};
use crate::{ResultExt, StorageRead, StorageWrite};

/// Subkey pointing to the index of the front element
pub const HEAD_SUBKEY: &str = "head";
/// Subkey pointing to the index one past the back element
pub const TAIL_SUBKEY: &str = "tail";
/// Subkey corresponding to the data elements of the LazyQueue
pub const DATA_SUBKEY: &str = "data";

/// Lazy FIFO queue.
///
/// Elements are pushed at the back and only the front element can be
/// inspected or removed. The elements do not reside in memory but are
/// instead read and written to storage sub-keys of the storage `key` used to
/// construct the queue: `<key>/head`, `<key>/tail` and `<key>/data/<index>`.
///
/// An empty queue leaves nothing in storage.
#[derive(Debug)]
pub struct LazyQueue<T> {
    key: storage::Key,
    phantom: PhantomData<T>,
}

impl<T> LazyCollection for LazyQueue<T>
where
    T: BorshSerialize + BorshDeserialize + 'static,
{
    type Value = T;

    /// Create or use an existing queue with the given storage `key`.
    fn open(key: storage::Key) -> Self {
        Self {
            key,
            phantom: PhantomData,
        }
    }
}

impl<T> LazyQueue<T> {
    fn get_head_key(&self) -> storage::Key {
        self.key.clone().with_segment(HEAD_SUBKEY.to_owned())
    }

    fn get_tail_key(&self) -> storage::Key {
        self.key.clone().with_segment(TAIL_SUBKEY.to_owned())
    }

    /// Get the prefix of the queue's elements storage
    fn get_data_prefix(&self) -> storage::Key {
        self.key.clone().with_segment(DATA_SUBKEY.to_owned())
    }

    /// Get the sub-key of the element at the given index
    pub fn get_data_key(&self, index: u64) -> storage::Key {
        self.get_data_prefix().with_segment(index)
    }

    fn read_head<S: StorageRead>(&self, storage: &S) -> Result<u64> {
        Ok(storage.read(&self.get_head_key())?.unwrap_or_default())
    }

    fn read_tail<S: StorageRead>(&self, storage: &S) -> Result<u64> {
        Ok(storage.read(&self.get_tail_key())?.unwrap_or_default())
    }

    /// Returns the number of elements in the queue.
    pub fn len<S: StorageRead>(&self, storage: &S) -> Result<u64> {
        let head = self.read_head(storage)?;
        let tail = self.read_tail(storage)?;
        Ok(checked!(tail - head)?)
    }

    /// Returns `true` if the queue contains no elements.
    pub fn is_empty<S: StorageRead>(&self, storage: &S) -> Result<bool> {
        Ok(self.len(storage)? == 0)
    }
}

impl<T> LazyQueue<T>
where
    T: BorshSerialize + BorshDeserialize,
{
    fn get<S: StorageRead>(&self, storage: &S, index: u64) -> Result<T> {
        storage
            .read(&self.get_data_key(index))?
            .ok_or_else(|| ReadError::MissingElement {
                key: self.key.clone(),
                index,
            })
            .into_storage_result()
    }

    /// Appends an element to the back of the queue.
    pub fn push_back<S>(&self, storage: &mut S, val: T) -> Result<()>
    where
        S: StorageWrite + StorageRead,
    {
        let tail = self.read_tail(storage)?;
        storage.write(&self.get_data_key(tail), val)?;
        let tail = checked!(tail + 1)?;
        tracing::trace!(key = %self.key, tail, "Pushed to the queue");
        storage.write(&self.get_tail_key(), tail)
    }

    /// Returns the front element without removing it, or `None` if the
    /// queue is empty.
    pub fn front<S: StorageRead>(&self, storage: &S) -> Result<Option<T>> {
        let head = self.read_head(storage)?;
        let tail = self.read_tail(storage)?;
        if head == tail {
            return Ok(None);
        }
        self.get(storage, head).map(Some)
    }

    /// Removes the front element and returns it, or `None` if the queue is
    /// empty.
    pub fn pop_front<S>(&self, storage: &mut S) -> Result<Option<T>>
    where
        S: StorageWrite + StorageRead,
    {
        let head = self.read_head(storage)?;
        let tail = self.read_tail(storage)?;
        if head == tail {
            return Ok(None);
        }
        let val = self.get(storage, head)?;
        storage.delete(&self.get_data_key(head))?;
        let head = checked!(head + 1)?;
        if head == tail {
            storage.delete(&self.get_head_key())?;
            storage.delete(&self.get_tail_key())?;
        } else {
            storage.write(&self.get_head_key(), head)?;
        }
        Ok(Some(val))
    }

    /// An iterator visiting all elements from the front to the back. The
    /// iterator element type is `Result<T>`, because iterator's call to
    /// `next` may fail with e.g. a data decoding error.
    pub fn iter<'iter>(
        &'iter self,
        storage: &'iter impl StorageRead,
    ) -> Result<impl Iterator<Item = Result<T>> + 'iter> {
        let head = self.read_head(storage)?;
        let tail = self.read_tail(storage)?;
        Ok((head..tail).map(move |index| self.get(storage, index)))
    }
}
