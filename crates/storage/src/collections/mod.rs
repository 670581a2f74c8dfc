//! Lazy data structures for storage access where elements are not all loaded
//! into memory. Each element lives under its own storage sub-key of the
//! collection's key, so that an update touches only the elements it changes.

use stakebond_core::storage;
use thiserror::Error;

pub mod lazy_queue;

pub use lazy_queue::LazyQueue;

#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Missing element at index {index} of the collection at {key}")]
    MissingElement { key: storage::Key, index: u64 },
}

/// A lazy collection of storage values is a handler with some storage prefix
/// that is given to its `fn open()`. The values are not held in memory and
/// are only read or written through the storage API.
pub trait LazyCollection {
    /// Type of the values held in the collection
    type Value;

    /// Create or use an existing collection with the given storage `key`.
    fn open(key: storage::Key) -> Self;
}
