//! An in-memory storage for tests.

use std::collections::BTreeMap;

use stakebond_core::storage;

use crate::{Result, StorageRead, StorageWrite};

/// Storage backed by a sorted map, with no write log. Writes are applied
/// immediately.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TestStorage {
    db: BTreeMap<storage::Key, Vec<u8>>,
}

impl TestStorage {
    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    /// All the stored key-vals, ordered by key.
    pub fn entries(&self) -> impl Iterator<Item = (&storage::Key, &[u8])> {
        self.db.iter().map(|(key, val)| (key, val.as_slice()))
    }
}

impl StorageRead for TestStorage {
    type PrefixIter<'iter> = std::vec::IntoIter<(String, Vec<u8>)>;

    fn read_bytes(&self, key: &storage::Key) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get(key).cloned())
    }

    fn has_key(&self, key: &storage::Key) -> Result<bool> {
        Ok(self.db.contains_key(key))
    }

    fn iter_prefix<'iter>(
        &'iter self,
        prefix: &storage::Key,
    ) -> Result<Self::PrefixIter<'iter>> {
        let matches: Vec<_> = self
            .db
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.is_prefixed_by(prefix))
            .map(|(key, val)| (key.to_string(), val.clone()))
            .collect();
        Ok(matches.into_iter())
    }

    fn iter_next<'iter>(
        &'iter self,
        iter: &mut Self::PrefixIter<'iter>,
    ) -> Result<Option<(String, Vec<u8>)>> {
        Ok(iter.next())
    }
}

impl StorageWrite for TestStorage {
    fn write_bytes(
        &mut self,
        key: &storage::Key,
        val: impl AsRef<[u8]>,
    ) -> Result<()> {
        self.db.insert(key.clone(), val.as_ref().to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &storage::Key) -> Result<()> {
        self.db.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use stakebond_core::address::POS;
    use stakebond_core::storage::KeySeg;

    use super::*;

    #[test]
    fn test_iter_prefix_is_segment_aware() -> Result<()> {
        let mut storage = TestStorage::default();
        let base = storage::Key::from(POS.to_db_key());
        let queue = base.clone().with_segment("queue".to_owned());
        let queued = base.clone().with_segment("queued".to_owned());
        storage.write(&queue.clone().with_segment("head".to_owned()), 1_u64)?;
        storage.write(&queue.clone().with_segment("tail".to_owned()), 2_u64)?;
        storage.write(&queued, 3_u64)?;

        let found = crate::iter_prefix::<u64>(&storage, &queue)?
            .map(|res| res.map(|(_key, val)| val))
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(found, vec![1, 2]);
        assert!(storage.has_key(&queued)?);
        Ok(())
    }
}
