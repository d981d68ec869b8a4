//! Keyspace implementation
//!
//! HashMap-based string table with an RwLock for concurrency.

use std::collections::{BTreeMap, HashMap};

use bytes::Bytes;
use parking_lot::RwLock;

/// Key/value strings of a single namespace
#[derive(Debug, Default)]
pub struct Keyspace {
    data: RwLock<HashMap<Bytes, Bytes>>,
}

impl Keyspace {
    /// Create a new empty keyspace
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value by key (read lock)
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.data.read().get(key).cloned()
    }

    /// Run `f` with the write lock held
    ///
    /// Everything `f` does, including logging the write, happens before any
    /// other writer of this namespace can observe or change the table.
    pub fn write_with<T>(&self, f: impl FnOnce(&mut HashMap<Bytes, Bytes>) -> T) -> T {
        f(&mut self.data.write())
    }

    /// Count how many of the listed keys exist; repeats count repeatedly
    pub fn count_existing(&self, keys: &[Bytes]) -> usize {
        let data = self.data.read();
        keys.iter()
            .filter(|key| data.contains_key(&key[..]))
            .count()
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the keyspace holds no keys
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Sorted copy of the contents
    pub fn snapshot(&self) -> BTreeMap<Bytes, Bytes> {
        self.data
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
