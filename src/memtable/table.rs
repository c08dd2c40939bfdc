//! MemTable implementation
//!
//! BTreeMap-based memtable with an incrementally maintained size counter.

use std::collections::BTreeMap;

/// In-memory table for recent writes
#[derive(Debug, Default)]
pub struct MemTable {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
    /// Sum of `key.len() + value.len()` over live pairs
    size: usize,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a key; returns the new size in bytes
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> usize {
        let added = key.len() + value.len();
        if let Some(old) = self.data.get(&key) {
            self.size -= key.len() + old.len();
        }
        self.data.insert(key, value);
        self.size += added;
        self.size
    }

    /// Get a value by key
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.data.get(key).map(Vec::as_slice)
    }

    /// Live footprint in bytes, O(1)
    pub fn size_in_bytes(&self) -> usize {
        self.size
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Entries in ascending key order
    ///
    /// Lazy and borrow-based; call again to restart from the smallest key.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> + '_ {
        self.data.iter().map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    /// Drop all entries once they are durable in an SSTable
    pub fn clear(&mut self) {
        self.data.clear();
        self.size = 0;
    }
}
