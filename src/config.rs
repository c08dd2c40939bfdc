//! Configuration for lsmlite
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{LsmError, Result};

/// Main configuration for an lsmlite engine instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files.
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── LOCK                        (single-engine guard)
    ///     ├── wal.log                     (write-ahead log)
    ///     ├── sstable_<ts>_<seq>.db       (sorted records)
    ///     └── sstable_<ts>_<seq>.filter   (bloom filter sidecar)
    pub data_dir: PathBuf,

    /// Sample every Nth record of an SSTable into its sparse index
    pub sparse_index_gap: usize,

    /// Auto-compact once the SSTable count exceeds this ceiling
    pub max_sstables: usize,

    // -------------------------------------------------------------------------
    // Bloom Filter Configuration
    // -------------------------------------------------------------------------
    /// Filter bits allocated per key (10 bits/key ≈ 1-2% false positives at k=3)
    pub bloom_bits_per_key: usize,

    /// Number of hash probes per key
    pub bloom_hash_count: u32,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync WAL
    pub wal_sync_strategy: WalSyncStrategy,

    // -------------------------------------------------------------------------
    // MemTable Configuration
    // -------------------------------------------------------------------------
    /// MemTable footprint (sum of key + value lengths) that triggers a flush
    pub flush_threshold: usize,
}

/// WAL sync strategy
///
/// Every append is handed to the OS before `put` returns, so a process crash
/// never loses an acknowledged write. The strategy only decides when the log
/// is forced to stable storage, i.e. what survives a power loss or kernel crash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries (balanced durability/performance)
    EveryNEntries { count: usize },

    /// Never fsync on append; rely on the OS page cache and explicit `sync()`
    OsBuffered,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./lsmlite_data"),
            sparse_index_gap: 5,
            max_sstables: 5,
            bloom_bits_per_key: 10,
            bloom_hash_count: 3,
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            flush_threshold: 4096,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject parameters the engine cannot operate with
    pub fn validate(&self) -> Result<()> {
        if self.sparse_index_gap == 0 {
            return Err(LsmError::Config("sparse_index_gap must be > 0".to_string()));
        }
        if self.flush_threshold == 0 {
            return Err(LsmError::Config("flush_threshold must be > 0".to_string()));
        }
        if self.max_sstables == 0 {
            return Err(LsmError::Config("max_sstables must be > 0".to_string()));
        }
        if self.bloom_bits_per_key == 0 || self.bloom_hash_count == 0 {
            return Err(LsmError::Config(
                "bloom_bits_per_key and bloom_hash_count must be > 0".to_string(),
            ));
        }
        if let WalSyncStrategy::EveryNEntries { count: 0 } = self.wal_sync_strategy {
            return Err(LsmError::Config(
                "EveryNEntries requires a count > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the MemTable flush threshold (in bytes)
    pub fn flush_threshold(mut self, bytes: usize) -> Self {
        self.config.flush_threshold = bytes;
        self
    }

    /// Set the sparse index sampling gap
    pub fn sparse_index_gap(mut self, gap: usize) -> Self {
        self.config.sparse_index_gap = gap;
        self
    }

    /// Set the SSTable count that triggers auto-compaction
    pub fn max_sstables(mut self, count: usize) -> Self {
        self.config.max_sstables = count;
        self
    }

    /// Set the bloom filter bits per key
    pub fn bloom_bits_per_key(mut self, bits: usize) -> Self {
        self.config.bloom_bits_per_key = bits;
        self
    }

    /// Set the bloom filter probe count
    pub fn bloom_hash_count(mut self, count: u32) -> Self {
        self.config.bloom_hash_count = count;
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
