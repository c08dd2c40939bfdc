//! Storage Manager
//!
//! Manages the ordered list of SSTables and coordinates reads, flushes
//! and compaction.
//!
//! ## Responsibilities
//! - Discover existing SSTables on startup (oldest → newest by sequence)
//! - Search SSTables newest → oldest for reads
//! - Create new SSTables from MemTable flushes
//! - Replace the whole list with one merged table on compaction

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::Result;

use super::sstable::{DATA_EXTENSION, FILE_PREFIX, FILTER_EXTENSION};
use super::{Compactor, SSTable, SSTableBuilder, TableId};

/// Summary of one compaction run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactionReport {
    /// Number of tables merged
    pub inputs: usize,

    /// Distinct keys in the merged table
    pub merged_entries: usize,

    /// Input files left behind because removal failed
    pub failed_removals: Vec<PathBuf>,
}

/// Manages the storage layer
///
/// ## Concurrency:
/// - `sstables`: Protected by RwLock (many concurrent readers, exclusive writer)
/// - Compaction holds the write lock for its whole run, so readers see either
///   the old list or the merged table, never a list whose files are gone
/// - All methods use `&self` (no exclusive access needed)
pub struct StorageManager {
    /// Directory where SSTables are stored
    data_dir: PathBuf,

    /// Sampling gap used when reopening tables
    sparse_index_gap: usize,

    /// Shared with the compactor so both draw from one sequence counter
    builder: Arc<SSTableBuilder>,

    compactor: Compactor,

    /// Open SSTables, ordered oldest → newest
    sstables: RwLock<Vec<SSTable>>,
}

impl StorageManager {
    /// Open storage in the given directory
    ///
    /// On startup:
    /// 1. Create directory if it doesn't exist
    /// 2. Discover existing SSTable data files
    /// 3. Order them by sequence number (oldest first)
    /// 4. Open each (rebuilds sparse index, loads bloom sidecar)
    pub fn open(path: &Path, config: &Config) -> Result<Self> {
        fs::create_dir_all(path)?;

        let mut ids: Vec<TableId> = Vec::new();
        for entry in fs::read_dir(path)? {
            let file_path = entry?.path();
            if !file_path.is_file() {
                continue;
            }
            match TableId::parse(&file_path) {
                Some(id) => ids.push(id),
                None => Self::note_unrecognized(&file_path),
            }
        }
        ids.sort();

        let mut sstables = Vec::with_capacity(ids.len());
        for id in &ids {
            let table_path = path.join(id.data_file_name());
            sstables.push(SSTable::open(&table_path, config.sparse_index_gap)?);
        }

        // Next sequence = max + 1, or 1 if no SSTables exist
        let next_seq = ids.last().map(|id| id.seq + 1).unwrap_or(1);

        let builder = Arc::new(
            SSTableBuilder::new(path, config.sparse_index_gap)
                .with_bloom(config.bloom_bits_per_key, config.bloom_hash_count)
                .with_next_seq(next_seq),
        );

        debug!(tables = sstables.len(), next_seq, "Storage opened");

        Ok(Self {
            data_dir: path.to_path_buf(),
            sparse_index_gap: config.sparse_index_gap,
            compactor: Compactor::new(Arc::clone(&builder)),
            builder,
            sstables: RwLock::new(sstables),
        })
    }

    /// Get a value by key (searches all SSTables newest → oldest)
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let sstables = self.sstables.read();
        for table in sstables.iter().rev() {
            if let Some(value) = table.get(key)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Flush sorted entries to a new SSTable and append it as the newest
    ///
    /// Returns the new table's path, or `None` if `entries` was empty.
    pub fn flush<'a, I>(&self, entries: I) -> Result<Option<PathBuf>>
    where
        I: IntoIterator<Item = (&'a [u8], &'a [u8])>,
    {
        let Some(flushed) = self.builder.flush(entries)? else {
            return Ok(None);
        };

        info!(
            seq = flushed.id.seq,
            entries = flushed.entry_count,
            bytes = flushed.file_size,
            "Flushed MemTable to SSTable"
        );

        let table = flushed.into_table();
        let path = table.path().to_path_buf();
        self.sstables.write().push(table);
        Ok(Some(path))
    }

    /// Merge every SSTable into one
    ///
    /// No-op (returns `None`) when there is at most one table.
    pub fn compact(&self) -> Result<Option<CompactionReport>> {
        let mut sstables = self.sstables.write();
        if sstables.len() <= 1 {
            return Ok(None);
        }

        let inputs = sstables.len();
        info!(inputs, "Compacting SSTables");

        let output = self.compactor.compact(&sstables)?;
        *sstables = output.table.into_iter().collect();

        if !output.failed_removals.is_empty() {
            warn!(
                count = output.failed_removals.len(),
                "Compaction left input files behind"
            );
        }
        info!(
            inputs,
            merged_entries = output.merged_entries,
            "Compaction complete"
        );

        Ok(Some(CompactionReport {
            inputs,
            merged_entries: output.merged_entries,
            failed_removals: output.failed_removals,
        }))
    }

    /// Get the number of SSTables
    pub fn sstable_count(&self) -> usize {
        self.sstables.read().len()
    }

    /// Data file paths, oldest → newest
    pub fn sstable_paths(&self) -> Vec<PathBuf> {
        self.sstables
            .read()
            .iter()
            .map(|t| t.path().to_path_buf())
            .collect()
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn sparse_index_gap(&self) -> usize {
        self.sparse_index_gap
    }

    /// Get the next SSTable sequence number (for testing/debugging)
    pub fn next_sequence(&self) -> u64 {
        self.builder.next_seq()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Table-looking files we cannot use are worth a warning; the WAL and
    /// lock file are expected neighbours
    fn note_unrecognized(path: &Path) {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return;
        };
        if !name.starts_with(FILE_PREFIX) {
            return;
        }
        let is_filter = path.extension().is_some_and(|ext| ext == FILTER_EXTENSION);
        if is_filter && path.with_extension(DATA_EXTENSION).exists() {
            return;
        }
        warn!(path = %path.display(), "Ignoring unrecognized file in data directory");
    }
}
