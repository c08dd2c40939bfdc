//! SSTable Module
//!
//! Sorted String Table - immutable on-disk sorted key-value storage.
//!
//! ## Files per table
//! ```text
//! sstable_<created_at_ms>_<seq>.db       data records, strictly ascending keys
//! sstable_<created_at_ms>_<seq>.filter   bloom filter sidecar (optional)
//! ```
//!
//! ## Data File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ [CRC: u32][KeyLen: u32][ValLen: u32][Key][Value]        │  offset 0
//! │ [CRC: u32][KeyLen: u32][ValLen: u32][Key][Value]        │
//! │ ... repeated for each entry, no header or footer ...    │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The sparse index is not stored: it is rebuilt by one sequential scan on
//! open, sampling every `sparse_index_gap`-th record exactly as the builder
//! did. The sequence number in the file name is the only thing that orders
//! tables; the timestamp is informational.

mod builder;
mod index;
mod iterator;
mod reader;

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

pub use builder::{FlushedTable, SSTableBuilder};
pub use index::SparseIndex;
pub use iterator::SSTableIterator;
pub use reader::SSTable;

// =============================================================================
// Shared Constants (used by builder, reader, storage manager)
// =============================================================================

pub(crate) const FILE_PREFIX: &str = "sstable_";
pub(crate) const DATA_EXTENSION: &str = "db";
pub(crate) const FILTER_EXTENSION: &str = "filter";

// =============================================================================
// Table Identity
// =============================================================================

/// Identity of one SSTable: creation sequence number plus wall-clock stamp
///
/// Ordering compares `seq` first, so sorting ids sorts tables oldest → newest
/// even when two flushes land in the same millisecond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableId {
    pub seq: u64,
    pub created_at_ms: u64,
}

impl TableId {
    /// Stamp a new id with the current time
    pub fn new(seq: u64) -> Self {
        let created_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self { seq, created_at_ms }
    }

    /// "sstable_1700000000000_000042.db"
    pub fn data_file_name(&self) -> String {
        format!(
            "{}{}_{:06}.{}",
            FILE_PREFIX, self.created_at_ms, self.seq, DATA_EXTENSION
        )
    }

    /// "sstable_1700000000000_000042.filter"
    pub fn filter_file_name(&self) -> String {
        format!(
            "{}{}_{:06}.{}",
            FILE_PREFIX, self.created_at_ms, self.seq, FILTER_EXTENSION
        )
    }

    /// Parse an id from a data file path
    /// "sstable_1700000000000_000042.db" → Some(TableId { seq: 42, .. })
    pub fn parse(path: &Path) -> Option<Self> {
        if path.extension()? != DATA_EXTENSION {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        let (created_at, seq) = stem.strip_prefix(FILE_PREFIX)?.split_once('_')?;
        Some(Self {
            seq: seq.parse().ok()?,
            created_at_ms: created_at.parse().ok()?,
        })
    }
}
