//! Storage Module
//!
//! Persistent storage layer: immutable SSTables, the table list, and
//! full compaction.
//!
//! ## Responsibilities
//! - Persist flushed MemTables as sorted files with bloom sidecars
//! - Point lookups across tables, newest → oldest
//! - Merge every table into one once the count passes a ceiling
//! - Rediscover tables on startup, ordered by sequence number

mod compactor;
mod manager;
pub mod sstable;

use std::path::Path;

use crate::error::Result;

pub use compactor::{CompactionOutput, Compactor};
pub use manager::{CompactionReport, StorageManager};
pub use sstable::{FlushedTable, SSTable, SSTableBuilder, SSTableIterator, SparseIndex, TableId};

/// Make newly created or removed directory entries durable
#[cfg(unix)]
pub(crate) fn sync_dir(dir: &Path) -> Result<()> {
    std::fs::File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
pub(crate) fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
