//! Compactor
//!
//! Full compaction: every input table is merged into a single new table.
//!
//! Cost is O(total data) per run (each live record is read and rewritten
//! once) and the merge is staged in memory. There are no levels or tiers.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::warn;

use crate::error::{LsmError, Result};
use crate::storage::sync_dir;

use super::{FlushedTable, SSTable, SSTableBuilder};

/// Merges tables through a shared builder
#[derive(Debug)]
pub struct Compactor {
    builder: Arc<SSTableBuilder>,
}

/// What a compaction produced
#[derive(Debug)]
pub struct CompactionOutput {
    /// The merged table; `None` only if the inputs held no readable records
    pub table: Option<SSTable>,

    /// Distinct keys written to the merged table
    pub merged_entries: usize,

    /// Input files that could not be removed
    pub failed_removals: Vec<PathBuf>,
}

impl Compactor {
    pub fn new(builder: Arc<SSTableBuilder>) -> Self {
        Self { builder }
    }

    /// Merge `tables` into one and delete the inputs
    ///
    /// `tables` must be ordered oldest → newest: for a key present in several
    /// inputs, the value from the last one wins. The merged table is durable
    /// before any input is removed; a failed removal is logged and reported
    /// in the output but does not fail the compaction, since a leftover older
    /// table can never shadow the newer merged one. The directory is synced
    /// once after the removals.
    pub fn compact(&self, tables: &[SSTable]) -> Result<CompactionOutput> {
        if tables.is_empty() {
            return Err(LsmError::NothingToCompact);
        }

        // BTreeMap both deduplicates (last insert wins) and sorts
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();
        for table in tables {
            for entry in table.iter()? {
                let entry = entry?;
                merged.insert(entry.key, entry.value);
            }
        }

        let flushed = self
            .builder
            .flush(merged.iter().map(|(k, v)| (k.as_slice(), v.as_slice())))?;
        let table = flushed.map(FlushedTable::into_table);

        let mut failed_removals = Vec::new();
        for input in tables {
            for path in [input.path().to_path_buf(), input.filter_path()] {
                if let Err(e) = remove_if_present(&path) {
                    warn!(path = %path.display(), error = %e, "Failed to remove compacted input");
                    failed_removals.push(path);
                }
            }
        }

        // The merged table is already in place; an unsynced removal only
        // risks an older table reappearing, which the sequence order outranks
        if let Err(e) = sync_dir(self.builder.dir()) {
            warn!(error = %e, "Failed to sync directory after removing compacted inputs");
        }

        Ok(CompactionOutput {
            table,
            merged_entries: merged.len(),
            failed_removals,
        })
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
