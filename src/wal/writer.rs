//! WAL Writer
//!
//! Handles appending entries to the WAL file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::codec::{self, Entry};
use crate::config::WalSyncStrategy;
use crate::error::Result;

/// Writes entries to the WAL file
///
/// Each record goes to the file in a single `write_all`, so it reaches the
/// OS page cache before `append` returns; `sync_all` moves it to disk per
/// the sync strategy. No bytes are held in user space between appends, which
/// lets a failed append be cut back off the file without leaving residue.
pub struct WalWriter {
    path: PathBuf,
    file: File,
    sync_strategy: WalSyncStrategy,
    entries_since_sync: usize,
    /// End of the last fully written record
    len: u64,
}

impl WalWriter {
    /// Open or create a WAL file, positioned at its end
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let len = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            sync_strategy,
            entries_since_sync: 0,
            len,
        })
    }

    /// Append an entry to the WAL
    ///
    /// When this returns `Ok`, the record has reached at least the OS page
    /// cache; whether it is also on disk depends on the sync strategy. When
    /// it returns `Err`, the log is back at its previous length and the
    /// entry will not be replayed.
    pub fn append(&mut self, entry: &Entry) -> Result<()> {
        codec::check_lengths(entry.key.len(), entry.value.len())?;
        let record = codec::encode(entry);

        if let Err(e) = self.file.write_all(&record) {
            self.roll_back();
            return Err(e.into());
        }

        let due = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.entries_since_sync + 1 >= count,
            WalSyncStrategy::OsBuffered => false,
        };
        if due {
            if let Err(e) = self.file.sync_all() {
                self.roll_back();
                return Err(e.into());
            }
            self.entries_since_sync = 0;
        } else {
            self.entries_since_sync += 1;
        }

        self.len += record.len() as u64;
        Ok(())
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        self.entries_since_sync = 0;
        Ok(())
    }

    /// Empty the log after its contents became durable in an SSTable
    pub fn clear(&mut self) -> Result<()> {
        self.file.set_len(0)?;
        self.file.sync_all()?;

        debug!(path = %self.path.display(), bytes = self.len, "WAL truncated");
        self.len = 0;
        self.entries_since_sync = 0;
        Ok(())
    }

    /// Appends not yet forced to disk
    pub fn entries_since_sync(&self) -> usize {
        self.entries_since_sync
    }

    /// Current size of the log in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drop whatever part of a failed record made it into the file
    fn roll_back(&mut self) {
        if let Err(e) = self.file.set_len(self.len) {
            warn!(
                path = %self.path.display(),
                len = self.len,
                error = %e,
                "Failed to cut partial record off WAL"
            );
        }
    }
}
