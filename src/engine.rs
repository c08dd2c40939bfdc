//! Engine Module
//!
//! The LSM engine that coordinates WAL, MemTable and storage.
//!
//! ## Responsibilities
//! - Route puts through WAL → MemTable and gets through MemTable → SSTables
//! - Flush the MemTable once its footprint reaches the threshold
//! - Trigger full compaction once too many SSTables accumulate
//! - Restore state on startup (load SSTables, replay WAL)
//!
//! ## Lifecycle
//! ```text
//! open ──► Open ──put──► (Flushing) ──► Open ──► (Compacting) ──► Open ──close──► Closed
//! ```
//! Flushing and compacting are blocking phases inside `put`; they are not
//! observable as separate states.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use tracing::info;

use crate::codec::{self, Entry};
use crate::config::Config;
use crate::error::Result;
use crate::lock::DirLock;
use crate::memtable::MemTable;
use crate::storage::{CompactionReport, StorageManager};
use crate::wal::{WalRecovery, WalWriter};

/// The main storage engine
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (put/flush/compact): Serialized by `write_lock`
///   - Only ONE write operation at a time
///   - WAL append → MemTable mutate → flush check happen as one unit
///
/// - **Reads** (get): Concurrent
///   - MemTable behind a RwLock
///   - StorageManager keeps its table list behind a RwLock; each SSTable
///     lookup opens its own file handle
///
/// Within a process the engine may be shared across threads (`Arc<Engine>`);
/// across processes the directory lock rejects a second engine.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Path of the write-ahead log
    wal_path: PathBuf,

    /// Write-ahead log for durability (exclusive access needed)
    wal: Mutex<WalWriter>,

    /// In-memory table for recent writes
    memtable: RwLock<MemTable>,

    /// Persistent storage manager (internal RwLock on sstables vec)
    storage: StorageManager,

    /// Serializes write operations (put/flush/compact)
    write_lock: Mutex<()>,

    /// Held for the engine's lifetime
    _dir_lock: DirLock,
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const WAL_FILENAME: &'static str = "wal.log";
    const LOCK_FILENAME: &'static str = "LOCK";

    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Validate config, create data directory, take the directory lock
    /// 2. Load existing SSTables, oldest → newest
    /// 3. Replay the WAL into a fresh MemTable
    /// 4. Flush right away if the replayed MemTable is already over threshold
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        // Step 1: Create data directory and lock it
        fs::create_dir_all(&config.data_dir)?;
        let dir_lock = DirLock::acquire(&config.data_dir.join(Self::LOCK_FILENAME))?;

        // Step 2: Open storage manager (loads existing SSTables)
        let storage = StorageManager::open(&config.data_dir, &config)?;

        // Step 3: Replay WAL; recovery also cuts off a torn tail record
        let wal_path = config.data_dir.join(Self::WAL_FILENAME);
        let (entries, recovery) = WalRecovery::recover(&wal_path)?;

        let mut memtable = MemTable::new();
        for entry in entries {
            memtable.put(entry.key, entry.value);
        }

        let wal = WalWriter::open(&wal_path, config.wal_sync_strategy)?;

        info!(
            data_dir = %config.data_dir.display(),
            sstables = storage.sstable_count(),
            replayed = recovery.entries_recovered,
            memtable_bytes = memtable.size_in_bytes(),
            "Engine opened"
        );

        let engine = Self {
            config,
            wal_path,
            wal: Mutex::new(wal),
            memtable: RwLock::new(memtable),
            storage,
            write_lock: Mutex::new(()),
            _dir_lock: dir_lock,
        };

        // Step 4: A crash between WAL append and flush can leave a full MemTable
        if engine.memtable.read().size_in_bytes() >= engine.config.flush_threshold {
            engine.flush()?;
        }

        Ok(engine)
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Get a value by key
    ///
    /// Search order:
    /// 1. MemTable (most recent writes)
    /// 2. SSTables (newest to oldest)
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(value) = self.memtable.read().get(key) {
            return Ok(Some(value.to_vec()));
        }
        self.storage.get(key)
    }

    /// Put a key-value pair
    ///
    /// Steps:
    /// 1. Reject keys/values too long for the record header
    /// 2. Acquire write lock
    /// 3. Write to WAL (durability); an error here leaves the MemTable untouched
    /// 4. Write to MemTable
    /// 5. Flush (and maybe compact) if the threshold is reached
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        codec::check_lengths(key.len(), value.len())?;

        let _write_guard = self.write_lock.lock();

        let entry = Entry::new(key, value);
        self.wal.lock().append(&entry)?;

        let new_size = self.memtable.write().put(entry.key, entry.value);

        if new_size >= self.config.flush_threshold {
            self.flush_internal()?;
        }

        Ok(())
    }

    /// Flush memtable to disk (public API)
    ///
    /// Forces a flush regardless of memtable size
    pub fn flush(&self) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        self.flush_internal()
    }

    /// Merge all SSTables into one (public API)
    ///
    /// Returns `None` when there was nothing to merge.
    pub fn compact(&self) -> Result<Option<CompactionReport>> {
        let _write_guard = self.write_lock.lock();
        self.storage.compact()
    }

    /// Internal flush implementation (called with write lock held)
    fn flush_internal(&self) -> Result<()> {
        // Step 1: Write the MemTable to a new SSTable (fsynced on return)
        {
            let memtable = self.memtable.read();
            if memtable.is_empty() {
                return Ok(());
            }
            self.storage.flush(memtable.iter())?;
        }

        // Step 2: Clear memtable
        self.memtable.write().clear();

        // Step 3: Truncate WAL (entries are now durable in SSTable)
        self.wal.lock().clear()?;

        // Step 4: Bound the table count
        if self.storage.sstable_count() > self.config.max_sstables {
            self.storage.compact()?;
        }

        Ok(())
    }

    /// Close the engine gracefully
    ///
    /// Forces the WAL to disk. The MemTable is not flushed: its contents are
    /// replayed from the WAL on the next open.
    pub fn close(self) -> Result<()> {
        self.wal.lock().sync()?;
        info!(data_dir = %self.config.data_dir.display(), "Engine closed");
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the WAL file path
    pub fn wal_path(&self) -> &Path {
        &self.wal_path
    }

    /// Get the current memtable size
    pub fn memtable_size(&self) -> usize {
        self.memtable.read().size_in_bytes()
    }

    /// Get the memtable entry count
    pub fn memtable_len(&self) -> usize {
        self.memtable.read().len()
    }

    /// Get the number of SSTables
    pub fn sstable_count(&self) -> usize {
        self.storage.sstable_count()
    }

    /// SSTable data files, oldest → newest
    pub fn sstable_paths(&self) -> Vec<PathBuf> {
        self.storage.sstable_paths()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
