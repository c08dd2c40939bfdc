//! SSTable Builder
//!
//! Writes a sorted batch of entries to a new SSTable file plus its bloom
//! filter sidecar.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::bloom::BloomFilter;
use crate::codec;
use crate::error::{LsmError, Result};
use crate::storage::sync_dir;

use super::{SSTable, SparseIndex, TableId};

/// Default bloom sizing: ~10 bits per key with 3 probes
const DEFAULT_BITS_PER_KEY: usize = 10;
const DEFAULT_HASH_COUNT: u32 = 3;

/// Builder for creating new SSTables from sorted entries
///
/// Owns the sequence counter, so every table it writes gets a fresh,
/// strictly increasing id.
#[derive(Debug)]
pub struct SSTableBuilder {
    dir: PathBuf,
    sparse_index_gap: usize,
    bloom_bits_per_key: usize,
    bloom_hash_count: u32,
    next_seq: AtomicU64,
}

/// Everything a flush produced, enough to serve reads without rescanning
#[derive(Debug)]
pub struct FlushedTable {
    pub id: TableId,
    pub path: PathBuf,
    pub filter_path: PathBuf,
    pub sparse_index: SparseIndex,
    pub bloom: BloomFilter,
    pub entry_count: u64,
    pub file_size: u64,
}

impl FlushedTable {
    /// Turn the flush products into an open reader
    pub fn into_table(self) -> SSTable {
        SSTable::from_parts(
            self.id,
            self.path,
            self.sparse_index,
            Some(self.bloom),
            self.entry_count,
            self.file_size,
        )
    }
}

impl SSTableBuilder {
    /// Create a builder writing into `dir`, sampling every `sparse_index_gap`-th key
    ///
    /// # Panics
    /// Panics if `sparse_index_gap` is 0.
    pub fn new(dir: &Path, sparse_index_gap: usize) -> Self {
        assert!(sparse_index_gap > 0, "sparse_index_gap must be > 0");
        Self {
            dir: dir.to_path_buf(),
            sparse_index_gap,
            bloom_bits_per_key: DEFAULT_BITS_PER_KEY,
            bloom_hash_count: DEFAULT_HASH_COUNT,
            next_seq: AtomicU64::new(1),
        }
    }

    /// Override bloom filter sizing
    pub fn with_bloom(mut self, bits_per_key: usize, hash_count: u32) -> Self {
        self.bloom_bits_per_key = bits_per_key;
        self.bloom_hash_count = hash_count;
        self
    }

    /// Start numbering tables at `seq`
    pub fn with_next_seq(self, seq: u64) -> Self {
        self.next_seq.store(seq, Ordering::SeqCst);
        self
    }

    /// Sequence number the next flush will use
    pub fn next_seq(&self) -> u64 {
        self.next_seq.load(Ordering::SeqCst)
    }

    /// Directory the tables are written into
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn sparse_index_gap(&self) -> usize {
        self.sparse_index_gap
    }

    /// Write `entries` (strictly ascending by key) as a new table
    ///
    /// Returns `Ok(None)` and creates no files for an empty batch. Unsorted
    /// or duplicate keys are rejected before anything touches the disk. The
    /// data file is fsynced before this returns, so the caller may drop its
    /// own copy of the entries (MemTable, WAL) afterwards.
    pub fn flush<'a, I>(&self, entries: I) -> Result<Option<FlushedTable>>
    where
        I: IntoIterator<Item = (&'a [u8], &'a [u8])>,
    {
        let entries: Vec<(&[u8], &[u8])> = entries.into_iter().collect();
        if entries.is_empty() {
            return Ok(None);
        }

        for (key, value) in &entries {
            codec::check_lengths(key.len(), value.len())?;
        }

        // Structural invariant: strictly ascending keys
        for pair in entries.windows(2) {
            if pair[0].0 >= pair[1].0 {
                return Err(LsmError::UnsortedInput {
                    previous: pair[0].0.to_vec(),
                    current: pair[1].0.to_vec(),
                });
            }
        }

        let id = TableId::new(self.next_seq.fetch_add(1, Ordering::SeqCst));
        let path = self.dir.join(id.data_file_name());
        let filter_path = self.dir.join(id.filter_file_name());

        let mut bloom =
            BloomFilter::for_keys(entries.len(), self.bloom_bits_per_key, self.bloom_hash_count);
        let mut sparse_index = SparseIndex::new();

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        let mut writer = BufWriter::new(file);

        let mut offset: u64 = 0;
        for (i, (key, value)) in entries.iter().enumerate() {
            // Offset BEFORE this entry's bytes
            if i % self.sparse_index_gap == 0 {
                sparse_index.push(key.to_vec(), offset);
            }
            bloom.add(key);

            let record = codec::encode_parts(key, value);
            writer.write_all(&record)?;
            offset += record.len() as u64;
        }

        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;

        let mut filter_file = File::create(&filter_path)?;
        filter_file.write_all(&bloom.to_bytes())?;
        filter_file.sync_all()?;

        sync_dir(&self.dir)?;

        debug!(
            seq = id.seq,
            entries = entries.len(),
            bytes = offset,
            path = %path.display(),
            "SSTable written"
        );

        Ok(Some(FlushedTable {
            id,
            path,
            filter_path,
            sparse_index,
            bloom,
            entry_count: entries.len() as u64,
            file_size: offset,
        }))
    }
}
