//! SSTable Reader
//!
//! Opens SSTable files and answers point lookups through the bloom filter
//! and the sparse index.

use std::cmp::Ordering;
use std::fs::{self, File};
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::bloom::BloomFilter;
use crate::codec::{self, Frame};
use crate::error::{LsmError, Result};

use super::iterator::SSTableIterator;
use super::{SparseIndex, TableId, FILTER_EXTENSION};

/// Reader for one immutable SSTable
///
/// Holds only the in-memory sparse index and bloom filter; every lookup
/// opens its own file handle, so `get` takes `&self` and readers never
/// contend on a shared seek position.
#[derive(Debug)]
pub struct SSTable {
    id: TableId,
    path: PathBuf,
    sparse_index: SparseIndex,
    bloom: Option<BloomFilter>,
    entry_count: u64,
    file_size: u64,
}

impl SSTable {
    /// Open an existing SSTable
    ///
    /// Scans the data file once to rebuild the sparse index, then tries the
    /// `.filter` sidecar. A missing or unreadable sidecar is not an error:
    /// lookups simply go to disk every time.
    pub fn open(path: &Path, sparse_index_gap: usize) -> Result<Self> {
        let id = TableId::parse(path)
            .ok_or_else(|| LsmError::InvalidTableName(path.to_path_buf()))?;
        let gap = sparse_index_gap.max(1);

        let file = File::open(path)?;
        let file_size = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        let mut sparse_index = SparseIndex::new();
        let mut entry_count: u64 = 0;
        let mut offset: u64 = 0;

        while let Some(frame) = codec::read_frame(&mut reader)? {
            match frame {
                Frame::Entry(entry, len) => {
                    if entry_count % gap as u64 == 0 && !sparse_index.push(entry.key, offset) {
                        warn!(path = %path.display(), offset, "Out-of-order key in SSTable, not indexed");
                    }
                    entry_count += 1;
                    offset += len as u64;
                }
                Frame::Corrupt(len) => {
                    warn!(path = %path.display(), offset, "Skipping corrupt SSTable record");
                    offset += len as u64;
                }
                Frame::Truncated => {
                    warn!(path = %path.display(), offset, "SSTable ends in a partial record");
                    break;
                }
            }
        }

        let bloom = Self::load_filter(&path.with_extension(FILTER_EXTENSION));

        debug!(
            seq = id.seq,
            entries = entry_count,
            samples = sparse_index.len(),
            filter = bloom.is_some(),
            "SSTable opened"
        );

        Ok(Self::from_parts(id, path.to_path_buf(), sparse_index, bloom, entry_count, file_size))
    }

    pub(crate) fn from_parts(
        id: TableId,
        path: PathBuf,
        sparse_index: SparseIndex,
        bloom: Option<BloomFilter>,
        entry_count: u64,
        file_size: u64,
    ) -> Self {
        Self {
            id,
            path,
            sparse_index,
            bloom,
            entry_count,
            file_size,
        }
    }

    fn load_filter(filter_path: &Path) -> Option<BloomFilter> {
        if !filter_path.exists() {
            return None;
        }
        match fs::read(filter_path).map_err(LsmError::from).and_then(|b| BloomFilter::from_bytes(&b)) {
            Ok(bloom) => Some(bloom),
            Err(e) => {
                warn!(path = %filter_path.display(), error = %e, "Ignoring unreadable bloom filter");
                None
            }
        }
    }

    /// Point lookup
    ///
    /// 1. Bloom filter says absent → done, no disk I/O
    /// 2. Sparse index gives the offset of the greatest sampled key ≤ `key`
    /// 3. Scan forward: equal → found, greater → absent (keys are sorted)
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(bloom) = &self.bloom {
            if !bloom.might_contain(key) {
                return Ok(None);
            }
        }

        let start = self.sparse_index.seek_offset(key);
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(start))?;
        let mut reader = BufReader::new(file);

        while let Some(frame) = codec::read_frame(&mut reader)? {
            match frame {
                Frame::Entry(entry, _) => match entry.key.as_slice().cmp(key) {
                    Ordering::Equal => return Ok(Some(entry.value)),
                    Ordering::Greater => return Ok(None),
                    Ordering::Less => {}
                },
                Frame::Corrupt(_) => {}
                Frame::Truncated => break,
            }
        }

        Ok(None)
    }

    /// Create an iterator over all entries (for compaction, debugging)
    pub fn iter(&self) -> Result<SSTableIterator> {
        SSTableIterator::open(&self.path)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> TableId {
        self.id
    }

    /// Path of the data file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path where this table's bloom sidecar lives (whether or not it exists)
    pub fn filter_path(&self) -> PathBuf {
        self.path.with_extension(FILTER_EXTENSION)
    }

    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn has_filter(&self) -> bool {
        self.bloom.is_some()
    }

    pub fn sparse_index(&self) -> &SparseIndex {
        &self.sparse_index
    }
}
