//! WAL Reader
//!
//! Handles reading entries from the WAL file.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tracing::warn;

use crate::codec::{self, Entry, Frame};
use crate::error::Result;

/// Reads entries from the WAL file in append order
///
/// Records with a bad checksum are skipped; a record cut short by the end
/// of the file ends the stream.
pub struct WalReader {
    reader: BufReader<File>,
    /// Bytes consumed so far
    offset: u64,
    /// End of the last complete record (intact or skipped)
    valid_len: u64,
    records_skipped: u64,
    hit_torn_tail: bool,
    done: bool,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            offset: 0,
            valid_len: 0,
            records_skipped: 0,
            hit_torn_tail: false,
            done: false,
        })
    }

    /// Decode every well-formed record; a missing file reads as empty
    pub fn read_all(path: &Path) -> Result<Vec<Entry>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        Self::open(path)?.collect()
    }

    /// Read the next entry from the WAL
    pub fn next_entry(&mut self) -> Result<Option<Entry>> {
        while !self.done {
            match codec::read_frame(&mut self.reader)? {
                None => self.done = true,
                Some(Frame::Entry(entry, len)) => {
                    self.offset += len as u64;
                    self.valid_len = self.offset;
                    return Ok(Some(entry));
                }
                Some(Frame::Corrupt(len)) => {
                    warn!(offset = self.offset, len, "Skipping corrupt WAL record");
                    self.offset += len as u64;
                    self.valid_len = self.offset;
                    self.records_skipped += 1;
                }
                Some(Frame::Truncated) => {
                    self.hit_torn_tail = true;
                    self.done = true;
                }
            }
        }
        Ok(None)
    }

    /// Records skipped because of a checksum mismatch
    pub fn records_skipped(&self) -> u64 {
        self.records_skipped
    }

    /// Length of the prefix made of complete records
    pub fn valid_len(&self) -> u64 {
        self.valid_len
    }

    /// Whether reading stopped at a partially written record
    pub fn hit_torn_tail(&self) -> bool {
        self.hit_torn_tail
    }
}

impl Iterator for WalReader {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().transpose()
    }
}
