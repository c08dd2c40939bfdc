//! SSTable Iterator
//!
//! Sequential iteration over all entries in an SSTable.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tracing::warn;

use crate::codec::{self, Entry, Frame};
use crate::error::Result;

/// Iterator over SSTable entries in sorted key order
///
/// Corrupt records are skipped; a partial trailing record ends iteration.
pub struct SSTableIterator {
    reader: BufReader<File>,
    /// Current position in file
    offset: u64,
    done: bool,
}

impl SSTableIterator {
    pub(super) fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            reader: BufReader::new(File::open(path)?),
            offset: 0,
            done: false,
        })
    }
}

impl Iterator for SSTableIterator {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            match codec::read_frame(&mut self.reader) {
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
                Ok(None) | Ok(Some(Frame::Truncated)) => self.done = true,
                Ok(Some(Frame::Corrupt(len))) => {
                    warn!(offset = self.offset, len, "Skipping corrupt SSTable record");
                    self.offset += len as u64;
                }
                Ok(Some(Frame::Entry(entry, len))) => {
                    self.offset += len as u64;
                    return Some(Ok(entry));
                }
            }
        }
        None
    }
}
