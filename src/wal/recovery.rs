//! WAL Recovery
//!
//! Handles crash recovery by replaying the WAL.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use tracing::{info, warn};

use crate::codec::{self, Entry, Frame};
use crate::error::Result;

use super::WalReader;

/// Handles WAL recovery after crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Number of corrupted records skipped
    pub entries_corrupted: u64,

    /// Bytes of partially written record found at the tail
    pub truncated_bytes: u64,

    /// Whether the WAL was truncated (partial writes removed)
    pub was_truncated: bool,
}

impl WalRecovery {
    /// Recover entries from a WAL file
    ///
    /// This will:
    /// 1. Read all valid entries
    /// 2. Skip records whose checksum does not match
    /// 3. Jump over a damaged header whose length runs past EOF when an
    ///    intact record follows it
    /// 4. Cut a partially written record off the end, so that later appends
    ///    are not glued onto its garbage header
    /// 5. Return all valid entries in order
    pub fn recover(path: &Path) -> Result<(Vec<Entry>, RecoveryResult)> {
        let (entries, mut result, valid_len) = Self::scan(path)?;

        if result.truncated_bytes > 0 {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(valid_len)?;
            file.sync_all()?;
            result.was_truncated = true;
            warn!(
                path = %path.display(),
                bytes = result.truncated_bytes,
                "Removed torn record from WAL tail"
            );
        }

        if result.entries_recovered > 0 || result.entries_corrupted > 0 {
            info!(
                recovered = result.entries_recovered,
                corrupted = result.entries_corrupted,
                "WAL recovery complete"
            );
        }

        Ok((entries, result))
    }

    /// Verify integrity of a WAL file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        let (_, result, _) = Self::scan(path)?;
        Ok(result)
    }

    fn scan(path: &Path) -> Result<(Vec<Entry>, RecoveryResult, u64)> {
        if !path.exists() {
            return Ok((Vec::new(), RecoveryResult::default(), 0));
        }

        let file_len = path.metadata()?.len();
        let mut reader = WalReader::open(path)?;
        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry()? {
            entries.push(entry);
        }

        let mut valid_len = reader.valid_len();
        let mut corrupted = reader.records_skipped();

        // A frame that runs past EOF is either a torn final write or a length
        // field damaged mid-log. Only the first may be cut off.
        if valid_len < file_len {
            let mut tail = Vec::new();
            let mut file = File::open(path)?;
            file.seek(SeekFrom::Start(valid_len))?;
            file.read_to_end(&mut tail)?;

            let resync = resync_tail(&tail, &mut entries);
            if resync.regions_skipped > 0 {
                warn!(
                    path = %path.display(),
                    offset = valid_len,
                    regions = resync.regions_skipped,
                    "Resynchronized WAL past damaged record headers"
                );
            }
            valid_len += resync.consumed as u64;
            corrupted += resync.regions_skipped + resync.records_skipped;
        }

        let result = RecoveryResult {
            entries_recovered: entries.len() as u64,
            entries_corrupted: corrupted,
            truncated_bytes: file_len - valid_len,
            was_truncated: false,
        };
        Ok((entries, result, valid_len))
    }
}

struct Resync {
    /// Bytes of the tail up to the end of the last complete record found
    consumed: usize,
    /// Unreadable stretches jumped over to reach an intact record
    regions_skipped: u64,
    /// Complete records with a bad checksum found after a jump
    records_skipped: u64,
}

/// Look for intact records after a frame that claimed to run past EOF
///
/// `tail` starts at that frame. Every intact record found is appended to
/// `entries`; anything after the last one is a genuine torn tail.
fn resync_tail(tail: &[u8], entries: &mut Vec<Entry>) -> Resync {
    let mut resync = Resync {
        consumed: 0,
        regions_skipped: 0,
        records_skipped: 0,
    };
    let mut pos = 0;

    while pos < tail.len() {
        let Some(skip) = next_intact_frame(&tail[pos + 1..]) else {
            break;
        };
        pos += 1 + skip;
        resync.regions_skipped += 1;

        loop {
            match codec::decode_frame(&tail[pos..]) {
                Frame::Entry(entry, len) => {
                    entries.push(entry);
                    pos += len;
                    resync.consumed = pos;
                }
                Frame::Corrupt(len) => {
                    resync.records_skipped += 1;
                    pos += len;
                    resync.consumed = pos;
                }
                Frame::Truncated => break,
            }
        }
    }

    resync
}

/// Offset of the first position in `bytes` holding a checksum-valid record
fn next_intact_frame(bytes: &[u8]) -> Option<usize> {
    (0..bytes.len()).find(|&i| matches!(codec::decode_frame(&bytes[i..]), Frame::Entry(..)))
}
