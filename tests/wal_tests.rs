//! Tests for the WAL writer, reader and recovery
//!
//! These tests verify:
//! - Appended entries read back in order
//! - Replay tolerates a torn tail and skips corrupt records
//! - Recovery cuts the torn tail so later appends stay readable
//! - Clear empties the log
//! - Sync strategies track pending entries

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use lsmlite::codec::{self, Entry};
use lsmlite::config::WalSyncStrategy;
use lsmlite::wal::{WalReader, WalRecovery, WalWriter};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("wal.log");
    (temp_dir, wal_path)
}

fn entry(i: usize) -> Entry {
    Entry::new(format!("key{}", i).into_bytes(), format!("value{}", i).into_bytes())
}

/// Write entries using WalWriter (produces a well-formed WAL)
fn write_entries_via_writer(path: &PathBuf, count: usize) {
    let mut writer = WalWriter::open(path, WalSyncStrategy::EveryWrite).unwrap();
    for i in 0..count {
        writer.append(&entry(i)).unwrap();
    }
}

fn append_raw(path: &PathBuf, bytes: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(bytes).unwrap();
}

// =============================================================================
// Writer / Reader Tests
// =============================================================================

#[test]
fn test_append_and_read_all() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 5);

    let entries = WalReader::read_all(&wal_path).unwrap();

    assert_eq!(entries, (0..5).map(entry).collect::<Vec<_>>());
}

#[test]
fn test_read_all_missing_file_is_empty() {
    let (_temp, wal_path) = setup_temp_wal();

    assert!(WalReader::read_all(&wal_path).unwrap().is_empty());
}

#[test]
fn test_writer_tracks_length() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::OsBuffered).unwrap();

    writer.append(&entry(0)).unwrap();

    let expected = codec::encode(&entry(0)).len() as u64;
    assert_eq!(writer.len(), expected);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), expected);
}

#[test]
fn test_reopen_appends_after_existing_records() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 2);

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    writer.append(&entry(2)).unwrap();

    assert_eq!(WalReader::read_all(&wal_path).unwrap().len(), 3);
}

#[test]
fn test_clear_empties_log() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    writer.append(&entry(0)).unwrap();
    writer.append(&entry(1)).unwrap();

    writer.clear().unwrap();

    assert!(writer.is_empty());
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), 0);

    // Log stays usable after clearing
    writer.append(&entry(7)).unwrap();
    assert_eq!(WalReader::read_all(&wal_path).unwrap(), vec![entry(7)]);
}

// =============================================================================
// Sync Strategy Tests
// =============================================================================

#[test]
fn test_every_write_syncs_immediately() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();

    writer.append(&entry(0)).unwrap();

    assert_eq!(writer.entries_since_sync(), 0);
}

#[test]
fn test_every_n_entries_batches_syncs() {
    let (_temp, wal_path) = setup_temp_wal();
    let strategy = WalSyncStrategy::EveryNEntries { count: 3 };
    let mut writer = WalWriter::open(&wal_path, strategy).unwrap();

    writer.append(&entry(0)).unwrap();
    writer.append(&entry(1)).unwrap();
    assert_eq!(writer.entries_since_sync(), 2);

    writer.append(&entry(2)).unwrap();
    assert_eq!(writer.entries_since_sync(), 0);
}

#[test]
fn test_os_buffered_still_reaches_file() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::OsBuffered).unwrap();

    writer.append(&entry(0)).unwrap();

    assert_eq!(writer.entries_since_sync(), 1);
    // Visible to another reader without an explicit sync
    assert_eq!(WalReader::read_all(&wal_path).unwrap(), vec![entry(0)]);
}

// =============================================================================
// Recovery Tests
// =============================================================================

#[test]
fn test_recover_empty_file() {
    let (_temp, wal_path) = setup_temp_wal();
    fs::File::create(&wal_path).unwrap();

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert!(entries.is_empty());
    assert_eq!(result.entries_recovered, 0);
    assert!(!result.was_truncated);
}

#[test]
fn test_recover_torn_tail() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 3);
    let clean_len = fs::metadata(&wal_path).unwrap().len();

    let torn = codec::encode(&entry(3));
    append_raw(&wal_path, &torn[..torn.len() / 2]);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 3);
    assert_eq!(result.truncated_bytes, (torn.len() / 2) as u64);
    assert!(result.was_truncated);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), clean_len);
}

#[test]
fn test_appends_after_recovery_are_readable() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 2);
    append_raw(&wal_path, &[0xAB; 7]);

    WalRecovery::recover(&wal_path).unwrap();
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    writer.append(&entry(9)).unwrap();

    let entries = WalReader::read_all(&wal_path).unwrap();
    assert_eq!(entries, vec![entry(0), entry(1), entry(9)]);
}

#[test]
fn test_recover_skips_corrupt_record() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut bad = codec::encode(&entry(1));
    let last = bad.len() - 1;
    bad[last] ^= 0xff;

    fs::write(&wal_path, codec::encode(&entry(0))).unwrap();
    append_raw(&wal_path, &bad);
    append_raw(&wal_path, &codec::encode(&entry(2)));

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries, vec![entry(0), entry(2)]);
    assert_eq!(result.entries_corrupted, 1);
    assert!(!result.was_truncated);
}

#[test]
fn test_recover_resyncs_past_damaged_length() {
    let (_temp, wal_path) = setup_temp_wal();

    // key_len of the middle record now points far past EOF
    let mut bad = codec::encode(&entry(1));
    bad[4..8].copy_from_slice(&u32::MAX.to_le_bytes());

    fs::write(&wal_path, codec::encode(&entry(0))).unwrap();
    append_raw(&wal_path, &bad);
    append_raw(&wal_path, &codec::encode(&entry(2)));
    let len_before = fs::metadata(&wal_path).unwrap().len();

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries, vec![entry(0), entry(2)]);
    assert_eq!(result.entries_corrupted, 1);
    assert_eq!(result.truncated_bytes, 0);
    assert!(!result.was_truncated);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), len_before);
}

#[test]
fn test_recover_resync_still_cuts_torn_tail() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut bad = codec::encode(&entry(1));
    bad[8..12].copy_from_slice(&u32::MAX.to_le_bytes());
    let torn = codec::encode(&entry(3));

    fs::write(&wal_path, &bad).unwrap();
    append_raw(&wal_path, &codec::encode(&entry(2)));
    append_raw(&wal_path, &torn[..torn.len() - 3]);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries, vec![entry(2)]);
    assert_eq!(result.truncated_bytes, (torn.len() - 3) as u64);
    assert!(result.was_truncated);
    assert_eq!(
        fs::metadata(&wal_path).unwrap().len(),
        (bad.len() + codec::encode(&entry(2)).len()) as u64
    );
}

#[test]
fn test_verify_does_not_modify() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 2);
    append_raw(&wal_path, &[1, 2, 3]);
    let len_before = fs::metadata(&wal_path).unwrap().len();

    let result = WalRecovery::verify(&wal_path).unwrap();

    assert_eq!(result.entries_recovered, 2);
    assert_eq!(result.truncated_bytes, 3);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), len_before);
}

#[test]
fn test_replay_reproduces_last_write_wins() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    writer.append(&Entry::new(b"k".to_vec(), b"v1".to_vec())).unwrap();
    writer.append(&Entry::new(b"k".to_vec(), b"v2".to_vec())).unwrap();

    let mut memtable = lsmlite::memtable::MemTable::new();
    for e in WalReader::read_all(&wal_path).unwrap() {
        memtable.put(e.key, e.value);
    }

    assert_eq!(memtable.get(b"k"), Some(&b"v2"[..]));
    assert_eq!(memtable.len(), 1);
}
