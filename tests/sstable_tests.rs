//! SSTable Tests
//!
//! Tests verify:
//! - Builder writes a data file and a bloom sidecar
//! - Empty and unsorted input leave the directory untouched
//! - Sparse index sampling, and that open rebuilds the same index
//! - Lookups through the bloom filter and the sparse index
//! - Iteration and file name validation

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use lsmlite::bloom::BloomFilter;
use lsmlite::codec;
use lsmlite::storage::{SSTable, SSTableBuilder, TableId};
use lsmlite::LsmError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn sorted_entries(count: usize) -> Vec<(Vec<u8>, Vec<u8>)> {
    (0..count)
        .map(|i| {
            (
                format!("key{:03}", i).into_bytes(),
                format!("value{}", i).into_bytes(),
            )
        })
        .collect()
}

fn as_refs(entries: &[(Vec<u8>, Vec<u8>)]) -> impl Iterator<Item = (&[u8], &[u8])> {
    entries.iter().map(|(k, v)| (k.as_slice(), v.as_slice()))
}

fn kv<'a>(key: &'a str, value: &'a str) -> (&'a [u8], &'a [u8]) {
    (key.as_bytes(), value.as_bytes())
}

fn dir_entries(dir: &Path) -> usize {
    fs::read_dir(dir).unwrap().count()
}

// =============================================================================
// Builder Tests
// =============================================================================

#[test]
fn test_flush_writes_data_and_filter() {
    let temp = TempDir::new().unwrap();
    let builder = SSTableBuilder::new(temp.path(), 5);
    let entries = sorted_entries(10);

    let flushed = builder.flush(as_refs(&entries)).unwrap().unwrap();

    assert!(flushed.path.exists());
    assert!(flushed.filter_path.exists());
    assert_eq!(flushed.entry_count, 10);
    assert_eq!(fs::metadata(&flushed.path).unwrap().len(), flushed.file_size);

    let expected: u64 = entries
        .iter()
        .map(|(k, v)| codec::encoded_len(k, v) as u64)
        .sum();
    assert_eq!(flushed.file_size, expected);
}

#[test]
fn test_flush_names_follow_sequence() {
    let temp = TempDir::new().unwrap();
    let builder = SSTableBuilder::new(temp.path(), 5).with_next_seq(7);
    let entries = sorted_entries(1);

    let first = builder.flush(as_refs(&entries)).unwrap().unwrap();
    let second = builder.flush(as_refs(&entries)).unwrap().unwrap();

    assert_eq!(first.id.seq, 7);
    assert_eq!(second.id.seq, 8);
    assert_eq!(TableId::parse(&first.path), Some(first.id));
    assert_eq!(builder.next_seq(), 9);
}

#[test]
fn test_flush_empty_input_creates_nothing() {
    let temp = TempDir::new().unwrap();
    let builder = SSTableBuilder::new(temp.path(), 5);

    let result = builder.flush(std::iter::empty()).unwrap();

    assert!(result.is_none());
    assert_eq!(dir_entries(temp.path()), 0);
}

#[test]
fn test_flush_rejects_unsorted_input() {
    let temp = TempDir::new().unwrap();
    let builder = SSTableBuilder::new(temp.path(), 5);
    let entries = vec![kv("b", "1"), kv("a", "2")];

    let result = builder.flush(entries);

    match result {
        Err(LsmError::UnsortedInput { previous, current }) => {
            assert_eq!(previous, b"b".to_vec());
            assert_eq!(current, b"a".to_vec());
        }
        other => panic!("expected UnsortedInput, got {:?}", other),
    }
    assert_eq!(dir_entries(temp.path()), 0);
}

#[test]
fn test_flush_rejects_duplicate_keys() {
    let temp = TempDir::new().unwrap();
    let builder = SSTableBuilder::new(temp.path(), 5);
    let entries = vec![kv("a", "1"), kv("a", "2")];

    assert!(matches!(
        builder.flush(entries),
        Err(LsmError::UnsortedInput { .. })
    ));
    assert_eq!(dir_entries(temp.path()), 0);
}

// =============================================================================
// Sparse Index Tests
// =============================================================================

#[test]
fn test_sparse_index_samples_every_nth_record() {
    let temp = TempDir::new().unwrap();
    let builder = SSTableBuilder::new(temp.path(), 5);
    let entries = sorted_entries(12);

    let flushed = builder.flush(as_refs(&entries)).unwrap().unwrap();

    let samples: Vec<(Vec<u8>, u64)> = flushed
        .sparse_index
        .iter()
        .map(|(k, off)| (k.to_vec(), off))
        .collect();
    let record_len = codec::encoded_len(&entries[0].0, &entries[0].1) as u64;
    assert_eq!(
        samples,
        vec![
            (b"key000".to_vec(), 0),
            (b"key005".to_vec(), 5 * record_len),
            (b"key010".to_vec(), 10 * record_len),
        ]
    );
}

#[test]
fn test_open_rebuilds_same_index() {
    let temp = TempDir::new().unwrap();
    let builder = SSTableBuilder::new(temp.path(), 3);
    let entries = sorted_entries(20);

    let flushed = builder.flush(as_refs(&entries)).unwrap().unwrap();
    let table = SSTable::open(&flushed.path, 3).unwrap();

    assert_eq!(table.sparse_index(), &flushed.sparse_index);
    assert_eq!(table.entry_count(), 20);
    assert_eq!(table.id(), flushed.id);
    assert!(table.has_filter());
}

// =============================================================================
// Lookup Tests
// =============================================================================

#[test]
fn test_get_every_key_and_misses() {
    let temp = TempDir::new().unwrap();
    let builder = SSTableBuilder::new(temp.path(), 5);
    let entries = sorted_entries(37);

    let table = builder.flush(as_refs(&entries)).unwrap().unwrap().into_table();

    for (key, value) in &entries {
        assert_eq!(table.get(key).unwrap(), Some(value.clone()));
    }
    assert_eq!(table.get(b"key").unwrap(), None);
    assert_eq!(table.get(b"key0005").unwrap(), None);
    assert_eq!(table.get(b"zzz").unwrap(), None);
}

#[test]
fn test_filter_answers_without_touching_data_file() {
    let temp = TempDir::new().unwrap();
    let builder = SSTableBuilder::new(temp.path(), 5);
    let entries = sorted_entries(10);

    let table = builder.flush(as_refs(&entries)).unwrap().unwrap().into_table();

    // Rebuild the same filter to find a key it rejects
    let mut bloom = BloomFilter::for_keys(entries.len(), 10, 3);
    for (key, _) in &entries {
        bloom.add(key);
    }
    let absent = (0..1000)
        .map(|i| format!("missing{}", i).into_bytes())
        .find(|k| !bloom.might_contain(k))
        .unwrap();

    fs::remove_file(table.path()).unwrap();

    assert_eq!(table.get(&absent).unwrap(), None);
    assert!(table.get(b"key001").is_err());
}

#[test]
fn test_missing_filter_still_serves_reads() {
    let temp = TempDir::new().unwrap();
    let builder = SSTableBuilder::new(temp.path(), 5);
    let entries = sorted_entries(8);

    let flushed = builder.flush(as_refs(&entries)).unwrap().unwrap();
    fs::remove_file(&flushed.filter_path).unwrap();
    let table = SSTable::open(&flushed.path, 5).unwrap();

    assert!(!table.has_filter());
    assert_eq!(table.get(b"key007").unwrap(), Some(b"value7".to_vec()));
    assert_eq!(table.get(b"nope").unwrap(), None);
}

#[test]
fn test_corrupt_filter_is_ignored() {
    let temp = TempDir::new().unwrap();
    let builder = SSTableBuilder::new(temp.path(), 5);
    let entries = sorted_entries(4);

    let flushed = builder.flush(as_refs(&entries)).unwrap().unwrap();
    fs::write(&flushed.filter_path, [1, 2, 3]).unwrap();
    let table = SSTable::open(&flushed.path, 5).unwrap();

    assert!(!table.has_filter());
    assert_eq!(table.get(b"key002").unwrap(), Some(b"value2".to_vec()));
}

#[test]
fn test_scan_stops_at_first_greater_key() {
    let temp = TempDir::new().unwrap();
    let builder = SSTableBuilder::new(temp.path(), 5);
    let entries = vec![kv("apple", "1"), kv("cat", "2")];

    let flushed = builder.flush(entries).unwrap().unwrap();
    fs::remove_file(&flushed.filter_path).unwrap();

    // Out-of-order record after "cat": only reachable by a scan that
    // ignores ordering
    let mut file = OpenOptions::new().append(true).open(&flushed.path).unwrap();
    file.write_all(&codec::encode_parts(b"banana", b"3")).unwrap();
    drop(file);

    let table = SSTable::open(&flushed.path, 5).unwrap();

    assert_eq!(table.get(b"banana").unwrap(), None);
    assert_eq!(table.get(b"cat").unwrap(), Some(b"2".to_vec()));
}

// =============================================================================
// Iterator / Open Tests
// =============================================================================

#[test]
fn test_iter_yields_all_entries_in_order() {
    let temp = TempDir::new().unwrap();
    let builder = SSTableBuilder::new(temp.path(), 5);
    let entries = sorted_entries(13);

    let table = builder.flush(as_refs(&entries)).unwrap().unwrap().into_table();
    let read: Vec<(Vec<u8>, Vec<u8>)> = table
        .iter()
        .unwrap()
        .map(|e| {
            let e = e.unwrap();
            (e.key, e.value)
        })
        .collect();

    assert_eq!(read, entries);
}

#[test]
fn test_iter_stops_at_partial_tail() {
    let temp = TempDir::new().unwrap();
    let builder = SSTableBuilder::new(temp.path(), 5);
    let entries = sorted_entries(3);

    let flushed = builder.flush(as_refs(&entries)).unwrap().unwrap();
    let mut file = OpenOptions::new().append(true).open(&flushed.path).unwrap();
    file.write_all(&[0xAA; 5]).unwrap();
    drop(file);

    let table = SSTable::open(&flushed.path, 5).unwrap();

    assert_eq!(table.entry_count(), 3);
    assert_eq!(table.iter().unwrap().count(), 3);
}

#[test]
fn test_open_rejects_foreign_file_name() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("data.db");
    fs::write(&path, b"").unwrap();

    assert!(matches!(
        SSTable::open(&path, 5),
        Err(LsmError::InvalidTableName(_))
    ));
}

#[test]
fn test_open_tolerates_out_of_order_records() {
    let temp = TempDir::new().unwrap();
    let builder = SSTableBuilder::new(temp.path(), 1);
    let entries = vec![kv("a", "1"), kv("c", "3")];

    let flushed = builder.flush(entries).unwrap().unwrap();
    let mut file = OpenOptions::new().append(true).open(&flushed.path).unwrap();
    file.write_all(&codec::encode_parts(b"b", b"2")).unwrap();
    drop(file);

    let table = SSTable::open(&flushed.path, 1).unwrap();

    assert_eq!(table.entry_count(), 3);
    assert_eq!(table.sparse_index().len(), 2);
    assert_eq!(table.get(b"c").unwrap(), Some(b"3".to_vec()));
}
