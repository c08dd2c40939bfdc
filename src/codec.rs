//! Entry codec
//!
//! Encoding and decoding of a single key-value record. The same frame is
//! used by the WAL and by SSTable data files, so sparse-index offsets and
//! WAL replay agree byte-for-byte on where a record starts and ends.
//!
//! ## Record Format
//! ```text
//! ┌──────────┬─────────────┬─────────────┬───────────┬─────────────┐
//! │ CRC (4)  │ KeyLen (4)  │ ValLen (4)  │ Key (var) │ Value (var) │
//! └──────────┴─────────────┴─────────────┴───────────┴─────────────┘
//! ```
//!
//! All integers are little-endian. The CRC32 covers both length fields and
//! both payloads. Decoding never fails with an error: a record whose
//! checksum does not match is reported as [`Frame::Corrupt`] (its extent is
//! still known, so scanning can continue past it) and a record cut short by
//! the end of the input is reported as [`Frame::Truncated`].

use std::io::{self, Read};

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{LsmError, Result};

/// Header size: CRC (4) + KeyLen (4) + ValLen (4) = 12 bytes
pub const HEADER_SIZE: usize = 12;

/// Largest key or value a u32 length field can describe
pub const MAX_FIELD_LEN: usize = u32::MAX as usize;

// =============================================================================
// Entry
// =============================================================================

/// A single key-value record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl Entry {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Live footprint as counted by the MemTable: `len(key) + len(value)`
    pub fn footprint(&self) -> usize {
        self.key.len() + self.value.len()
    }
}

/// Outcome of decoding one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A well-formed record and the number of bytes it occupies
    Entry(Entry, usize),

    /// A complete record whose checksum does not match; skip `usize` bytes
    Corrupt(usize),

    /// Not enough bytes left for a whole record (partial write at the tail)
    Truncated,
}

// =============================================================================
// Encoding
// =============================================================================

/// Reject keys or values whose length does not fit the header fields
pub fn check_lengths(key_len: usize, value_len: usize) -> Result<()> {
    if key_len > MAX_FIELD_LEN || value_len > MAX_FIELD_LEN {
        return Err(LsmError::EntryTooLarge { key_len, value_len });
    }
    Ok(())
}

/// Encode an entry into a self-delimited record
///
/// Lengths must already have passed [`check_lengths`].
pub fn encode(entry: &Entry) -> Vec<u8> {
    encode_parts(&entry.key, &entry.value)
}

/// Encode a key and value without building an [`Entry`] first
pub fn encode_parts(key: &[u8], value: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(encoded_len(key, value));

    // Reserve space for CRC (filled once the rest is in place)
    buf.put_u32_le(0);
    buf.put_u32_le(key.len() as u32);
    buf.put_u32_le(value.len() as u32);
    buf.put_slice(key);
    buf.put_slice(value);

    let crc = crc32fast::hash(&buf[4..]);
    buf[0..4].copy_from_slice(&crc.to_le_bytes());

    buf.to_vec()
}

/// Number of bytes a record for this key and value occupies on disk
pub fn encoded_len(key: &[u8], value: &[u8]) -> usize {
    HEADER_SIZE + key.len() + value.len()
}

/// Exact on-disk extent of an encoded record, read from its header
///
/// Returns `None` when the input is too short to hold a header.
pub fn byte_length(encoded: &[u8]) -> Option<usize> {
    if encoded.len() < HEADER_SIZE {
        return None;
    }
    let mut header = &encoded[4..HEADER_SIZE];
    let key_len = header.get_u32_le() as usize;
    let value_len = header.get_u32_le() as usize;
    Some(HEADER_SIZE + key_len + value_len)
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode the record at the start of `bytes`, if it is whole and intact
pub fn decode(bytes: &[u8]) -> Option<Entry> {
    match decode_frame(bytes) {
        Frame::Entry(entry, _) => Some(entry),
        Frame::Corrupt(_) | Frame::Truncated => None,
    }
}

/// Decode the record at the start of `bytes`, reporting its extent
pub fn decode_frame(bytes: &[u8]) -> Frame {
    let total = match byte_length(bytes) {
        Some(total) if total <= bytes.len() => total,
        _ => return Frame::Truncated,
    };

    let mut header = &bytes[..HEADER_SIZE];
    let crc = header.get_u32_le();
    let key_len = header.get_u32_le() as usize;

    if crc32fast::hash(&bytes[4..total]) != crc {
        return Frame::Corrupt(total);
    }

    let payload = &bytes[HEADER_SIZE..total];
    let (key, value) = payload.split_at(key_len);
    Frame::Entry(Entry::new(key, value), total)
}

/// Read the next record from a stream
///
/// Returns `Ok(None)` on a clean end of stream. Only genuine I/O failures
/// surface as errors; short reads become [`Frame::Truncated`].
pub fn read_frame<R: Read>(reader: &mut R) -> io::Result<Option<Frame>> {
    let mut header = [0u8; HEADER_SIZE];
    let filled = read_up_to(reader, &mut header)?;
    if filled == 0 {
        return Ok(None);
    }
    if filled < HEADER_SIZE {
        return Ok(Some(Frame::Truncated));
    }

    let mut fields = &header[..];
    let crc = fields.get_u32_le();
    let key_len = fields.get_u32_le() as usize;
    let value_len = fields.get_u32_le() as usize;
    let payload_len = key_len + value_len;

    // `take` keeps a corrupted length field from forcing a huge allocation
    let mut payload = Vec::new();
    reader
        .by_ref()
        .take(payload_len as u64)
        .read_to_end(&mut payload)?;
    if payload.len() < payload_len {
        return Ok(Some(Frame::Truncated));
    }

    let total = HEADER_SIZE + payload_len;
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&header[4..]);
    hasher.update(&payload);
    if hasher.finalize() != crc {
        return Ok(Some(Frame::Corrupt(total)));
    }

    let value = payload.split_off(key_len);
    Ok(Some(Frame::Entry(Entry { key: payload, value }, total)))
}

/// Fill `buf` as far as the stream allows, returning the number of bytes read
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
