//! Bloom Filter
//!
//! Probabilistic set membership attached to every SSTable.
//!
//! - If any probed bit is 0 → key is DEFINITELY NOT in the table
//! - If all probed bits are 1 → key is PROBABLY in the table
//!
//! Probe `i` (for `i` in `0..k`) is `xxh3_64_with_seed(key, i) % m`: a seeded
//! hash family, so the `k` positions are independent even for short keys
//! that differ in a single byte.
//!
//! ## Sidecar Format
//! ```text
//! ┌───────────────┬───────────────┬──────────────────────────┐
//! │ NumBits: u32  │ NumHashes: u32│ Bit array (ceil(m/8) B)  │
//! └───────────────┴───────────────┴──────────────────────────┘
//! ```
//! Bit `n` lives in byte `n / 8` at position `n % 8` (LSB first).

use bytes::{Buf, BufMut};
use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::error::{LsmError, Result};

/// Serialized header: NumBits (4) + NumHashes (4)
const HEADER_SIZE: usize = 8;

/// Floor on filter size so tiny tables still get a useful filter
const MIN_BITS: usize = 64;

/// Fixed-size bit array probed by `k` seeded hashes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloomFilter {
    bits: Vec<u8>,
    num_bits: u32,
    num_hashes: u32,
}

impl BloomFilter {
    /// Create an empty filter with `num_bits` bits and `num_hashes` probes.
    ///
    /// # Panics
    /// Panics if either argument is 0.
    pub fn new(num_bits: u32, num_hashes: u32) -> Self {
        assert!(num_bits > 0, "num_bits must be > 0");
        assert!(num_hashes > 0, "num_hashes must be > 0");

        Self {
            bits: vec![0u8; (num_bits as usize).div_ceil(8)],
            num_bits,
            num_hashes,
        }
    }

    /// Size a filter for `key_count` keys at `bits_per_key` bits each
    pub fn for_keys(key_count: usize, bits_per_key: usize, num_hashes: u32) -> Self {
        let num_bits = key_count
            .saturating_mul(bits_per_key)
            .clamp(MIN_BITS, u32::MAX as usize);
        Self::new(num_bits as u32, num_hashes)
    }

    /// Add a key to the filter
    pub fn add(&mut self, key: &[u8]) {
        for seed in 0..self.num_hashes {
            let pos = self.position(key, seed);
            self.bits[pos / 8] |= 1 << (pos % 8);
        }
    }

    /// Check if a key MIGHT be in the set.
    /// false → definitely not here. true → probably here.
    pub fn might_contain(&self, key: &[u8]) -> bool {
        (0..self.num_hashes).all(|seed| {
            let pos = self.position(key, seed);
            self.bits[pos / 8] & (1 << (pos % 8)) != 0
        })
    }

    /// Serialize to the sidecar layout
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_SIZE + self.bits.len());
        buf.put_u32_le(self.num_bits);
        buf.put_u32_le(self.num_hashes);
        buf.put_slice(&self.bits);
        buf
    }

    /// Deserialize from the sidecar layout
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(LsmError::Corruption(format!(
                "Bloom filter too short: {} bytes",
                data.len()
            )));
        }

        let mut header = &data[..HEADER_SIZE];
        let num_bits = header.get_u32_le();
        let num_hashes = header.get_u32_le();

        if num_bits == 0 || num_hashes == 0 {
            return Err(LsmError::Corruption(format!(
                "Bloom filter has invalid shape: {} bits, {} hashes",
                num_bits, num_hashes
            )));
        }

        let bits = &data[HEADER_SIZE..];
        let expected = (num_bits as usize).div_ceil(8);
        if bits.len() != expected {
            return Err(LsmError::Corruption(format!(
                "Bloom filter bit array is {} bytes, expected {}",
                bits.len(),
                expected
            )));
        }

        Ok(Self {
            bits: bits.to_vec(),
            num_bits,
            num_hashes,
        })
    }

    /// Total number of bits (`m`)
    pub fn num_bits(&self) -> u32 {
        self.num_bits
    }

    /// Number of hash probes (`k`)
    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    fn position(&self, key: &[u8], seed: u32) -> usize {
        (xxh3_64_with_seed(key, seed as u64) % self.num_bits as u64) as usize
    }
}
