//! Sparse index: every Nth key of a table mapped to its byte offset.

/// Sampled `(key, offset)` pairs in ascending key order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseIndex {
    samples: Vec<(Vec<u8>, u64)>,
}

impl SparseIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sample
    ///
    /// Returns `false` and keeps the index unchanged if `key` does not sort
    /// after the last sample, which only happens for a damaged data file.
    pub fn push(&mut self, key: Vec<u8>, offset: u64) -> bool {
        if let Some((last, _)) = self.samples.last() {
            if *last >= key {
                return false;
            }
        }
        self.samples.push((key, offset));
        true
    }

    /// Offset to start scanning from: that of the greatest sampled key ≤ `key`,
    /// or 0 when every sample is greater
    pub fn seek_offset(&self, key: &[u8]) -> u64 {
        let idx = self.samples.partition_point(|(k, _)| k.as_slice() <= key);
        match idx {
            0 => 0,
            i => self.samples[i - 1].1,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], u64)> + '_ {
        self.samples.iter().map(|(k, off)| (k.as_slice(), *off))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> SparseIndex {
        let mut idx = SparseIndex::new();
        idx.push(b"b".to_vec(), 0);
        idx.push(b"f".to_vec(), 100);
        idx.push(b"m".to_vec(), 250);
        idx
    }

    #[test]
    fn test_seek_before_first_sample() {
        assert_eq!(index().seek_offset(b"a"), 0);
    }

    #[test]
    fn test_seek_exact_and_between() {
        let idx = index();
        assert_eq!(idx.seek_offset(b"f"), 100);
        assert_eq!(idx.seek_offset(b"g"), 100);
        assert_eq!(idx.seek_offset(b"zzz"), 250);
    }

    #[test]
    fn test_out_of_order_sample_rejected() {
        let mut idx = index();
        assert!(!idx.push(b"c".to_vec(), 400));
        assert!(!idx.push(b"m".to_vec(), 400));
        assert_eq!(idx.len(), 3);
        assert_eq!(idx.seek_offset(b"zzz"), 250);
    }

    #[test]
    fn test_empty_index_starts_at_zero() {
        assert_eq!(SparseIndex::new().seek_offset(b"anything"), 0);
    }
}
