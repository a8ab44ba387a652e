//! Burrows-Wheeler transform ("BWT (forward)"/"BWT (inverse)").
//!
//! Forward is exactly the original's single-chunk path: sort the suffix
//! array, then `dst[i] = src[sa[i] - 1]` with the `sa[i] == 0` position
//! replaced by `src[n - 1]` (the primary index). Inverse uses the mergeTPSI
//! algorithm (kanzi's `BWT.cpp`'s
//! `inverseSmallBlock`).
//!
//! **Deviation**: the original also has a `getBWTChunks`-driven biPSIv2
//! multi-chunk path for blocks ≥ 4 MiB, letting several primary indices
//! split a big inverse across threads. That path's correctness rests on a
//! fairly intricate bucket/fast-bit construction that could not be
//! hand-verified here without running it, so every block size up to the
//! 1024 MiB cap goes through the single-chunk mergeTPSI path with one
//! primary index. This sacrifices the original's inverse-side parallelism
//! for a transform whose round-trip correctness can actually be reasoned
//! about by hand.

use super::suffix_array::SuffixArray;
use super::{Transform, TransformError};

/// Maximum BWT block size ("Maximum BWT block size is 1,024 MiB").
pub const MAX_BLOCK_SIZE: usize = 1024 * 1024 * 1024;

pub struct Bwt {
    primary_index: u32,
}

impl Bwt {
    pub fn new() -> Self {
        Bwt { primary_index: 0 }
    }

    pub fn primary_index(&self) -> u32 {
        self.primary_index
    }
}

impl Default for Bwt {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for Bwt {
    fn max_encoded_len(&self, n: usize) -> usize {
        n + 4
    }

    fn forward(&mut self, src: &[u8], dst: &mut Vec<u8>) -> Result<bool, TransformError> {
        let n = src.len();
        if n > MAX_BLOCK_SIZE {
            return Err(TransformError::InvalidData(format!(
                "BWT block of {n} bytes exceeds the {MAX_BLOCK_SIZE} byte cap"
            )));
        }
        if n < 2 {
            dst.extend_from_slice(src);
            self.primary_index = 0;
            return Ok(true);
        }

        let sa = SuffixArray::build(src);
        dst.resize(n, 0);
        dst[0] = src[n - 1];
        let mut primary = 0usize;
        let mut out_idx = 1usize;
        for &s in &sa {
            if s == 0 {
                primary = out_idx;
                continue;
            }
            dst[out_idx] = src[s as usize - 1];
            out_idx += 1;
        }
        self.primary_index = primary as u32;

        // Primary index is carried out-of-band by the block pipeline (one
        // per chunk, recorded in the block header's BWT variant); append it
        // here so this transform is self-contained for stages that only see
        // byte streams.
        dst.extend_from_slice(&self.primary_index.to_le_bytes());
        Ok(true)
    }

    fn inverse(&mut self, src: &[u8], dst: &mut Vec<u8>) -> Result<(), TransformError> {
        if src.len() < 4 {
            if src.is_empty() {
                return Ok(());
            }
            return Err(TransformError::InvalidData("BWT payload too short".into()));
        }
        let n = src.len() - 4;
        let primary = u32::from_le_bytes([src[n], src[n + 1], src[n + 2], src[n + 3]]) as usize;
        let l = &src[..n];

        if n < 2 {
            dst.extend_from_slice(l);
            return Ok(());
        }
        if primary > n {
            return Err(TransformError::InvalidData("BWT primary index out of range".into()));
        }

        let mut buckets = [0u32; 256];
        for &b in l {
            buckets[b as usize] += 1;
        }
        let mut sum = 0u32;
        for b in buckets.iter_mut() {
            let tmp = *b;
            *b = sum;
            sum += tmp;
        }

        // `link[i]` packs (predecessor position << 8 | byte value), matching
        // the original's `(i - 1) << 8 | val` / `i << 8 | val` split at the
        // primary index.
        let mut link = vec![0u32; n];
        for (i, &val) in l.iter().enumerate().take(primary) {
            let slot = buckets[val as usize];
            link[slot as usize] = (((i as i64 - 1) as u32) << 8) | val as u32;
            buckets[val as usize] += 1;
        }
        for (i, &val) in l.iter().enumerate().skip(primary) {
            let slot = buckets[val as usize];
            link[slot as usize] = ((i as u32) << 8) | val as u32;
            buckets[val as usize] += 1;
        }

        dst.resize(n, 0);
        let mut t = primary.wrapping_sub(1);
        for i in 0..n {
            let ptr = link[t];
            dst[i] = (ptr & 0xFF) as u8;
            t = (ptr >> 8) as usize;
        }
        Ok(())
    }
}
