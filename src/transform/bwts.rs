//! Bijective Burrows-Wheeler transform ("BWTS (Lyndon-word variant)").
//!
//! Unlike [`super::bwt::Bwt`], this variant carries no primary index: forward
//! factors the input into Lyndon words `w1 >= w2 >= ... >= wk` (Duval's
//! algorithm, guaranteed by the Chen-Fox-Lyndon theorem), takes every cyclic
//! rotation of every factor, sorts all of them together under the order on
//! their infinite repetitions, and emits the last byte of each sorted
//! rotation — the same "last column" construction as an ordinary BWT, just
//! over factor conjugates instead of whole-string suffixes. Inverse reuses
//! the LF-mapping/link-array construction from [`super::bwt::Bwt`]'s inverse
//! (no primary index needed this time: the link array is already a full
//! permutation, so it decomposes into disjoint cycles, one per original
//! factor). Each cycle is traced out to recover a rotation of its factor,
//! then canonicalized to that factor's actual Lyndon word via its minimal
//! rotation (Booth's algorithm), and the recovered words are concatenated in
//! non-increasing order to rebuild the input.
//!
//! Rotation comparison and Booth's algorithm are both linear per pair/string,
//! but sorting the full rotation set is a plain comparison sort rather than
//! the suffix-array-based construction `Bwt` uses, so this is quadratic-ish
//! in the worst case rather than `Bwt`'s near-linear path. Correctness over
//! throughput.

use super::{Transform, TransformError};

/// Duval's algorithm: factors `s` into Lyndon words in non-increasing
/// lexicographic order, returned as `(start, len)` pairs.
fn duval_factorize(s: &[u8]) -> Vec<(usize, usize)> {
    let n = s.len();
    let mut factors = Vec::new();
    let mut i = 0;
    while i < n {
        let mut j = i + 1;
        let mut k = i;
        while j < n && s[k] <= s[j] {
            if s[k] < s[j] {
                k = i;
            } else {
                k += 1;
            }
            j += 1;
        }
        while i <= k {
            factors.push((i, j - k));
            i += j - k;
        }
    }
    factors
}

/// The byte `off` positions into the infinite repetition of
/// `s[start..start+len]`, read starting at cyclic offset `rot`.
#[inline]
fn rotated_byte(s: &[u8], start: usize, len: usize, rot: usize, off: usize) -> u8 {
    s[start + (rot + off) % len]
}

/// Orders two rotations by their infinite repetitions. Two periodic infinite
/// strings that haven't differed within `la + lb` characters never will, so
/// that bound is always enough to decide the order.
fn cmp_rotations(
    s: &[u8],
    a_start: usize,
    a_len: usize,
    a_rot: usize,
    b_start: usize,
    b_len: usize,
    b_rot: usize,
) -> std::cmp::Ordering {
    let bound = a_len + b_len;
    for k in 0..bound {
        let ca = rotated_byte(s, a_start, a_len, a_rot, k);
        let cb = rotated_byte(s, b_start, b_len, b_rot, k);
        match ca.cmp(&cb) {
            std::cmp::Ordering::Equal => continue,
            other => return other,
        }
    }
    std::cmp::Ordering::Equal
}

/// Booth's algorithm: the start offset of the lexicographically smallest
/// rotation of `s`, in O(n).
fn minimal_rotation(s: &[u8]) -> usize {
    let n = s.len();
    if n <= 1 {
        return 0;
    }
    let doubled: Vec<u8> = s.iter().chain(s.iter()).copied().collect();
    let m = doubled.len();
    let mut f: Vec<isize> = vec![-1; m];
    let mut k: usize = 0;
    for j in 1..m {
        let sj = doubled[j];
        let mut i = f[j - k - 1];
        while i != -1 && sj != doubled[k + i as usize + 1] {
            if sj < doubled[k + i as usize + 1] {
                k = j - i as usize - 1;
            }
            i = f[i as usize];
        }
        if i == -1 {
            if sj != doubled[k] {
                if sj < doubled[k] {
                    k = j;
                }
                f[j - k] = -1;
            } else {
                f[j - k] = 0;
            }
        } else {
            f[j - k] = i + 1;
        }
    }
    k
}

pub struct Bwts;

impl Bwts {
    pub fn new() -> Self {
        Bwts
    }
}

impl Default for Bwts {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for Bwts {
    fn max_encoded_len(&self, n: usize) -> usize {
        n
    }

    fn forward(&mut self, src: &[u8], dst: &mut Vec<u8>) -> Result<bool, TransformError> {
        let n = src.len();
        if n < 2 {
            dst.extend_from_slice(src);
            return Ok(true);
        }

        let factors = duval_factorize(src);

        let mut rotations: Vec<(usize, usize, usize)> = Vec::with_capacity(n);
        for &(start, len) in &factors {
            for rot in 0..len {
                rotations.push((start, len, rot));
            }
        }

        rotations.sort_by(|&(sa, la, ra), &(sb, lb, rb)| cmp_rotations(src, sa, la, ra, sb, lb, rb));

        dst.reserve(n);
        for &(start, len, rot) in &rotations {
            dst.push(rotated_byte(src, start, len, rot, len - 1));
        }
        Ok(true)
    }

    fn inverse(&mut self, src: &[u8], dst: &mut Vec<u8>) -> Result<(), TransformError> {
        let n = src.len();
        if n < 2 {
            dst.extend_from_slice(src);
            return Ok(());
        }

        let mut buckets = [0u32; 256];
        for &b in src {
            buckets[b as usize] += 1;
        }
        let mut sum = 0u32;
        for b in buckets.iter_mut() {
            let tmp = *b;
            *b = sum;
            sum += tmp;
        }

        // Same `(predecessor << 8 | byte)` link construction as `Bwt`'s
        // inverse, but over the whole array: with no primary index to
        // privilege one starting point, `link` is simply a permutation of
        // `0..n` that decomposes into disjoint cycles.
        let mut link = vec![0u32; n];
        for (i, &val) in src.iter().enumerate() {
            let slot = buckets[val as usize];
            link[slot as usize] = ((i as u32) << 8) | val as u32;
            buckets[val as usize] += 1;
        }

        let mut visited = vec![false; n];
        let mut words: Vec<Vec<u8>> = Vec::new();
        for start in 0..n {
            if visited[start] {
                continue;
            }
            let mut cycle_bytes = Vec::new();
            let mut t = start;
            loop {
                visited[t] = true;
                let ptr = link[t];
                cycle_bytes.push((ptr & 0xFF) as u8);
                t = (ptr >> 8) as usize;
                if t == start {
                    break;
                }
            }
            // `cycle_bytes` is some rotation of the Lyndon word this cycle
            // reconstructs, not necessarily the canonical one: rotate it to
            // its minimal rotation to recover the actual factor.
            let rot = minimal_rotation(&cycle_bytes);
            let len = cycle_bytes.len();
            let word: Vec<u8> = (0..len).map(|k| cycle_bytes[(rot + k) % len]).collect();
            words.push(word);
        }

        // Duval's factorization produces factors in non-increasing order;
        // reassemble the same way.
        words.sort_by(|a, b| b.cmp(a));
        for w in &words {
            dst.extend_from_slice(w);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(data: &[u8]) {
        let mut t = Bwts::new();
        let mut encoded = Vec::new();
        t.forward(data, &mut encoded).unwrap();
        assert_eq!(encoded.len(), data.len());
        let mut decoded = Vec::new();
        t.inverse(&encoded, &mut decoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn round_trips_repetitive_text() {
        round_trip(b"abracadabra abracadabra abracadabra");
    }

    #[test]
    fn round_trips_banana() {
        round_trip(b"banana");
    }

    #[test]
    fn round_trips_all_same_byte() {
        round_trip(&[5u8; 512]);
    }

    #[test]
    fn round_trips_strictly_increasing_bytes() {
        // A single Lyndon word spanning the whole input (already minimal),
        // so forward reduces to sorting `n` rotations of one factor.
        round_trip(&(0u8..=250).collect::<Vec<u8>>());
    }

    #[test]
    fn round_trips_strictly_decreasing_bytes() {
        // Each byte is its own Lyndon factor, the opposite extreme from the
        // single-factor case above.
        let data: Vec<u8> = (0..=250u8).rev().collect();
        round_trip(&data);
    }

    #[test]
    fn round_trips_empty_and_singleton() {
        round_trip(b"");
        round_trip(b"x");
    }

    #[test]
    fn duval_factors_non_increasing() {
        let data = b"banana";
        let factors = duval_factorize(data);
        let words: Vec<&[u8]> =
            factors.iter().map(|&(start, len)| &data[start..start + len]).collect();
        for pair in words.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
        let total: usize = factors.iter().map(|&(_, len)| len).sum();
        assert_eq!(total, data.len());
    }

    #[test]
    fn minimal_rotation_finds_lexicographically_smallest() {
        let s = b"bbaabab";
        let rot = minimal_rotation(s);
        let doubled: Vec<u8> = s.iter().chain(s.iter()).copied().collect();
        let candidate = &doubled[rot..rot + s.len()];
        for r in 0..s.len() {
            let other = &doubled[r..r + s.len()];
            assert!(candidate <= other);
        }
    }
}
