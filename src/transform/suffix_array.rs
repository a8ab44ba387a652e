//! Suffix array construction used by [`super::bwt`] ("BWT (forward)").
//!
//! The original (kanzi's `DivSufSort.hpp`) builds the
//! array via a type-B* bucket sort followed by recursive refinement
//! (divsufsort). That two-stage machinery is an optimization of a single
//! contract — "produce the sorted order of every suffix of `src`" — so it is
//! reproduced here as a direct prefix-doubling construction (the classic
//! Manber-Myers rank-doubling algorithm) behind the same entry point.
//! Comparison-driven doubling is `O(n log n)` rather than divsufsort's
//! near-linear bound, but is straightforward to verify by hand and gives the
//! identical sorted order BWT only depends on.

pub struct SuffixArray;

impl SuffixArray {
    /// Returns the suffix array of `src`: `sa[i]` is the starting offset of
    /// the `i`-th smallest suffix under lexicographic order, treating each
    /// byte as unsigned and a suffix as extending to the end of `src` (no
    /// implicit sentinel; ties on a common prefix are broken by preferring
    /// the suffix that runs out first, i.e. the shorter one sorts first,
    /// matching ordinary string comparison).
    pub fn build(src: &[u8]) -> Vec<u32> {
        let n = src.len();
        if n == 0 {
            return Vec::new();
        }
        if n == 1 {
            return vec![0];
        }

        let mut sa: Vec<u32> = (0..n as u32).collect();
        let mut rank: Vec<i32> = src.iter().map(|&b| b as i32).collect();
        let mut tmp: Vec<i32> = vec![0; n];

        let mut k = 1usize;
        while k < n {
            let rank_at = |r: &[i32], i: usize| -> i32 {
                if i < n {
                    r[i]
                } else {
                    -1
                }
            };

            sa.sort_unstable_by(|&a, &b| {
                let a = a as usize;
                let b = b as usize;
                let ra = rank[a];
                let rb = rank[b];
                if ra != rb {
                    ra.cmp(&rb)
                } else {
                    rank_at(&rank, a + k).cmp(&rank_at(&rank, b + k))
                }
            });

            tmp[sa[0] as usize] = 0;
            for i in 1..n {
                let prev = sa[i - 1] as usize;
                let cur = sa[i] as usize;
                let same = rank[prev] == rank[cur]
                    && rank_at(&rank, prev + k) == rank_at(&rank, cur + k);
                tmp[cur] = tmp[prev] + if same { 0 } else { 1 };
            }
            rank.copy_from_slice(&tmp);

            if rank[sa[n - 1] as usize] as usize == n - 1 {
                break;
            }
            k *= 2;
        }

        sa
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_sa(src: &[u8]) -> Vec<u32> {
        let n = src.len();
        let mut idx: Vec<u32> = (0..n as u32).collect();
        idx.sort_by(|&a, &b| src[a as usize..].cmp(&src[b as usize..]));
        idx
    }

    #[test]
    fn matches_naive_on_banana() {
        let s = b"banana";
        assert_eq!(SuffixArray::build(s), naive_sa(s));
    }

    #[test]
    fn matches_naive_on_repetitive_text() {
        let s = b"mississippi";
        assert_eq!(SuffixArray::build(s), naive_sa(s));
    }

    #[test]
    fn matches_naive_on_all_same_byte() {
        let s = [7u8; 32];
        assert_eq!(SuffixArray::build(&s), naive_sa(&s));
    }

    #[test]
    fn single_byte_and_empty() {
        assert_eq!(SuffixArray::build(b""), Vec::<u32>::new());
        assert_eq!(SuffixArray::build(b"x"), vec![0]);
    }

    #[test]
    fn matches_naive_on_random_looking_bytes() {
        let s: Vec<u8> = (0..500u32).map(|i| ((i * 2654435761) >> 24) as u8).collect();
        assert_eq!(SuffixArray::build(&s), naive_sa(&s));
    }
}
