//! Order-0 byte histograms and the first-order entropy estimate used by the
//! `skipBlocks` incompressibility fast path (step 2) and by the
//! entropy codecs' frequency-table construction.

/// Counts each byte value's occurrences in `data`.
pub fn order0_histogram(data: &[u8]) -> [u32; 256] {
    let mut freqs = [0u32; 256];
    for &b in data {
        freqs[b as usize] += 1;
    }
    freqs
}

/// Order-1 histogram: `freqs[ctx][sym]`, keyed by the preceding byte
/// (context 0 for the first byte). Used by ANS order-1.
pub fn order1_histogram(data: &[u8]) -> Vec<[u32; 256]> {
    let mut freqs = vec![[0u32; 256]; 256];
    let mut ctx = 0usize;
    for &b in data {
        freqs[ctx][b as usize] += 1;
        ctx = b as usize;
    }
    freqs
}

/// Shannon entropy in bits-per-byte of `data`, estimated from its order-0
/// histogram. Used to decide whether a block is "incompressible enough" to
/// skip transform+entropy and emit as a copy block.
pub fn order0_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let freqs = order0_histogram(data);
    let n = data.len() as f64;
    let mut entropy = 0.0f64;
    for &f in freqs.iter() {
        if f == 0 {
            continue;
        }
        let p = f as f64 / n;
        entropy -= p * p.log2();
    }
    entropy
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_byte_has_zero_entropy() {
        let data = vec![7u8; 1024];
        assert!(order0_entropy(&data) < 1e-9);
    }

    #[test]
    fn uniform_alphabet_has_near_max_entropy() {
        let data: Vec<u8> = (0..=255u8).cycle().take(256 * 64).collect();
        let e = order0_entropy(&data);
        assert!(e > 7.9 && e <= 8.0001);
    }

    #[test]
    fn histogram_sums_to_length() {
        let data = b"mississippi";
        let h = order0_histogram(data);
        let sum: u32 = h.iter().sum();
        assert_eq!(sum as usize, data.len());
    }

    #[test]
    fn order1_histogram_sums_to_length() {
        let data = b"abababab";
        let h = order1_histogram(data);
        let sum: u32 = h.iter().flatten().sum();
        assert_eq!(sum as usize, data.len());
    }
}
