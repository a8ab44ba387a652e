//! Bit predictors pluggable into [`super::binary::BinaryEncoder`]/`Decoder`:
//! FPAQ (stationary), CM (small context mixing), TPAQ/TPAQX
//! (two chained [`apm::LogisticAdaptiveProbMap`] stages).

pub mod apm;
pub mod cm;
pub mod fpaq;
pub mod tpaq;

use std::sync::OnceLock;

/// `squash(x) = 4096 / (1 + e^(-x/256))`, clamped to `[1, 4094]`: maps a
/// stretched (logistic-domain) value back to a 12-bit probability.
pub fn squash(x: i32) -> i32 {
    let x = x.clamp(-2047, 2047);
    let w = x & 127;
    let x = (x >> 7) + 16;
    static TABLE: OnceLock<[i32; 33]> = OnceLock::new();
    let t = TABLE.get_or_init(|| {
        let mut t = [0i32; 33];
        for (i, slot) in t.iter_mut().enumerate() {
            let v = (i as f64 - 16.0) * 128.0 / 256.0;
            *slot = (4096.0 / (1.0 + (-v).exp())) as i32;
        }
        t[0] = 1;
        t[32] = 4095;
        t
    });
    ((t[x as usize] * (128 - w) + t[(x + 1) as usize] * w) >> 7).clamp(1, 4094)
}

/// Inverse of [`squash`]: the logistic "stretch" of a 12-bit probability.
pub fn stretch(p: i32) -> i32 {
    static TABLE: OnceLock<[i32; 4096]> = OnceLock::new();
    let t = TABLE.get_or_init(|| {
        let mut t = [0i32; 4096];
        let mut pi = 0usize;
        for x in -2047..=2047 {
            let v = squash(x);
            while pi <= v as usize && pi < 4096 {
                t[pi] = x;
                pi += 1;
            }
        }
        while pi < 4096 {
            t[pi] = 2047;
            pi += 1;
        }
        t
    });
    t[p.clamp(1, 4095) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squash_stretch_are_monotonic() {
        let mut prev = i32::MIN;
        for x in (-2000..=2000).step_by(37) {
            let s = squash(x);
            assert!(s >= prev);
            prev = s;
        }
    }

    #[test]
    fn squash_of_zero_is_midpoint() {
        assert!((squash(0) - 2048).abs() < 64);
    }

    #[test]
    fn stretch_is_roughly_inverse_of_squash() {
        for p in [1, 100, 2048, 4000, 4094] {
            let round = squash(stretch(p));
            assert!((round - p).abs() < 64, "p={p} round={round}");
        }
    }
}
