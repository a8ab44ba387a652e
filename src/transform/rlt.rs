//! Run-length transforms ("RLT / ZRLT").
//!
//! `Zrlt` is a direct translation of
//! kanzi's `ZRLT.cpp`: runs of the zero byte are
//! replaced by their length's binary representation, MSB dropped (since the
//! leading bit is always 1), written one bit per output byte so the
//! downstream entropy stage sees a near-binary alphabet; non-zero bytes are
//! `+1`-shifted so `0` is free to mean "start of a zero run", with `0xFE`/
//! `0xFF` escaped through a `0xFF` marker byte.
//!
//! `Rlt` is the classic escaped run-length coder: runs of any byte are
//! encoded as `val, escape, lenHi, lenLo`, with one change from the usual
//! layout: the escape marker is written *before* the value (`escape, val,
//! lenHi, lenLo`) rather than after. Putting the escape first makes a
//! literal occurrence of the escape byte unambiguous to double up
//! (`escape, escape`); with the escape trailing the value, a plain literal
//! byte that happens to be followed by an escaped-literal token becomes
//! indistinguishable from a real run header. `RLT.hpp`'s own encoding
//! (`RUN_LEN_ENCODE1`/`RUN_LEN_ENCODE2`, an unescaped two-tier length code)
//! wasn't available as a `.cpp`, so this simpler escaped form is
//! implemented directly rather than guessed at.

use super::{Transform, TransformError};

const ESCAPE_BYTE: u8 = 0xFF;

pub struct Zrlt;

impl Zrlt {
    pub fn new() -> Self {
        Zrlt
    }
}

impl Default for Zrlt {
    fn default() -> Self {
        Self::new()
    }
}

fn log2_floor(v: u32) -> u32 {
    31 - v.leading_zeros()
}

impl Transform for Zrlt {
    fn max_encoded_len(&self, n: usize) -> usize {
        2 * n + 32
    }

    fn forward(&mut self, src: &[u8], dst: &mut Vec<u8>) -> Result<bool, TransformError> {
        let n = src.len();
        if n == 0 {
            return Ok(true);
        }
        let mut i = 0usize;
        while i < n {
            if src[i] == 0 {
                let mut run = 1usize;
                while i + run < n && src[i + run] == 0 {
                    run += 1;
                }
                i += run;

                let run_len = (run + 1) as u32;
                let mut log = log2_floor(run_len);
                while log > 0 {
                    log -= 1;
                    dst.push(((run_len >> log) & 1) as u8);
                }
                continue;
            }

            let val = src[i] as u32;
            if val >= 0xFE {
                dst.push(0xFF);
                dst.push((val - 0xFE) as u8);
            } else {
                dst.push((val + 1) as u8);
            }
            i += 1;
        }

        if dst.len() >= n {
            dst.clear();
            return Ok(false);
        }
        Ok(true)
    }

    fn inverse(&mut self, src: &[u8], dst: &mut Vec<u8>) -> Result<(), TransformError> {
        let mut i = 0usize;
        while i < src.len() {
            let val = src[i] as u32;

            if val <= 1 {
                let mut run_len = 1u32;
                let mut v = val;
                loop {
                    run_len = (run_len << 1) | v;
                    i += 1;
                    if i >= src.len() {
                        break;
                    }
                    v = src[i] as u32;
                    if v > 1 {
                        break;
                    }
                }
                for _ in 0..run_len - 1 {
                    dst.push(0);
                }
                continue;
            }

            if val == 0xFF {
                i += 1;
                if i >= src.len() {
                    return Err(TransformError::InvalidData("ZRLT escape at end of stream".into()));
                }
                dst.push((0xFE + src[i] as u32) as u8);
            } else {
                dst.push((val - 1) as u8);
            }
            i += 1;
        }
        Ok(())
    }
}

pub struct Rlt {
    run_threshold: usize,
}

impl Rlt {
    pub fn new() -> Self {
        Rlt { run_threshold: 3 }
    }
}

impl Default for Rlt {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for Rlt {
    fn max_encoded_len(&self, n: usize) -> usize {
        n + n / 2 + 32
    }

    fn forward(&mut self, src: &[u8], dst: &mut Vec<u8>) -> Result<bool, TransformError> {
        let n = src.len();
        if n == 0 {
            return Ok(true);
        }
        let mut i = 0usize;
        while i < n {
            let b = src[i];
            let mut run = 1usize;
            while i + run < n && src[i + run] == b {
                run += 1;
            }

            if run >= self.run_threshold {
                let mut remaining = run;
                let mut pos = i;
                while remaining >= self.run_threshold {
                    let chunk = remaining.min(self.run_threshold + 0xFFFF);
                    let len = (chunk - self.run_threshold) as u32;
                    dst.push(ESCAPE_BYTE);
                    dst.push(b);
                    dst.push((len >> 8) as u8);
                    dst.push((len & 0xFF) as u8);
                    pos += chunk;
                    remaining -= chunk;
                }
                i = pos;
                for _ in 0..remaining {
                    self.push_literal(dst, src[i]);
                    i += 1;
                }
            } else {
                for _ in 0..run {
                    self.push_literal(dst, b);
                    i += 1;
                }
            }
        }

        if dst.len() >= n {
            dst.clear();
            return Ok(false);
        }
        Ok(true)
    }

    fn inverse(&mut self, src: &[u8], dst: &mut Vec<u8>) -> Result<(), TransformError> {
        let mut i = 0usize;
        while i < src.len() {
            let b = src[i];
            if b == ESCAPE_BYTE {
                if i + 1 >= src.len() {
                    return Err(TransformError::InvalidData("RLT escape at end of stream".into()));
                }
                let next = src[i + 1];
                if next == ESCAPE_BYTE {
                    dst.push(ESCAPE_BYTE);
                    i += 2;
                    continue;
                }
                if i + 3 >= src.len() {
                    return Err(TransformError::InvalidData("RLT run header truncated".into()));
                }
                let val = next;
                let len = ((src[i + 2] as usize) << 8) | src[i + 3] as usize;
                let run = len + self.run_threshold;
                for _ in 0..run {
                    dst.push(val);
                }
                i += 4;
            } else {
                dst.push(b);
                i += 1;
            }
        }
        Ok(())
    }
}

impl Rlt {
    fn push_literal(&self, dst: &mut Vec<u8>, b: u8) {
        if b == ESCAPE_BYTE {
            dst.push(ESCAPE_BYTE);
            dst.push(ESCAPE_BYTE);
        } else {
            dst.push(b);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(mut t: impl Transform, data: &[u8]) {
        let mut encoded = Vec::new();
        let applied = t.forward(data, &mut encoded).unwrap();
        if !applied {
            return;
        }
        let mut decoded = Vec::new();
        t.inverse(&encoded, &mut decoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn zrlt_round_trips_zero_runs() {
        let mut data = vec![1u8, 2, 3];
        data.extend(std::iter::repeat(0u8).take(500));
        data.extend_from_slice(&[9u8, 0xFE, 0xFF, 4]);
        round_trip(Zrlt::new(), &data);
    }

    #[test]
    fn zrlt_round_trips_no_zero_runs() {
        round_trip(Zrlt::new(), b"the quick brown fox");
    }

    #[test]
    fn zrlt_round_trips_empty() {
        round_trip(Zrlt::new(), b"");
    }

    #[test]
    fn rlt_round_trips_long_runs() {
        let mut data = vec![7u8; 1000];
        data.extend_from_slice(b"not a run at all");
        data.extend(std::iter::repeat(0xFFu8).take(10));
        round_trip(Rlt::new(), &data);
    }

    #[test]
    fn rlt_round_trips_escape_byte_runs() {
        round_trip(Rlt::new(), &[0xFFu8; 50]);
    }

    #[test]
    fn rlt_round_trips_empty() {
        round_trip(Rlt::new(), b"");
    }
}
