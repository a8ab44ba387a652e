//! Adaptive probability map (`AdaptiveProbMap`).
//!
//! Direct port of kanzi's `AdaptiveProbMap.hpp`'s
//! `LogisticAdaptiveProbMap<RATE>`: maps a (probability, context) pair to a
//! refined probability, in the stretch/logistic domain, and adapts towards
//! the actual bit seen. `RATE` is a runtime field here instead of a C++
//! template parameter ("template parameter re-expressed as a named
//! constant").

use super::{squash, stretch};

pub struct LogisticAdaptiveProbMap {
    rate: u32,
    index: usize,
    data: Vec<u16>,
}

impl LogisticAdaptiveProbMap {
    pub fn new(rate: u32, contexts: usize) -> Self {
        let mut row = [0u16; 33];
        for (j, slot) in row.iter_mut().enumerate() {
            *slot = (squash(((j as i32) - 16) << 7) << 4) as u16;
        }
        let mut data = Vec::with_capacity(33 * contexts);
        for _ in 0..contexts {
            data.extend_from_slice(&row);
        }
        LogisticAdaptiveProbMap { rate, index: 0, data }
    }

    /// Returns a refined 12-bit probability that the next bit is 1, given
    /// the previous call's actual `bit`, the raw prediction `pr`, and a
    /// `ctx` selecting which row of the map to use.
    pub fn get(&mut self, bit: i32, pr: i32, ctx: usize) -> i32 {
        let g = ((-bit) & 65528) + (bit << self.rate);
        let d0 = self.data[self.index] as i32;
        self.data[self.index] = (d0 + ((g - d0) >> self.rate)) as u16;
        let d1 = self.data[self.index + 1] as i32;
        self.data[self.index + 1] = (d1 + ((g - d1) >> self.rate)) as u16;

        let stretched = stretch(pr);
        self.index = (((stretched + 2048) >> 7) as usize) + 33 * ctx;

        let w = (stretched & 127) as i32;
        (self.data[self.index] as i32 * (128 - w) + self.data[self.index + 1] as i32 * w) >> 11
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converges_toward_observed_bit() {
        let mut apm = LogisticAdaptiveProbMap::new(7, 1);
        let mut pr = 2048i32;
        for _ in 0..200 {
            pr = apm.get(1, pr, 0).clamp(1, 4094);
        }
        assert!(pr > 2048);
    }
}
