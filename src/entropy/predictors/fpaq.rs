//! FPAQ predictor: a stationary 2-bit-per-context counter indexed by the
//! partial byte decoded so far (`FPAQ`), the classic fpaq0 design.

use super::super::binary::Predictor;

const RATE: i32 = 5;

pub struct FpaqPredictor {
    /// `counters[ctx]`: 12-bit probability that the next bit is 1, for the
    /// binary-tree node reached by the bits decoded so far in this byte.
    counters: [u16; 256],
    ctx: usize,
}

impl FpaqPredictor {
    pub fn new() -> Self {
        FpaqPredictor { counters: [2048u16; 256], ctx: 1 }
    }
}

impl Default for FpaqPredictor {
    fn default() -> Self {
        Self::new()
    }
}

impl Predictor for FpaqPredictor {
    fn predict(&mut self) -> u16 {
        self.counters[self.ctx]
    }

    fn update(&mut self, bit: i32) {
        let p = self.counters[self.ctx] as i32;
        let target = bit << 12;
        self.counters[self.ctx] = (p + ((target - p) >> RATE)) as u16;

        self.ctx = (self.ctx << 1) | bit as usize;
        if self.ctx >= 256 {
            self.ctx = 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn learns_a_constant_bit() {
        let mut p = FpaqPredictor::new();
        for _ in 0..50 {
            let _ = p.predict();
            p.update(1);
        }
        assert!(p.counters[p.ctx.max(1)] as i32 > 0);
        // After many 1-bits the root node's probability should have risen.
        assert!(p.counters[1] > 2048);
    }
}
