//! TPAQ/TPAQX predictors: a [`CmPredictor`] refined through two chained
//! [`LogisticAdaptiveProbMap`] stages (`TPAQ`/`TPAQX`), the PAQ
//! lineage's usual "mix, then calibrate twice" structure.
//!
//! TPAQX differs only in which byte-history context the second APM stage
//! keys on (the previous byte instead of the running tree position),
//! matching "two `AdaptiveProbMap` stages" for both variants
//! without duplicating the whole predictor.

use super::super::binary::Predictor;
use super::apm::LogisticAdaptiveProbMap;
use super::cm::CmPredictor;

const APM1_RATE: u32 = 7;
const APM2_RATE: u32 = 7;

enum SecondStageContext {
    TreePosition,
    PreviousByte,
}

pub struct TpaqPredictor {
    cm: CmPredictor,
    apm1: LogisticAdaptiveProbMap,
    apm2: LogisticAdaptiveProbMap,
    second_stage_ctx: SecondStageContext,
    last_bit: i32,
    tree_ctx: usize,
    prev_byte: usize,
    raw_pred: i32,
    stage1_pred: i32,
}

impl TpaqPredictor {
    fn build(second_stage_ctx: SecondStageContext) -> Self {
        TpaqPredictor {
            cm: CmPredictor::new(),
            apm1: LogisticAdaptiveProbMap::new(APM1_RATE, 256),
            apm2: LogisticAdaptiveProbMap::new(APM2_RATE, 256),
            second_stage_ctx,
            last_bit: 0,
            tree_ctx: 1,
            prev_byte: 0,
            raw_pred: 2048,
            stage1_pred: 2048,
        }
    }

    pub fn new_tpaq() -> Self {
        Self::build(SecondStageContext::TreePosition)
    }

    pub fn new_tpaqx() -> Self {
        Self::build(SecondStageContext::PreviousByte)
    }
}

impl Predictor for TpaqPredictor {
    fn predict(&mut self) -> u16 {
        self.raw_pred = self.cm.predict() as i32;
        self.stage1_pred = self.apm1.get(self.last_bit, self.raw_pred, self.tree_ctx & 0xFF);

        let ctx2 = match self.second_stage_ctx {
            SecondStageContext::TreePosition => self.tree_ctx & 0xFF,
            SecondStageContext::PreviousByte => self.prev_byte,
        };
        let refined = self.apm2.get(self.last_bit, self.stage1_pred, ctx2);
        ((self.stage1_pred + 3 * refined) / 4).clamp(1, 4094) as u16
    }

    fn update(&mut self, bit: i32) {
        self.cm.update(bit);
        self.last_bit = bit;
        self.tree_ctx = (self.tree_ctx << 1) | bit as usize;
        if self.tree_ctx >= 256 {
            self.prev_byte = (self.tree_ctx - 256) & 0xFF;
            self.tree_ctx = 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tpaq_and_tpaqx_both_learn() {
        for mut p in [TpaqPredictor::new_tpaq(), TpaqPredictor::new_tpaqx()] {
            for _ in 0..500 {
                let _ = p.predict();
                p.update(1);
            }
            assert!(p.predict() > 2048);
        }
    }
}
