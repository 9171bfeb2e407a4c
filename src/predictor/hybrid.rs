//! Tournament arbitration between the tagged-geometric and perceptron
//! predictors, and the facade a trace harness drives.

use crate::branch::{BranchKind, Outcome};
use crate::predictor::{
    DirectionPredictor, PerceptronConfig, PerceptronPredictor, TageConfig,
    TagePredictor,
};

/// Configuration for a [HybridSelector].
#[derive(Clone, Copy, Debug)]
pub struct SelectorConfig {
    /// Number of entries.
    pub size: usize,

    /// Width of each saturating counter.
    pub ctr_bits: usize,
}
impl SelectorConfig {
    /// Get the [approximate] number of storage bits.
    pub fn storage_bits(&self) -> usize {
        self.size * self.ctr_bits
    }

    fn midpoint(&self) -> u8 {
        1 << (self.ctr_bits - 1)
    }

    /// Use this configuration to create a new [HybridSelector].
    pub fn build(self) -> HybridSelector {
        assert!(self.size.is_power_of_two());
        assert!(self.ctr_bits >= 1 && self.ctr_bits <= 7);
        HybridSelector {
            data: vec![self.midpoint(); self.size],
            cfg: self,
        }
    }
}
impl Default for SelectorConfig {
    fn default() -> Self {
        Self { size: 256, ctr_bits: 2 }
    }
}

/// A per-address table of saturating counters choosing which sub-predictor
/// to trust.
///
/// Counters at or above the midpoint trust the perceptron, below it the
/// tagged predictor. Entries start at the midpoint and move only when the
/// two sub-predictors disagreed, toward whichever one was right.
pub struct HybridSelector {
    pub cfg: SelectorConfig,
    pub data: Vec<u8>,
}
impl HybridSelector {
    /// Returns a mask corresponding to the number of entries in the table.
    pub fn index_mask(&self) -> usize {
        self.cfg.size - 1
    }

    fn index(&self, pc: u32) -> usize {
        (pc as usize) & self.index_mask()
    }

    fn ctr_max(&self) -> u8 {
        (1 << self.cfg.ctr_bits) - 1
    }

    /// Returns true when the perceptron's vote should be used for `pc`.
    pub fn prefers_perceptron(&self, pc: u32) -> bool {
        self.data[self.index(pc)] >= self.cfg.midpoint()
    }

    /// Move the entry for `pc` toward whichever sub-predictor was right.
    pub fn update(&mut self, pc: u32, perceptron_right: bool) {
        let idx = self.index(pc);
        let max = self.ctr_max();
        let ctr = &mut self.data[idx];
        if perceptron_right {
            if *ctr < max {
                *ctr += 1;
            }
        } else if *ctr > 0 {
            *ctr -= 1;
        }
    }
}

/// Configuration for a [HybridPredictor].
#[derive(Clone, Copy, Debug)]
pub struct HybridConfig {
    pub perceptron: PerceptronConfig,
    pub tage: TageConfig,
    pub selector: SelectorConfig,
}
impl HybridConfig {
    /// Get the [approximate] number of storage bits.
    pub fn storage_bits(&self) -> usize {
        self.perceptron.storage_bits()
            + self.tage.storage_bits()
            + self.selector.storage_bits()
    }

    /// Use this configuration to create a new [HybridPredictor].
    pub fn build(self) -> HybridPredictor {
        HybridPredictor {
            perceptron: self.perceptron.build(),
            tage: self.tage.build(),
            selector: self.selector.build(),
            votes: None,
        }
    }
}
impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            perceptron: PerceptronConfig::default(),
            tage: TageConfig::default(),
            selector: SelectorConfig::default(),
        }
    }
}

/// The predictor facade: both sub-predictors, the selector, and the three
/// operations a trace harness invokes, in program order, once per
/// instruction.
pub struct HybridPredictor {
    pub perceptron: PerceptronPredictor,
    pub tage: TagePredictor,
    pub selector: HybridSelector,

    /// Votes recorded by the most recent `predict`, consumed by the
    /// matching `update`.
    votes: Option<(Outcome, Outcome)>,
}
impl HybridPredictor {
    /// Create a predictor with the reference geometry.
    pub fn new() -> Self {
        HybridConfig::default().build()
    }

    /// Predict the direction of the conditional branch at `pc`.
    pub fn predict(&mut self, pc: u32) -> bool {
        let vote_p = self.perceptron.predict(pc);
        let vote_t = self.tage.predict(pc);
        self.votes = Some((vote_p, vote_t));

        // Agreement needs no arbitration; otherwise the selector entry for
        // this address decides which vote to trust.
        let outcome = if vote_p == vote_t {
            vote_p
        } else if self.selector.prefers_perceptron(pc) {
            vote_p
        } else {
            vote_t
        };
        outcome.into()
    }

    /// Feed the resolved outcome of the branch at `pc` back into the
    /// predictor. `predicted` must be the value the matching `predict`
    /// returned; `target` is accepted for interface parity and ignored
    /// (this is not a branch-target predictor).
    pub fn update(
        &mut self,
        pc: u32,
        taken: bool,
        _predicted: bool,
        _target: u32,
    ) {
        let outcome = Outcome::from(taken);
        let (vote_p, vote_t) = match self.votes.take() {
            Some(votes) => votes,
            None => (self.perceptron.predict(pc), self.tage.predict(pc)),
        };

        // The selector only learns from disagreements; when both votes
        // matched there is nothing to arbitrate.
        if vote_p != vote_t {
            self.selector.update(pc, vote_p == outcome);
        }

        // Both sub-predictors always learn, selected or not, so each stays
        // calibrated for future arbitration. Training precedes the history
        // shift: the next prediction must see this branch's outcome folded
        // in.
        self.perceptron.update(pc, outcome);
        self.perceptron.update_history(pc, outcome);
        self.tage.update(pc, outcome);
        self.tage.update_history(pc, outcome);
    }

    /// Informational hook for control-flow instructions that carry no
    /// taken/not-taken outcome (calls, returns, unconditional jumps).
    /// Predictor state is left untouched.
    pub fn track_other_inst(
        &mut self,
        _pc: u32,
        _kind: BranchKind,
        _target: u32,
    ) {
    }
}
impl Default for HybridPredictor {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::predictor::TableInit;
    use crate::stats::BranchStats;
    use crate::Outcome;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn selector_saturates_and_switches() {
        let mut sel = SelectorConfig::default().build();
        let pc = 0x80;
        assert!(sel.prefers_perceptron(pc));

        for _ in 0..10 {
            sel.update(pc, false);
        }
        assert!(!sel.prefers_perceptron(pc));
        assert_eq!(sel.data[0x80], 0);

        for _ in 0..10 {
            sel.update(pc, true);
        }
        assert_eq!(sel.data[0x80], 3);
        assert!(sel.prefers_perceptron(pc));
    }

    #[test]
    fn never_taken_branch_converges_within_ten() {
        let mut p = HybridPredictor::new();
        let mut stats = BranchStats::new();
        for i in 0..1000 {
            let pred = p.predict(0x2000);
            stats.record(0x2000, pred.into(), Outcome::N);
            if i >= 10 {
                assert!(!pred, "mispredicted at iteration {}", i);
            }
            p.update(0x2000, false, pred, 0x2100);
        }
        assert!(stats.hit_rate() > 0.99);
        assert_eq!(stats.num_unique_branches(), 1);
        assert!(stats.get(0x2000).unwrap().is_never_taken());
    }

    #[test]
    fn period_two_branch_exceeds_95_percent_after_warmup() {
        let mut p = HybridPredictor::new();
        let mut hits = 0usize;
        let mut total = 0usize;
        for i in 0..10_000usize {
            let taken = i % 2 == 1;
            let pred = p.predict(0x1000);
            if i >= 200 {
                total += 1;
                if pred == taken {
                    hits += 1;
                }
            }
            p.update(0x1000, taken, pred, 0x1040);
        }
        let rate = hits as f64 / total as f64;
        assert!(rate > 0.95, "post-warmup accuracy {:.4}", rate);
    }

    #[test]
    fn replay_is_deterministic() {
        let run = |init: TableInit| -> (Vec<bool>, Vec<u8>) {
            let mut cfg = HybridConfig::default();
            cfg.tage.init = init;
            let mut p = cfg.build();
            let mut rng = StdRng::seed_from_u64(0xfeed);
            let mut preds = Vec::new();
            for _ in 0..5000 {
                let pc = ((rng.gen::<u32>() & 0x3F) << 2) | 0x4_0000;
                let taken = rng.gen::<bool>();
                let pred = p.predict(pc);
                preds.push(pred);
                p.update(pc, taken, pred, pc ^ 0x40);
            }
            (preds, p.selector.data.clone())
        };

        let (a_preds, a_sel) = run(TableInit::Zeroed);
        let (b_preds, b_sel) = run(TableInit::Zeroed);
        assert_eq!(a_preds, b_preds);
        assert_eq!(a_sel, b_sel);

        let (c_preds, c_sel) = run(TableInit::Seeded(0x5eed));
        let (d_preds, d_sel) = run(TableInit::Seeded(0x5eed));
        assert_eq!(c_preds, d_preds);
        assert_eq!(c_sel, d_sel);
    }

    #[test]
    fn other_instructions_do_not_perturb_state() {
        let mut a = HybridPredictor::new();
        let mut b = HybridPredictor::new();
        for i in 0..2000u32 {
            let pc = 0x1000 + ((i % 16) << 2);
            let taken = (i / 3) % 2 == 0;

            b.track_other_inst(pc ^ 0xF00, BranchKind::DirectCall, 0x8000);
            let pa = a.predict(pc);
            let pb = b.predict(pc);
            assert_eq!(pa, pb);

            a.update(pc, taken, pa, 0x8000);
            b.update(pc, taken, pb, 0x8000);
            b.track_other_inst(0x9999, BranchKind::Return, 0);
        }
    }

    #[test]
    fn default_geometry_storage_budget() {
        let cfg = HybridConfig::default();
        // Tagged entries cost ctr + useful + tag bits; tag widths run
        // [11, 11, 10, 10] across the four banks.
        assert_eq!(
            cfg.tage.storage_bits(),
            8192 * 2 + 4096 * (16 + 16 + 15 + 15)
        );
        assert_eq!(cfg.perceptron.storage_bits(), 512 * 64 * 8);
        assert_eq!(cfg.selector.storage_bits(), 256 * 2);
        assert_eq!(
            cfg.storage_bits(),
            cfg.tage.storage_bits()
                + cfg.perceptron.storage_bits()
                + cfg.selector.storage_bits()
        );
    }
}
