//! The "TAgged GEometric history length" predictor.
//!
//! See "A case for (partially) TAgged GEometric history length branch
//! prediction" (Seznec, 2006).
//!
//! A base table of short saturating counters backs several tagged banks
//! whose index and tag hashes fold geometrically increasing windows of
//! global history. Banks are ordered from the shortest history length
//! (bank 0) to the longest; the first bank whose tag matches provides the
//! prediction, and the next match is kept as an advisory alternate.

pub mod config;
pub use config::*;

use crate::history::{
    FoldedHistoryRegister, GlobalHistoryRegister, PathHistoryRegister,
};
use crate::predictor::{DirectionPredictor, SaturatingCounter};
use crate::Outcome;

/// Saturation bound of the 2-bit 'useful' counter in every tagged entry.
pub const USEFUL_MAX: u8 = 3;

/// Identifies the component that provided a prediction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provider {
    /// The base table.
    Base,
    /// A tagged bank.
    Bank(usize),
}

/// An entry in a tagged bank.
#[derive(Clone, Debug)]
pub struct TaggedEntry {
    /// State machine tracking the branch outcome.
    pub ctr: SaturatingCounter,

    /// Tag associated with this entry. `None` until first allocation, so an
    /// unallocated slot can never match.
    pub tag: Option<u16>,

    /// The 'useful' counter, used to arbitrate eviction: it rises while the
    /// entry keeps overriding the alternate correctly, and entries must age
    /// back to zero before they can be reclaimed.
    pub useful: u8,
}
impl TaggedEntry {
    pub fn new(ctr_bits: usize) -> Self {
        Self {
            ctr: SaturatingCounter::signed(ctr_bits),
            tag: None,
            useful: 0,
        }
    }

    /// Get the current predicted outcome.
    pub fn predict(&self) -> Outcome {
        self.ctr.predict()
    }

    /// Returns true if the provided tag matches this entry.
    pub fn tag_matches(&self, tag: u16) -> bool {
        self.tag == Some(tag)
    }

    /// Increment the 'useful' counter.
    pub fn increment_useful(&mut self) {
        self.useful = (self.useful + 1).min(USEFUL_MAX);
    }

    /// Decrement the 'useful' counter.
    pub fn decrement_useful(&mut self) {
        self.useful = self.useful.saturating_sub(1);
    }
}

/// A tagged bank: a table of entries plus the folded-history registers
/// backing its index and tag hashes.
#[derive(Clone, Debug)]
pub struct TageBank {
    /// The global-history window length hashed by this bank.
    pub history_len: usize,

    /// Number of tag bits in this bank's entries.
    pub tag_bits: usize,

    /// Table of entries.
    pub data: Vec<TaggedEntry>,

    /// Folded global history feeding the index hash.
    pub index_csr: FoldedHistoryRegister,

    /// Folded global history feeding the tag hash, at two different widths
    /// so the two contributions never cancel each other.
    pub tag_csr: [FoldedHistoryRegister; 2],
}
impl TageBank {
    pub fn index_mask(&self) -> usize {
        self.data.len() - 1
    }

    pub fn tag_mask(&self) -> usize {
        (1 << self.tag_bits) - 1
    }
}

/// The outcome of indexing and tag-matching every component for one branch.
///
/// Retained between `predict` and the matching `update`: the allocation
/// policy needs the indices and tags exactly as they were computed at
/// prediction time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagePrediction {
    /// The component providing the prediction.
    pub provider: Provider,

    /// The predicted direction.
    pub outcome: Outcome,

    /// Alternate component: the next-longer matching bank, if any.
    pub alt_provider: Provider,

    /// Predicted direction from the alternate component.
    pub alt_outcome: Outcome,

    /// Index into the base table.
    pub base_index: usize,

    /// Per-bank indices for this branch.
    pub bank_indices: Vec<usize>,

    /// Per-bank tags for this branch.
    pub bank_tags: Vec<u16>,
}

/// A tagged-geometric predictor over a base table and `num_banks` tagged
/// banks.
pub struct TagePredictor {
    pub cfg: TageConfig,

    /// Base table: weak default bias per masked pc.
    pub base: Vec<SaturatingCounter>,

    /// Tagged banks, shortest history first.
    pub banks: Vec<TageBank>,

    /// Global outcome history; one bit longer than the longest window so
    /// the retiring bit is always readable.
    pub ghr: GlobalHistoryRegister,

    /// Rolling low bits of recent branch addresses.
    pub path: PathHistoryRegister,

    /// Match record retained from the most recent `predict`.
    pred: Option<TagePrediction>,
}
impl TagePredictor {
    /// Return the number of tagged banks.
    pub fn num_banks(&self) -> usize {
        self.banks.len()
    }

    fn log_global(&self) -> usize {
        self.cfg.bank_size.ilog2() as usize
    }

    /// Index into the base table.
    pub fn base_index(&self, pc: u32) -> usize {
        (pc as usize) & (self.cfg.base_size - 1)
    }

    /// Index into a tagged bank: the pc is mixed with its own shifted copy,
    /// the bank's folded history, and a bank-dependent rotation of the path
    /// history, decorrelating collisions across banks that alias on pc.
    pub fn bank_index(&self, pc: u32, bank: usize) -> usize {
        let pc = pc as usize;
        let log_global = self.log_global();
        let shift = log_global - self.num_banks() + bank + 1;
        let path_len = self.banks[bank].history_len.min(16);
        let index = pc
            ^ (pc >> shift)
            ^ self.banks[bank].index_csr.output()
            ^ Self::mix_path(self.path.value(), path_len, bank, log_global);
        index & self.banks[bank].index_mask()
    }

    /// Tag for a branch in a tagged bank.
    pub fn bank_tag(&self, pc: u32, bank: usize) -> u16 {
        let b = &self.banks[bank];
        let tag = (pc as usize)
            ^ b.tag_csr[0].output()
            ^ (b.tag_csr[1].output() << 1);
        (tag & b.tag_mask()) as u16
    }

    /// Rotate/fold `size` bits of path history by a bank-dependent amount.
    fn mix_path(hist: usize, size: usize, bank: usize, log_global: usize)
        -> usize
    {
        let mask = (1 << log_global) - 1;
        let hist = hist & ((1 << size) - 1);
        let hi = hist >> log_global;
        let hi = ((hi << bank) & mask) + (hi >> (log_global - bank));
        let lo = hist & mask;
        let mixed = lo ^ hi;
        ((mixed << bank) & mask) + (mixed >> (log_global - bank))
    }

    /// Index and tag-match every component for the branch at `pc`.
    ///
    /// Banks are scanned from the shortest history length to the longest:
    /// the first tag match provides, the next match is the alternate, and
    /// the base table backs both when matches run out.
    pub fn lookup(&self, pc: u32) -> TagePrediction {
        let base_index = self.base_index(pc);
        let bank_indices: Vec<usize> =
            (0..self.num_banks()).map(|i| self.bank_index(pc, i)).collect();
        let bank_tags: Vec<u16> =
            (0..self.num_banks()).map(|i| self.bank_tag(pc, i)).collect();

        let base_outcome = self.base[base_index].predict();
        let mut result = TagePrediction {
            provider: Provider::Base,
            outcome: base_outcome,
            alt_provider: Provider::Base,
            alt_outcome: base_outcome,
            base_index,
            bank_indices,
            bank_tags,
        };

        for i in 0..self.num_banks() {
            let entry = &self.banks[i].data[result.bank_indices[i]];
            if !entry.tag_matches(result.bank_tags[i]) {
                continue;
            }
            match result.provider {
                Provider::Base => {
                    result.provider = Provider::Bank(i);
                    result.outcome = entry.predict();
                }
                Provider::Bank(_) => {
                    result.alt_provider = Provider::Bank(i);
                    result.alt_outcome = entry.predict();
                    break;
                }
            }
        }
        result
    }

    /// On a misprediction, try to allocate an entry in a bank with a longer
    /// history than the provider. The first slot with the lowest 'useful'
    /// value is the victim; if every candidate is still proving useful, age
    /// them all by one instead of overwriting anything.
    fn allocate(&mut self, pred: &TagePrediction, outcome: Outcome) {
        let start = match pred.provider {
            Provider::Base => 0,
            Provider::Bank(i) => i + 1,
        };

        let mut min_useful = u8::MAX;
        let mut victim = None;
        for i in start..self.num_banks() {
            let useful = self.banks[i].data[pred.bank_indices[i]].useful;
            if useful < min_useful {
                min_useful = useful;
                victim = Some(i);
            }
        }

        match victim {
            Some(i) if min_useful == 0 => {
                let tag = pred.bank_tags[i];
                let entry = &mut self.banks[i].data[pred.bank_indices[i]];
                entry.ctr.set(match outcome {
                    Outcome::T => 0,
                    Outcome::N => -1,
                });
                entry.tag = Some(tag);
                entry.useful = 0;
            }
            Some(_) => {
                for i in start..self.num_banks() {
                    self.banks[i].data[pred.bank_indices[i]]
                        .decrement_useful();
                }
            }
            None => {}
        }
    }
}
impl DirectionPredictor for TagePredictor {
    fn predict(&mut self, pc: u32) -> Outcome {
        let pred = self.lookup(pc);
        let outcome = pred.outcome;
        self.pred = Some(pred);
        outcome
    }

    fn update(&mut self, pc: u32, outcome: Outcome) {
        let pred = self.pred.take().unwrap_or_else(|| self.lookup(pc));
        let misprediction = pred.outcome != outcome;

        match pred.provider {
            Provider::Base => {
                self.base[pred.base_index].update(outcome);
            }
            Provider::Bank(i) => {
                let entry = &mut self.banks[i].data[pred.bank_indices[i]];
                // The provider overrode the alternate's vote: record whether
                // the override was worth keeping.
                if pred.outcome != pred.alt_outcome {
                    if misprediction {
                        entry.decrement_useful();
                    } else {
                        entry.increment_useful();
                    }
                }
                entry.ctr.update(outcome);
            }
        }

        if misprediction {
            self.allocate(&pred, outcome);
        }
    }

    fn update_history(&mut self, pc: u32, outcome: Outcome) {
        self.path.push(pc & 1 == 1);
        self.ghr.push(outcome);
        let ghr = &self.ghr;
        for bank in self.banks.iter_mut() {
            bank.index_csr.update(ghr);
            for csr in bank.tag_csr.iter_mut() {
                csr.update(ghr);
            }
        }
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::predictor::DirectionPredictor;
    use crate::Outcome;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn default_geometry() {
        let cfg = TageConfig::default();
        assert_eq!(cfg.history_lengths(), vec![3, 11, 37, 131]);

        let t = cfg.build();
        let tag_widths: Vec<usize> =
            t.banks.iter().map(|b| b.tag_bits).collect();
        assert_eq!(tag_widths, vec![11, 11, 10, 10]);
        assert_eq!(t.base.len(), 1 << 13);
        assert!(t.banks.iter().all(|b| b.data.len() == 1 << 12));
    }

    #[test]
    fn shortest_matching_bank_provides() {
        let mut t = TageConfig::default().build();
        let pc = 0x0000_4242;
        let p0 = t.lookup(pc);

        // Plant matching tags in banks 1 and 3 with opposing counters.
        let e1 = &mut t.banks[1].data[p0.bank_indices[1]];
        e1.tag = Some(p0.bank_tags[1]);
        e1.ctr.set(3);
        let e3 = &mut t.banks[3].data[p0.bank_indices[3]];
        e3.tag = Some(p0.bank_tags[3]);
        e3.ctr.set(-4);

        let p = t.lookup(pc);
        assert_eq!(p.provider, Provider::Bank(1));
        assert_eq!(p.outcome, Outcome::T);
        assert_eq!(p.alt_provider, Provider::Bank(3));
        assert_eq!(p.alt_outcome, Outcome::N);
    }

    #[test]
    fn allocation_ages_before_reclaiming() {
        let mut t = TageConfig::default().build();
        let pc = 0x1000;
        let p = t.lookup(pc);

        for i in 0..t.num_banks() {
            t.banks[i].data[p.bank_indices[i]].useful = 2;
        }

        // Fresh base entry predicts taken; resolve not-taken to force the
        // allocation path while every candidate is still useful.
        assert_eq!(t.predict(pc), Outcome::T);
        t.update(pc, Outcome::N);
        for i in 0..t.num_banks() {
            let e = &t.banks[i].data[p.bank_indices[i]];
            assert_eq!(e.useful, 1, "bank {} was not aged", i);
            assert!(e.tag.is_none(), "bank {} was overwritten", i);
        }

        // Free one slot; the next misprediction must claim exactly that one.
        // (History was deliberately not advanced, so indices still hold.)
        t.banks[2].data[p.bank_indices[2]].useful = 0;
        assert_eq!(t.predict(pc), Outcome::N);
        t.update(pc, Outcome::T);

        let e = &t.banks[2].data[p.bank_indices[2]];
        assert_eq!(e.tag, Some(p.bank_tags[2]));
        assert_eq!(e.ctr.value(), 0);
        assert_eq!(e.useful, 0);
        for i in [0, 1, 3] {
            let e = &t.banks[i].data[p.bank_indices[i]];
            assert_eq!(e.useful, 1, "bank {} aged during an overwrite", i);
            assert!(e.tag.is_none());
        }
    }

    #[test]
    fn provider_trains_and_tracks_usefulness() {
        let mut t = TageConfig::default().build();
        let pc = 0x77C4;
        let p = t.lookup(pc);

        // Base strongly not-taken, bank 0 overriding with taken.
        t.base[p.base_index].set(-2);
        let e0 = &mut t.banks[0].data[p.bank_indices[0]];
        e0.tag = Some(p.bank_tags[0]);
        e0.ctr.set(1);

        assert_eq!(t.predict(pc), Outcome::T);
        t.update(pc, Outcome::T);
        let e0 = &t.banks[0].data[p.bank_indices[0]];
        assert_eq!(e0.useful, 1);
        assert_eq!(e0.ctr.value(), 2);

        assert_eq!(t.predict(pc), Outcome::T);
        t.update(pc, Outcome::N);
        let e0 = &t.banks[0].data[p.bank_indices[0]];
        assert_eq!(e0.useful, 0);
        assert_eq!(e0.ctr.value(), 1);
    }

    #[test]
    fn constant_branch_converges_immediately() {
        let mut t = TageConfig::default().build();
        let mut misses = 0;
        for i in 0..100 {
            let pred = t.predict(0x2000);
            if pred != Outcome::N {
                misses += 1;
                assert_eq!(i, 0, "mispredicted after the first iteration");
            }
            t.update(0x2000, Outcome::N);
            t.update_history(0x2000, Outcome::N);
        }
        assert_eq!(misses, 1);
    }

    #[test]
    fn counters_and_useful_bits_stay_bounded() {
        let mut t = TageConfig::default().build();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20_000 {
            let pc: u32 = (rng.gen::<u32>() & 0xFFFF) << 1;
            let outcome = Outcome::from(rng.gen::<bool>());
            let _ = t.predict(pc);
            t.update(pc, outcome);
            t.update_history(pc, outcome);
        }

        for bank in t.banks.iter() {
            for e in bank.data.iter() {
                assert!(e.useful <= USEFUL_MAX);
                assert!(e.ctr.value() >= -4 && e.ctr.value() <= 3);
                if let Some(tag) = e.tag {
                    assert!((tag as usize) <= bank.tag_mask());
                }
            }
        }
        for ctr in t.base.iter() {
            assert!(ctr.value() >= -2 && ctr.value() <= 1);
        }
    }

    #[test]
    fn seeded_init_is_reproducible() {
        let build = || {
            let mut cfg = TageConfig::default();
            cfg.init = TableInit::Seeded(0x5eed);
            cfg.build()
        };
        let a = build();
        let b = build();
        for (ba, bb) in a.banks.iter().zip(b.banks.iter()) {
            for (ea, eb) in ba.data.iter().zip(bb.data.iter()) {
                assert_eq!(ea.ctr.value(), eb.ctr.value());
                assert_eq!(ea.useful, eb.useful);
                assert_eq!(ea.tag, None);
            }
        }
    }
}
