use crate::history::{
    FoldedHistoryRegister, GlobalHistoryRegister, PathHistoryRegister,
};
use crate::predictor::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// How table contents are initialized at construction.
///
/// `Zeroed` puts every counter at its neutral value and is fully
/// reproducible by construction. `Seeded` draws counters and 'useful' bits
/// from an explicitly-seeded PRNG; reproduction then depends only on the
/// seed. Tags always start unallocated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableInit {
    Zeroed,
    Seeded(u64),
}

/// Configuration for a [TagePredictor].
#[derive(Clone, Copy, Debug)]
pub struct TageConfig {
    /// Number of entries in the base table.
    pub base_size: usize,

    /// Number of entries in each tagged bank.
    pub bank_size: usize,

    /// Number of tagged banks.
    pub num_banks: usize,

    /// Width of the per-entry saturating counter in tagged banks.
    pub ctr_bits: usize,

    /// Nominal tag width; banks with longer histories use narrower tags
    /// (see [TageConfig::tag_bits_for]).
    pub tag_bits: usize,

    /// History window of the shortest bank.
    pub min_length: usize,

    /// History window of the longest bank.
    pub max_length: usize,

    /// Bits of path history mixed into bank indices.
    pub path_bits: usize,

    /// Initial table contents.
    pub init: TableInit,
}
impl TageConfig {
    /// The per-bank history window lengths: a geometric progression from
    /// `min_length` (bank 0) to `max_length` (the last bank), so each bank's
    /// window is roughly a constant multiple of the previous one's.
    pub fn history_lengths(&self) -> Vec<usize> {
        let n = self.num_banks;
        (0..n)
            .map(|i| {
                if i == 0 {
                    self.min_length
                } else if i == n - 1 {
                    self.max_length
                } else {
                    let ratio = (self.max_length as f64
                        / self.min_length as f64)
                        .powf(i as f64 / (n - 1) as f64);
                    (self.min_length as f64 * ratio + 0.5) as usize
                }
            })
            .collect()
    }

    /// Tag width for a bank. Longer-history banks get shorter tags: their
    /// matches are rarer and self-selecting, so they need less collision
    /// resistance.
    pub fn tag_bits_for(&self, bank: usize) -> usize {
        self.tag_bits - ((bank + (self.num_banks & 1)) / 2)
    }

    /// Get the [approximate] number of storage bits.
    pub fn storage_bits(&self) -> usize {
        let base = self.base_size * 2;
        let banks: usize = (0..self.num_banks)
            .map(|i| {
                let entry = self.ctr_bits + 2 + self.tag_bits_for(i);
                self.bank_size * entry
            })
            .sum();
        base + banks
    }

    /// Use this configuration to create a new [TagePredictor].
    pub fn build(self) -> TagePredictor {
        assert!(self.base_size.is_power_of_two());
        assert!(self.bank_size.is_power_of_two());
        assert!(self.num_banks >= 2);
        assert!(self.min_length < self.max_length);

        let log_global = self.bank_size.ilog2() as usize;
        let lengths = self.history_lengths();
        let ctr_min = -(1i8 << (self.ctr_bits - 1));
        let ctr_max = (1i8 << (self.ctr_bits - 1)) - 1;

        let mut rng = match self.init {
            TableInit::Zeroed => None,
            TableInit::Seeded(seed) => Some(StdRng::seed_from_u64(seed)),
        };

        let banks = (0..self.num_banks)
            .map(|i| {
                let tag_bits = self.tag_bits_for(i);
                let data = (0..self.bank_size)
                    .map(|_| {
                        let mut entry = TaggedEntry::new(self.ctr_bits);
                        if let Some(rng) = rng.as_mut() {
                            entry.ctr.set(rng.gen_range(ctr_min..=ctr_max));
                            entry.useful = rng.gen_range(0..=USEFUL_MAX);
                        }
                        entry
                    })
                    .collect();
                TageBank {
                    history_len: lengths[i],
                    tag_bits,
                    data,
                    index_csr: FoldedHistoryRegister::new(
                        lengths[i],
                        log_global,
                    ),
                    tag_csr: [
                        FoldedHistoryRegister::new(lengths[i], tag_bits),
                        FoldedHistoryRegister::new(lengths[i], tag_bits - 1),
                    ],
                }
            })
            .collect();

        TagePredictor {
            base: vec![
                SaturatingCounter::with_range(-2, 1);
                self.base_size
            ],
            banks,
            ghr: GlobalHistoryRegister::new(self.max_length + 1),
            path: PathHistoryRegister::new(self.path_bits),
            pred: None,
            cfg: self,
        }
    }
}
impl Default for TageConfig {
    fn default() -> Self {
        Self {
            base_size: 1 << 13,
            bank_size: 1 << 12,
            num_banks: 4,
            ctr_bits: 3,
            tag_bits: 11,
            min_length: 3,
            max_length: 131,
            path_bits: 10,
            init: TableInit::Zeroed,
        }
    }
}
