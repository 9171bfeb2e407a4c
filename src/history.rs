//! History registers feeding the predictors' index and tag hashes.

use bitvec::prelude::*;
use std::ops::RangeInclusive;

/// A global history of branch outcomes, most recent bit at index 0.
pub struct GlobalHistoryRegister {
    pub data: BitVec<usize, Lsb0>,
    len: usize,
}

// NOTE: This *reverses* all of the bits and presents them in a format
// where the leftmost bit is the most-significant (index n) and the rightmost
// bit is the least-significant (index 0).
impl std::fmt::Display for GlobalHistoryRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let x: String = self.data.as_bitslice().iter().by_vals()
            .map(|b| if b { '1' } else { '0' })
            .rev()
            .collect();
        write!(f, "{}", x)
    }
}

impl GlobalHistoryRegister {
    /// Create a register with the specified length in bits.
    /// All bits in the register are initialized to zero.
    pub fn new(len: usize) -> Self {
        Self {
            data: bitvec![usize, Lsb0; 0; len],
            len,
        }
    }

    pub fn len(&self) -> usize { self.len }
    pub fn data(&self) -> &BitVec { &self.data }

    /// Record a resolved outcome as the newest history bit.
    pub fn push(&mut self, outcome: crate::Outcome) {
        self.shift_by(1);
        self.data.set(0, outcome.into());
    }

    /// Shift the register by 'n' bits.
    /// The bottom 'n' bits become zero, and the top 'n' bits are discarded.
    pub fn shift_by(&mut self, n: usize) {
        self.data.shift_right(n);
    }

    /// Fold [with XOR] some slice of bits.
    ///
    /// This is the direct recomputation that [FoldedHistoryRegister] tracks
    /// incrementally: the two must always agree over the same window.
    pub fn fold(&self, range: RangeInclusive<usize>, output_bits: usize)
        -> usize
    {
        let output_mask = (1 << output_bits) - 1;
        let slice = &self.data[range];
        let chunks = slice.chunks(output_bits);
        let res = chunks.fold(0, |mut res, x| {
            let val = x.load::<usize>();
            res ^= val;
            res
        });

        res & output_mask
    }
}

/// A rolling record of the low bit of recent branch addresses.
#[derive(Clone, Copy, Debug)]
pub struct PathHistoryRegister {
    data: usize,
    len: usize,
}
impl PathHistoryRegister {
    /// Create a register tracking the last `len` address bits.
    pub fn new(len: usize) -> Self {
        Self { data: 0, len }
    }

    /// Record the low bit of a branch address.
    pub fn push(&mut self, addr_bit: bool) {
        self.data = ((self.data << 1) | (addr_bit as usize)) & self.mask();
    }

    pub fn value(&self) -> usize { self.data }
    pub fn len(&self) -> usize { self.len }
    fn mask(&self) -> usize { (1 << self.len) - 1 }
}

/// A rolling hash compressing an `origin_len`-bit window of global history
/// down to `compressed_len` bits, updated in O(1) per history bit.
///
/// Each update shifts the newest history bit in at the bottom, cancels the
/// contribution of the bit falling out of the window (re-aligned by
/// `origin_len % compressed_len`), and folds the overflow bit back down.
/// The strategy mirrors the hardware scheme described in "BADGR: A Practical
/// GHR Implementation for TAGE Branch Predictors" (Schlais and Lipasti, 2016).
///
/// NOTE: This assumes exactly one bit is shifted into global history per
/// update, and that the backing register holds at least `origin_len + 1`
/// bits (the retiring bit is read at index `origin_len` *after* the shift).
#[derive(Clone, Debug)]
pub struct FoldedHistoryRegister {
    hash: usize,

    /// The length of the history window to-be-folded [in bits].
    origin_len: usize,

    /// The size of the output [in bits].
    compressed_len: usize,

    /// Phase at which the retiring bit's contribution is cancelled.
    phase: usize,
}
impl FoldedHistoryRegister {
    pub fn new(origin_len: usize, compressed_len: usize) -> Self {
        Self {
            hash: 0,
            origin_len,
            compressed_len,
            phase: origin_len % compressed_len,
        }
    }

    /// Return the folded history as a [usize].
    pub fn output(&self) -> usize { self.hash }

    pub fn origin_len(&self) -> usize { self.origin_len }
    pub fn compressed_len(&self) -> usize { self.compressed_len }

    /// Fold the newest history bit in, retiring the bit that left the
    /// window. Call once per [GlobalHistoryRegister::push], afterwards.
    pub fn update(&mut self, ghr: &GlobalHistoryRegister) {
        debug_assert!(ghr.len() > self.origin_len);
        let newest = ghr.data()[0] as usize;
        let retired = ghr.data()[self.origin_len] as usize;
        self.hash = (self.hash << 1) | newest;
        self.hash ^= retired << self.phase;
        self.hash ^= self.hash >> self.compressed_len;
        self.hash &= (1 << self.compressed_len) - 1;
    }
}
