//! A hybrid conditional-branch direction predictor for trace simulation.
//!
//! Two independent sub-predictors (a TAGE-style tagged-geometric predictor
//! and a perceptron predictor) vote on every conditional branch, and a small
//! per-address tournament table arbitrates when they disagree. The harness
//! drives exactly three operations on [HybridPredictor]: `predict` before a
//! branch resolves, `update` after it resolves, and `track_other_inst` for
//! control-flow instructions with no taken/not-taken outcome.

pub mod branch;
pub mod history;
pub mod predictor;
pub mod stats;

pub use branch::*;
pub use history::*;
pub use predictor::*;
