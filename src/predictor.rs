//! Implementations of different branch predictors.

pub mod counter;
pub mod hybrid;
pub mod perceptron;
pub mod tage;

pub use counter::*;
pub use hybrid::*;
pub use perceptron::*;
pub use tage::*;

use crate::branch::Outcome;

/// Interface to a predictor that follows the direction of conditional
/// branches.
///
/// `predict` takes `&mut self` because implementations are free to retain
/// per-branch scratch state (a raw perceptron output, a tag-match record)
/// that the matching `update` consumes. The caller promises program order:
/// each `predict` is followed by the same branch's `update`, and
/// `update_history` runs exactly once per resolved branch, after training.
pub trait DirectionPredictor {
    /// Return the predicted direction for the branch at `pc`.
    fn predict(&mut self, pc: u32) -> Outcome;

    /// Incorporate the resolved outcome of the branch at `pc`.
    fn update(&mut self, pc: u32, outcome: Outcome);

    /// Record the resolved outcome in the predictor's history state.
    fn update_history(&mut self, pc: u32, outcome: Outcome);
}
