//! Types for representing branches and branch outcomes.

/// A branch outcome.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Outcome {
    /// Not taken
    N,
    /// Taken
    T,
}

impl std::fmt::Debug for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            Self::T => "t",
            Self::N => "n",
        };
        write!(f, "{}", s)
    }
}

impl std::ops::Not for Outcome {
    type Output = Self;
    fn not(self) -> Self {
        match self {
            Self::N => Self::T,
            Self::T => Self::N,
        }
    }
}

impl From<bool> for Outcome {
    fn from(x: bool) -> Self {
        match x {
            true => Self::T,
            false => Self::N,
        }
    }
}
impl Into<bool> for Outcome {
    fn into(self) -> bool {
        match self {
            Self::T => true,
            Self::N => false,
        }
    }
}

/// Kinds of control-flow instructions reported by a harness.
///
/// Only [BranchKind::DirectBranch] carries a taken/not-taken outcome; the
/// other kinds reach the predictor through the informational
/// `track_other_inst` hook.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum BranchKind {
    /// A direct conditional branch instruction.
    DirectBranch,
    /// A direct unconditional jump instruction.
    DirectJump,
    /// An indirect unconditional jump instruction.
    IndirectJump,
    /// A direct call instruction.
    DirectCall,
    /// An indirect call instruction.
    IndirectCall,
    /// A return instruction.
    Return,
}
