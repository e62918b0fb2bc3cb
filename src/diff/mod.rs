//! Added-lines diff engine
//!
//! Summarises the change between two versions of a file as the lines that
//! are newly present. Strategies plug in through [`DiffAlgorithm`]; the
//! greedy two-pointer scan is the default.

pub mod algorithms;

pub use algorithms::{
    split_lines, DiffAlgorithm, DiffAlgorithmType, GreedyAlgorithm, MyersAlgorithm,
};

use serde::{Deserialize, Serialize};

/// Result of comparing two versions of a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffOutcome {
    Added(Vec<String>),
    Unchanged,
}

impl DiffOutcome {
    pub fn from_lines(lines: Vec<String>) -> Self {
        if lines.is_empty() {
            Self::Unchanged
        } else {
            Self::Added(lines)
        }
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged)
    }

    pub fn added_lines(&self) -> &[String] {
        match self {
            Self::Added(lines) => lines,
            Self::Unchanged => &[],
        }
    }
}

/// Diff with a specific algorithm
pub fn diff_with(algorithm: &dyn DiffAlgorithm, previous: &str, current: &str) -> DiffOutcome {
    DiffOutcome::from_lines(algorithm.added_lines(previous, current))
}

/// Convenience function using the default greedy algorithm
pub fn diff(previous: &str, current: &str) -> DiffOutcome {
    diff_with(&GreedyAlgorithm, previous, current)
}
