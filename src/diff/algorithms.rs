use similar::{Algorithm, ChangeTag, TextDiff};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Trait defining an added-lines diff strategy
pub trait DiffAlgorithm: Send + Sync {
    /// Lines judged newly present in `current`, in order
    fn added_lines(&self, previous: &str, current: &str) -> Vec<String>;

    /// Get the algorithm name
    fn name(&self) -> &'static str;

    /// Get algorithm description
    fn description(&self) -> &'static str;
}

/// Split text into lines on `\r` or `\n`, dropping empty entries.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split(['\r', '\n'])
        .filter(|line| !line.is_empty())
        .collect()
}

/// Forward-scanning two-pointer alignment.
///
/// A cursor walks the previous lines; every current line equal to the line
/// under the cursor advances it, every other current line is reported as
/// added. Linear time. Exact for appended content only: deleting, reordering
/// or editing earlier lines desynchronises the cursor and everything after
/// that point is over-reported as added.
pub struct GreedyAlgorithm;

impl DiffAlgorithm for GreedyAlgorithm {
    fn added_lines(&self, previous: &str, current: &str) -> Vec<String> {
        let previous = split_lines(previous);
        let mut cursor = 0;
        let mut added = Vec::new();

        for line in split_lines(current) {
            if cursor < previous.len() && line == previous[cursor] {
                cursor += 1;
            } else {
                added.push(line.to_string());
            }
        }

        added
    }

    fn name(&self) -> &'static str {
        "Greedy"
    }

    fn description(&self) -> &'static str {
        "Two-pointer forward scan - exact for appends, over-reports on edits"
    }
}

/// Myers alignment reporting insertions only
pub struct MyersAlgorithm;

impl DiffAlgorithm for MyersAlgorithm {
    fn added_lines(&self, previous: &str, current: &str) -> Vec<String> {
        let previous = normalize(previous);
        let current = normalize(current);

        let diff = TextDiff::configure()
            .algorithm(Algorithm::Myers)
            .diff_lines(&previous, &current);

        diff.iter_all_changes()
            .filter(|change| change.tag() == ChangeTag::Insert)
            .map(|change| change.value().trim_end_matches('\n').to_string())
            .collect()
    }

    fn name(&self) -> &'static str {
        "Myers"
    }

    fn description(&self) -> &'static str {
        "Myers' O(ND) alignment - inserted lines only, deletions ignored"
    }
}

// One `\n`-terminated line per non-empty input line so that the last line
// compares equal regardless of a trailing terminator.
fn normalize(text: &str) -> String {
    split_lines(text)
        .into_iter()
        .map(|line| format!("{}\n", line))
        .collect()
}

/// Available diff algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffAlgorithmType {
    #[default]
    Greedy,
    Myers,
}

impl DiffAlgorithmType {
    pub fn all() -> &'static [DiffAlgorithmType] {
        &[Self::Greedy, Self::Myers]
    }

    pub fn create(&self) -> Box<dyn DiffAlgorithm> {
        match self {
            Self::Greedy => Box::new(GreedyAlgorithm),
            Self::Myers => Box::new(MyersAlgorithm),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Greedy => "Greedy",
            Self::Myers => "Myers",
        }
    }
}

impl std::fmt::Display for DiffAlgorithmType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
