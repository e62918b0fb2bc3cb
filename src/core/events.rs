use std::time::SystemTime;
use serde::{Deserialize, Serialize};

/// Kind of change raised by the watch adapter for a watched file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Modified,
    Created,
    Deleted,
}

impl ChangeKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Modified => "modified",
            Self::Created => "created",
            Self::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Key used to absorb repeated notifications within one batch window
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub file: String,
    pub kind: ChangeKind,
}

/// A change waiting for the next flush
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingChange {
    pub file: String,
    pub kind: ChangeKind,
    pub detected_at: SystemTime,
}

impl PendingChange {
    pub fn new(file: impl Into<String>, kind: ChangeKind, detected_at: SystemTime) -> Self {
        Self {
            file: file.into(),
            kind,
            detected_at,
        }
    }

    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            file: self.file.clone(),
            kind: self.kind,
        }
    }
}
