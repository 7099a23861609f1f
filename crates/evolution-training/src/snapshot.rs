use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::PathBuf;

/// A saved checkpoint that belongs to a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRef {
    pub stage: String,
    pub iteration: u64,
    pub path: PathBuf,
}

impl SnapshotRef {
    #[must_use]
    pub fn new(stage: impl Into<String>, iteration: u64, path: impl Into<PathBuf>) -> Self {
        Self { stage: stage.into(), iteration, path: path.into() }
    }

    /// Picks the highest-iteration checkpoint of `found` and tags it with `stage`.
    #[must_use]
    pub fn last_of(stage: &str, mut found: Vec<(u64, PathBuf)>) -> Option<Self> {
        found.sort();
        found.pop().map(|(iteration, path)| Self::new(stage, iteration, path))
    }
}

impl PartialOrd for SnapshotRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SnapshotRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.iteration
            .cmp(&other.iteration)
            .then_with(|| self.path.cmp(&other.path))
            .then_with(|| self.stage.cmp(&other.stage))
    }
}
