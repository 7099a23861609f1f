//! Resolution of the active stage and its seed snapshot.
//!
//! The training directory is the only record of progress: the active stage is
//! the last stage (in list order) that already has a directory, unless a stage
//! is forced. Restarting a process therefore picks up where the previous one
//! left off.

use crate::catalog::CheckpointCatalog;
use crate::error::{TrainingError, TrainingResult};
use crate::layout::StageLayout;
use crate::snapshot::SnapshotRef;
use crate::stage::StageList;
use serde::Serialize;
use tracing::{debug, info};

/// Outcome of stage resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub current_stage: String,
    pub snapshot: Option<SnapshotRef>,
}

impl Resolution {
    /// True if the seed snapshot was taken from another (the previous) stage.
    #[must_use]
    pub fn seeds_from_previous_stage(&self) -> bool {
        self.snapshot.as_ref().is_some_and(|s| s.stage != self.current_stage)
    }
}

/// Resolves the current stage and the snapshot to initialize it from.
///
/// Same-stage lookup considers both regular and recovery checkpoints; the
/// fallback to the previous stage only considers its regular checkpoints.
pub fn resolve_stage(
    stages: &StageList,
    layout: &StageLayout,
    force_stage: Option<&str>,
    catalog: &dyn CheckpointCatalog,
) -> TrainingResult<Resolution> {
    let current = match force_stage {
        Some(forced) => {
            if !stages.contains(forced) {
                return Err(TrainingError::StageNotInList(forced.to_string()));
            }
            debug!(stage = forced, "using forced evolution");
            forced
        }
        None => stages
            .iter()
            .rev()
            .find(|stage| catalog.is_dir(&layout.stage_dir(stage)))
            .unwrap_or_else(|| stages.first()),
    };

    let current_stage = stages.stage(current)?;

    let mut found = catalog.list_checkpoints(&layout.checkpoint_prefix(current))?;
    found.extend(catalog.list_checkpoints(&layout.recovery_checkpoint_prefix(current))?);
    let mut snapshot = SnapshotRef::last_of(current, found);

    if snapshot.is_none() {
        if let Some(previous) = current_stage.previous() {
            let found = catalog.list_checkpoints(&layout.checkpoint_prefix(previous))?;
            snapshot = SnapshotRef::last_of(previous, found);
        }
    }

    match &snapshot {
        Some(s) => info!(
            evolution = current,
            snapshot_evolution = %s.stage,
            iteration = s.iteration,
            "resolved current evolution"
        ),
        None => info!(evolution = current, "resolved current evolution without snapshot"),
    }

    Ok(Resolution { current_stage: current.to_string(), snapshot })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use std::path::PathBuf;

    fn setup() -> (StageList, StageLayout) {
        (StageList::new(["a", "b", "c"]).unwrap(), StageLayout::new("/train"))
    }

    #[test]
    fn test_no_directories_resolves_first_stage() {
        let (stages, layout) = setup();
        let resolution = resolve_stage(&stages, &layout, None, &MemoryCatalog::new()).unwrap();

        assert_eq!(resolution.current_stage, "a");
        assert_eq!(resolution.snapshot, None);
    }

    #[test]
    fn test_last_existing_directory_wins() {
        let (stages, layout) = setup();
        let catalog = MemoryCatalog::new().with_dir("/train/a").with_dir("/train/c");

        let resolution = resolve_stage(&stages, &layout, None, &catalog).unwrap();
        assert_eq!(resolution.current_stage, "c");
    }

    #[test]
    fn test_highest_checkpoint_of_current_stage() {
        let (stages, layout) = setup();
        let catalog = MemoryCatalog::new()
            .with_checkpoint(layout.checkpoint_prefix("a"), 5)
            .with_checkpoint(layout.checkpoint_prefix("b"), 10)
            .with_checkpoint(layout.checkpoint_prefix("b"), 20);

        let resolution = resolve_stage(&stages, &layout, None, &catalog).unwrap();
        assert_eq!(resolution.current_stage, "b");
        assert_eq!(
            resolution.snapshot,
            Some(SnapshotRef::new("b", 20, "/train/b/checkpoints/snapshot-20"))
        );
        assert!(!resolution.seeds_from_previous_stage());
    }

    #[test]
    fn test_recovery_checkpoint_of_current_stage_counts() {
        let (stages, layout) = setup();
        let catalog = MemoryCatalog::new()
            .with_checkpoint(layout.checkpoint_prefix("b"), 10)
            .with_checkpoint(layout.recovery_checkpoint_prefix("b"), 15);

        let resolution = resolve_stage(&stages, &layout, None, &catalog).unwrap();
        let snapshot = resolution.snapshot.unwrap();
        assert_eq!(snapshot.iteration, 15);
        assert_eq!(snapshot.path, PathBuf::from("/train/b/recovery_checkpoints/snapshot-15"));
    }

    #[test]
    fn test_falls_back_to_previous_stage() {
        let (stages, layout) = setup();
        let catalog = MemoryCatalog::new()
            .with_dir("/train/c")
            .with_checkpoint(layout.checkpoint_prefix("b"), 20);

        let resolution = resolve_stage(&stages, &layout, None, &catalog).unwrap();
        assert_eq!(resolution.current_stage, "c");
        assert_eq!(
            resolution.snapshot,
            Some(SnapshotRef::new("b", 20, "/train/b/checkpoints/snapshot-20"))
        );
        assert!(resolution.seeds_from_previous_stage());
    }

    #[test]
    fn test_previous_stage_recovery_checkpoint_is_ignored() {
        let (stages, layout) = setup();
        let catalog = MemoryCatalog::new()
            .with_dir("/train/c")
            .with_checkpoint(layout.recovery_checkpoint_prefix("b"), 20);

        let resolution = resolve_stage(&stages, &layout, None, &catalog).unwrap();
        assert_eq!(resolution.current_stage, "c");
        assert_eq!(resolution.snapshot, None);
    }

    #[test]
    fn test_only_the_immediately_previous_stage_is_used() {
        let (stages, layout) = setup();
        let catalog = MemoryCatalog::new()
            .with_dir("/train/c")
            .with_checkpoint(layout.checkpoint_prefix("a"), 5);

        let resolution = resolve_stage(&stages, &layout, None, &catalog).unwrap();
        assert_eq!(resolution.snapshot, None);
    }

    #[test]
    fn test_forced_stage_bypasses_directory_scan() {
        let (stages, layout) = setup();
        let catalog = MemoryCatalog::new().with_dir("/train/a");

        let resolution = resolve_stage(&stages, &layout, Some("c"), &catalog).unwrap();
        assert_eq!(resolution.current_stage, "c");
    }

    #[test]
    fn test_forced_stage_must_be_listed() {
        let (stages, layout) = setup();
        let err = resolve_stage(&stages, &layout, Some("x"), &MemoryCatalog::new()).unwrap_err();
        assert!(matches!(err, TrainingError::StageNotInList(name) if name == "x"));
    }
}
