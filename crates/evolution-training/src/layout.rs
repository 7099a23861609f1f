use std::path::{Path, PathBuf};

/// Process id marker written by the single-stage trainer.
pub const PROCESSID_FILE: &str = "processid";
/// Training summary directory.
pub const TRAIN_LOGDIR: &str = "trainlogs";
/// Directory for regular checkpoints.
pub const CHECKPOINTS_DIR: &str = "checkpoints";
/// Directory for time-triggered recovery checkpoints.
pub const RECOVERY_CHECKPOINTS_DIR: &str = "recovery_checkpoints";
/// Directory for test summaries.
pub const TEST_LOGDIR: &str = "testlogs";
/// File prefix shared by all checkpoints, e.g. `snapshot-1000.index`.
pub const CHECKPOINTS_FILE_PREFIX: &str = "snapshot";

/// Names a stage directory must never use.
pub const RESERVED_NAMES: [&str; 5] = [
    PROCESSID_FILE,
    TRAIN_LOGDIR,
    CHECKPOINTS_DIR,
    RECOVERY_CHECKPOINTS_DIR,
    TEST_LOGDIR,
];

#[must_use]
pub fn is_reserved_name(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

/// Filesystem layout of a multi-stage training directory.
///
/// ```text
/// <train_dir>/<stage>/checkpoints/snapshot-<iter>...
/// <train_dir>/<stage>/recovery_checkpoints/snapshot-<iter>...
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageLayout {
    train_dir: PathBuf,
}

impl StageLayout {
    #[must_use]
    pub fn new(train_dir: impl Into<PathBuf>) -> Self {
        Self { train_dir: train_dir.into() }
    }

    #[must_use]
    pub fn train_dir(&self) -> &Path {
        &self.train_dir
    }

    #[must_use]
    pub fn stage_dir(&self, stage: &str) -> PathBuf {
        self.train_dir.join(stage)
    }

    #[must_use]
    pub fn checkpoints_dir(&self, stage: &str) -> PathBuf {
        self.stage_dir(stage).join(CHECKPOINTS_DIR)
    }

    #[must_use]
    pub fn recovery_checkpoints_dir(&self, stage: &str) -> PathBuf {
        self.stage_dir(stage).join(RECOVERY_CHECKPOINTS_DIR)
    }

    /// Prefix path passed to checkpoint discovery for regular checkpoints.
    #[must_use]
    pub fn checkpoint_prefix(&self, stage: &str) -> PathBuf {
        self.checkpoints_dir(stage).join(CHECKPOINTS_FILE_PREFIX)
    }

    #[must_use]
    pub fn recovery_checkpoint_prefix(&self, stage: &str) -> PathBuf {
        self.recovery_checkpoints_dir(stage).join(CHECKPOINTS_FILE_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let layout = StageLayout::new("/train");

        assert_eq!(layout.stage_dir("coarse"), PathBuf::from("/train/coarse"));
        assert_eq!(
            layout.checkpoint_prefix("coarse"),
            PathBuf::from("/train/coarse/checkpoints/snapshot")
        );
        assert_eq!(
            layout.recovery_checkpoint_prefix("fine"),
            PathBuf::from("/train/fine/recovery_checkpoints/snapshot")
        );
    }

    #[test]
    fn test_reserved_names() {
        assert!(is_reserved_name("checkpoints"));
        assert!(is_reserved_name("testlogs"));
        assert!(!is_reserved_name("stage1"));
    }
}
