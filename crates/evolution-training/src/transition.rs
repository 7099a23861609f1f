use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Status returned by a main loop.
///
/// The integer codes are stable and usable as process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainStatus {
    /// `max_iter` reached.
    Finished,
    /// Stopped early (stop time, stop request) or more stages remain.
    Unfinished,
    /// Non-finite loss.
    Diverged,
    Other(i32),
}

impl TrainStatus {
    pub const FINISHED_CODE: i32 = 0;
    pub const UNFINISHED_CODE: i32 = 1;
    pub const DIVERGED_CODE: i32 = 2;

    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::Finished => Self::FINISHED_CODE,
            Self::Unfinished => Self::UNFINISHED_CODE,
            Self::Diverged => Self::DIVERGED_CODE,
            Self::Other(code) => code,
        }
    }

    #[must_use]
    pub fn from_code(code: i32) -> Self {
        match code {
            Self::FINISHED_CODE => Self::Finished,
            Self::UNFINISHED_CODE => Self::Unfinished,
            Self::DIVERGED_CODE => Self::Diverged,
            other => Self::Other(other),
        }
    }
}

impl From<i32> for TrainStatus {
    fn from(code: i32) -> Self {
        Self::from_code(code)
    }
}

/// Result of applying the stage transition rule to a main loop status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTransition {
    pub status: TrainStatus,
    /// Directory of the next stage to create, if training advances.
    pub create_dir: Option<PathBuf>,
}

/// A finished stage with a successor becomes `Unfinished` and asks for the
/// successor's directory. Everything else passes through untouched.
#[must_use]
pub fn plan_transition(status: TrainStatus, next_stage_dir: Option<PathBuf>) -> StageTransition {
    match (status, next_stage_dir) {
        (TrainStatus::Finished, Some(dir)) => {
            StageTransition { status: TrainStatus::Unfinished, create_dir: Some(dir) }
        }
        (status, _) => StageTransition { status, create_dir: None },
    }
}
