use std::path::PathBuf;
use thiserror::Error;

pub type TrainingResult<T> = std::result::Result<T, TrainingError>;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("evolution list is empty")]
    EmptyStageList,

    #[error("there are at least two evolutions named \"{0}\"")]
    DuplicateStage(String),

    #[error("\"{0}\" is not a valid evolution name")]
    ReservedStageName(String),

    #[error("{0} is not in the evolution list")]
    StageNotInList(String),

    #[error("\"{0}\" is not the first evolution and no init snapshot was found for the previous evolution")]
    MissingSeedSnapshot(String),

    #[error("unknown evolution \"{0}\"")]
    UnknownStage(String),

    #[error("checkpoint contains non-finite values: {}", .path.display())]
    NonFiniteCheckpoint { path: PathBuf },

    #[error("restore error: {0}")]
    Restore(String),

    #[error("invalid evolution config: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TrainingError {
    /// True for errors raised while validating the stage setup.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::EmptyStageList
                | Self::DuplicateStage(_)
                | Self::ReservedStageName(_)
                | Self::StageNotInList(_)
                | Self::MissingSeedSnapshot(_)
                | Self::Config(_)
        )
    }
}
