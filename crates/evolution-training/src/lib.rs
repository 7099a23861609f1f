//! Evolution Training
//!
//! Multi-stage ("evolution") training on top of a single-stage trainer:
//! - Resolving the active stage and its seed checkpoint from the training directory
//! - Comparing the active stage against stage names by list position
//! - Restoring the seed checkpoint (`EvolutionTrainer::load_checkpoint`)
//! - Advancing to the next stage when a stage finishes (`EvolutionTrainer::mainloop`)

pub mod catalog;
pub mod config;
pub mod controller;
pub mod coordinator;
pub mod error;
pub mod layout;
pub mod sequencer;
pub mod snapshot;
pub mod stage;
pub mod trainer;
pub mod transition;

pub use catalog::{remove_checkpoint_files, CheckpointCatalog, FsCatalog, MemoryCatalog};
pub use config::EvolutionConfig;
pub use controller::{EvolutionTrainer, LoadOutcome};
pub use coordinator::Coordinator;
pub use error::{TrainingError, TrainingResult};
pub use layout::StageLayout;
pub use sequencer::{resolve_stage, Resolution};
pub use snapshot::SnapshotRef;
pub use stage::{CurrentStage, StageList};
pub use trainer::{
    check_finite, CheckpointRestorer, MainloopOptions, RestoreOptions, RestoreReport, StageTrainer, TestFn,
    GLOBAL_STEP_VAR,
};
pub use transition::{plan_transition, StageTransition, TrainStatus};
