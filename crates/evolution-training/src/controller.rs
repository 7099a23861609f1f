//! Multi-stage ("evolution") training on top of a single-stage trainer.

use crate::catalog::{CheckpointCatalog, FsCatalog};
use crate::config::EvolutionConfig;
use crate::coordinator::Coordinator;
use crate::error::{TrainingError, TrainingResult};
use crate::layout::StageLayout;
use crate::sequencer::{resolve_stage, Resolution};
use crate::snapshot::SnapshotRef;
use crate::stage::{CurrentStage, StageList};
use crate::trainer::{
    CheckpointRestorer, MainloopOptions, RestoreOptions, RestoreReport, StageTrainer, GLOBAL_STEP_VAR,
};
use crate::transition::{plan_transition, TrainStatus};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What `load_checkpoint` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Restored { path: PathBuf, report: RestoreReport },
    /// No checkpoint given or found; variables keep their initialized values.
    Nothing,
}

/// Trains a list of stages one after another.
///
/// Each instance trains exactly one stage: the one resolved from the training
/// directory at construction. When that stage finishes, the next stage's
/// directory is created and `mainloop` reports `Unfinished`, so a fresh
/// instance (usually in a fresh process) continues with the next stage.
pub struct EvolutionTrainer<T, R> {
    layout: StageLayout,
    current: CurrentStage,
    resolution: Resolution,
    stage_dir: PathBuf,
    restorer: R,
    trainer: T,
}

impl<T, R> std::fmt::Debug for EvolutionTrainer<T, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvolutionTrainer")
            .field("layout", &self.layout)
            .field("current", &self.current.name())
            .field("resolution", &self.resolution)
            .finish_non_exhaustive()
    }
}

impl<T, R> EvolutionTrainer<T, R>
where
    T: StageTrainer,
    R: CheckpointRestorer<T::Session>,
{
    /// Resolves the current stage from `train_dir` and creates its trainer.
    ///
    /// # Arguments
    /// * `session` - Session handed to the single-stage trainer
    /// * `train_dir` - Directory holding one subdirectory per stage
    /// * `stages` - Stage names in training order; each must be a valid, unique directory name
    /// * `force_stage` - Use this stage instead of the resolved one
    /// * `restorer` - Restores variables in `load_checkpoint`
    pub fn new<I, S>(
        session: T::Session,
        train_dir: impl Into<PathBuf>,
        stages: I,
        force_stage: Option<&str>,
        restorer: R,
    ) -> TrainingResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_catalog(session, train_dir, stages, force_stage, restorer, &FsCatalog)
    }

    pub fn from_config(session: T::Session, config: &EvolutionConfig, restorer: R) -> TrainingResult<Self> {
        let stages = config.validate()?;
        Self::build(
            session,
            StageLayout::new(config.train_dir.clone()),
            stages,
            config.force_stage.as_deref(),
            restorer,
            &FsCatalog,
        )
    }

    /// Like [`EvolutionTrainer::new`], reading directory state through `catalog`.
    pub fn with_catalog<I, S>(
        session: T::Session,
        train_dir: impl Into<PathBuf>,
        stages: I,
        force_stage: Option<&str>,
        restorer: R,
        catalog: &dyn CheckpointCatalog,
    ) -> TrainingResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let stages = StageList::new(stages)?;
        Self::build(session, StageLayout::new(train_dir), stages, force_stage, restorer, catalog)
    }

    fn build(
        session: T::Session,
        layout: StageLayout,
        stages: StageList,
        force_stage: Option<&str>,
        restorer: R,
        catalog: &dyn CheckpointCatalog,
    ) -> TrainingResult<Self> {
        let resolution = resolve_stage(&stages, &layout, force_stage, catalog)?;

        let current = stages.stage(&resolution.current_stage)?;
        if !current.is_first() && resolution.snapshot.is_none() {
            return Err(TrainingError::MissingSeedSnapshot(resolution.current_stage));
        }

        let stage_dir = layout.stage_dir(current.name());
        let trainer = T::new(session, &stage_dir)?;

        Ok(Self { layout, current, resolution, stage_dir, restorer, trainer })
    }

    pub fn session(&self) -> &T::Session {
        self.trainer.session()
    }

    pub fn coordinator(&self) -> &Coordinator {
        self.trainer.coordinator()
    }

    pub fn global_step(&self) -> u64 {
        self.trainer.global_step()
    }

    /// The current stage as a value comparable to stage names.
    pub fn current_stage(&self) -> CurrentStage {
        self.current.clone()
    }

    /// The snapshot `load_checkpoint` uses when no path is given.
    pub fn init_snapshot(&self) -> Option<&SnapshotRef> {
        self.resolution.snapshot.as_ref()
    }

    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    pub fn stages(&self) -> &StageList {
        self.current.stages()
    }

    pub fn train_dir(&self) -> &Path {
        self.layout.train_dir()
    }

    pub fn stage_dir(&self) -> &Path {
        &self.stage_dir
    }

    pub fn current_stage_lt(&self, stage: &str) -> TrainingResult<bool> {
        self.current_stage().less_than(stage)
    }

    pub fn current_stage_le(&self, stage: &str) -> TrainingResult<bool> {
        self.current_stage().less_equal(stage)
    }

    pub fn current_stage_gt(&self, stage: &str) -> TrainingResult<bool> {
        self.current_stage().greater_than(stage)
    }

    pub fn current_stage_ge(&self, stage: &str) -> TrainingResult<bool> {
        self.current_stage().greater_equal(stage)
    }

    pub fn current_stage_eq(&self, stage: &str) -> TrainingResult<bool> {
        self.current_stage().equals(stage)
    }

    pub fn current_stage_ne(&self, stage: &str) -> TrainingResult<bool> {
        self.current_stage().not_equals(stage)
    }

    pub fn current_stage_in<I, S>(&self, stages: I) -> TrainingResult<bool>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.current_stage().is_in(stages)
    }

    /// Restores variables from a checkpoint.
    ///
    /// With an explicit, non-empty `checkpoint_path` exactly that file is restored. Otherwise
    /// the resolved init snapshot is used; if it belongs to the previous stage,
    /// `global_step` is not restored so the new stage counts from its initial value.
    /// `remove_nonfinite_checkpoints` only applies to the init snapshot.
    pub fn load_checkpoint(
        &self,
        checkpoint_path: Option<&Path>,
        verbose: bool,
        remove_nonfinite_checkpoints: bool,
    ) -> TrainingResult<LoadOutcome> {
        if let Some(path) = checkpoint_path.filter(|p| !p.as_os_str().is_empty()) {
            info!(path = %path.display(), "loading checkpoint");
            let options = RestoreOptions { verbose, ..Default::default() };
            let report = self.restorer.restore(self.session(), path, &options)?;
            return Ok(LoadOutcome::Restored { path: path.to_path_buf(), report });
        }

        let Some(snapshot) = &self.resolution.snapshot else {
            info!("nothing to restore, no checkpoint found");
            return Ok(LoadOutcome::Nothing);
        };

        let ignore_vars = if self.resolution.seeds_from_previous_stage() {
            vec![GLOBAL_STEP_VAR.to_string()]
        } else {
            Vec::new()
        };
        let options = RestoreOptions { ignore_vars, verbose, remove_nonfinite_checkpoints };

        info!(
            path = %snapshot.path.display(),
            evolution = %snapshot.stage,
            iteration = snapshot.iteration,
            "loading checkpoint"
        );
        let report = self.restorer.restore(self.session(), &snapshot.path, &options)?;
        Ok(LoadOutcome::Restored { path: snapshot.path.clone(), report })
    }

    /// Runs the single-stage main loop for the current stage.
    ///
    /// A `Finished` stage with a successor creates the successor's directory and
    /// returns `Unfinished`. The last stage returns `Finished`. Other statuses
    /// pass through.
    pub fn mainloop(&mut self, options: MainloopOptions<T::Op>) -> TrainingResult<TrainStatus> {
        options.validate()?;

        let current = self.current_stage();
        info!(evolution = %current, "train evolution");
        let status = self.trainer.mainloop(options)?;

        match status {
            TrainStatus::Finished => info!(evolution = %current, "training finished for evolution"),
            TrainStatus::Diverged => warn!(evolution = %current, "training diverged"),
            _ => {}
        }

        let next_dir = current.next().map(|next| self.layout.stage_dir(next));
        let transition = plan_transition(status, next_dir);
        if let Some(dir) = &transition.create_dir {
            std::fs::create_dir_all(dir)?;
            info!(dir = %dir.display(), "created directory for next evolution");
        }

        Ok(transition.status)
    }
}
