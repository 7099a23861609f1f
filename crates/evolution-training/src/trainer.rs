//! Contracts of the collaborators the evolution trainer delegates to.

use crate::catalog::remove_checkpoint_files;
use crate::coordinator::Coordinator;
use crate::error::{TrainingError, TrainingResult};
use crate::transition::TrainStatus;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Name of the step counter variable in a checkpoint.
pub const GLOBAL_STEP_VAR: &str = "global_step";

/// Test callback run by the main loop at a fixed iteration interval.
pub type TestFn = Box<dyn FnMut() -> anyhow::Result<()> + Send>;

/// Single-stage trainer that owns the training loop and checkpoint I/O of one
/// stage directory.
pub trait StageTrainer: Sized {
    /// Execution session handle shared with checkpoint restoration.
    type Session;
    /// Operation type run by the main loop (train, summary and display ops).
    type Op;

    /// Creates a trainer whose checkpoints, logs and pid file live in `stage_dir`.
    fn new(session: Self::Session, stage_dir: &Path) -> TrainingResult<Self>;

    fn session(&self) -> &Self::Session;

    fn coordinator(&self) -> &Coordinator;

    fn global_step(&self) -> u64;

    /// Runs training until `max_iter`, the stop time, a stop request or divergence.
    fn mainloop(&mut self, options: MainloopOptions<Self::Op>) -> TrainingResult<TrainStatus>;
}

/// Parameters of a single-stage main loop. Passed through unchanged.
pub struct MainloopOptions<Op> {
    /// Maximum iteration number.
    pub max_iter: u64,
    pub train_ops: Vec<Op>,
    /// Iterations between checkpoints.
    pub saver_interval: u64,
    pub saver_max_to_keep: usize,
    /// Variables to save. Must contain `global_step` when set; `None` saves
    /// the step counter and all trainable variables.
    pub saver_var_list: Option<Vec<String>>,
    /// Time after the last checkpoint that triggers a recovery checkpoint.
    pub recovery_saver_interval: Duration,
    pub summary_interval_ops: Vec<(u64, Op)>,
    pub display_interval: u64,
    pub display_str_ops: Vec<(String, Op)>,
    /// Called before the train ops at their interval.
    pub test_interval_fns: Vec<(u64, TestFn)>,
    /// Interval for logging cpu/mem usage and iterations per second.
    pub runstats_interval: Option<u64>,
    pub trace_interval: Option<u64>,
    pub stop_time: Option<DateTime<Utc>>,
}

impl<Op> MainloopOptions<Op> {
    #[must_use]
    pub fn new(max_iter: u64, train_ops: Vec<Op>) -> Self {
        Self {
            max_iter,
            train_ops,
            saver_interval: 10_000,
            saver_max_to_keep: 10,
            saver_var_list: None,
            recovery_saver_interval: Duration::from_secs(10 * 60),
            summary_interval_ops: Vec::new(),
            display_interval: 100,
            display_str_ops: Vec::new(),
            test_interval_fns: Vec::new(),
            runstats_interval: None,
            trace_interval: None,
            stop_time: None,
        }
    }

    #[must_use]
    pub fn with_saver(mut self, interval: u64, max_to_keep: usize) -> Self {
        self.saver_interval = interval;
        self.saver_max_to_keep = max_to_keep;
        self
    }

    #[must_use]
    pub fn with_saver_var_list(mut self, vars: Vec<String>) -> Self {
        self.saver_var_list = Some(vars);
        self
    }

    #[must_use]
    pub fn with_recovery_saver_interval(mut self, interval: Duration) -> Self {
        self.recovery_saver_interval = interval;
        self
    }

    #[must_use]
    pub fn with_summary_op(mut self, interval: u64, op: Op) -> Self {
        self.summary_interval_ops.push((interval, op));
        self
    }

    #[must_use]
    pub fn with_display_op(mut self, label: impl Into<String>, op: Op) -> Self {
        self.display_str_ops.push((label.into(), op));
        self
    }

    #[must_use]
    pub fn with_display_interval(mut self, interval: u64) -> Self {
        self.display_interval = interval;
        self
    }

    #[must_use]
    pub fn with_test_fn(mut self, interval: u64, test_fn: TestFn) -> Self {
        self.test_interval_fns.push((interval, test_fn));
        self
    }

    #[must_use]
    pub fn with_runstats_interval(mut self, interval: u64) -> Self {
        self.runstats_interval = Some(interval);
        self
    }

    #[must_use]
    pub fn with_trace_interval(mut self, interval: u64) -> Self {
        self.trace_interval = Some(interval);
        self
    }

    #[must_use]
    pub fn with_stop_time(mut self, stop_time: DateTime<Utc>) -> Self {
        self.stop_time = Some(stop_time);
        self
    }

    /// Checks the one rule this layer relies on: a custom `saver_var_list` keeps
    /// `global_step`. Intervals are left to the single-stage trainer.
    pub fn validate(&self) -> TrainingResult<()> {
        if let Some(vars) = &self.saver_var_list {
            if !vars.iter().any(|v| v == GLOBAL_STEP_VAR) {
                return Err(TrainingError::Config(format!(
                    "saver_var_list must contain {GLOBAL_STEP_VAR}"
                )));
            }
        }
        Ok(())
    }
}

impl<Op> fmt::Debug for MainloopOptions<Op> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainloopOptions")
            .field("max_iter", &self.max_iter)
            .field("train_ops", &self.train_ops.len())
            .field("saver_interval", &self.saver_interval)
            .field("saver_max_to_keep", &self.saver_max_to_keep)
            .field("saver_var_list", &self.saver_var_list)
            .field("recovery_saver_interval", &self.recovery_saver_interval)
            .field("display_interval", &self.display_interval)
            .field("runstats_interval", &self.runstats_interval)
            .field("trace_interval", &self.trace_interval)
            .field("stop_time", &self.stop_time)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreOptions {
    /// Variables that keep their initialized value.
    pub ignore_vars: Vec<String>,
    /// Log which variables were restored or skipped.
    pub verbose: bool,
    /// Delete a checkpoint with NaN/Inf values and fail instead of loading it.
    pub remove_nonfinite_checkpoints: bool,
}

impl RestoreOptions {
    #[must_use]
    pub fn ignores(&self, var: &str) -> bool {
        self.ignore_vars.iter().any(|v| v == var)
    }
}

/// Variables touched by a restore.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: Vec<String>,
    pub skipped: Vec<String>,
}

/// Restores variables of a session by name from a checkpoint.
pub trait CheckpointRestorer<S: ?Sized> {
    fn restore(&self, session: &S, path: &Path, options: &RestoreOptions) -> TrainingResult<RestoreReport>;
}

impl<S, F> CheckpointRestorer<S> for F
where
    S: ?Sized,
    F: Fn(&S, &Path, &RestoreOptions) -> TrainingResult<RestoreReport>,
{
    fn restore(&self, session: &S, path: &Path, options: &RestoreOptions) -> TrainingResult<RestoreReport> {
        self(session, path, options)
    }
}

/// Non-finite policy for restorer implementations.
///
/// With `remove_nonfinite_checkpoints` set, a checkpoint that is not finite is
/// deleted from disk and `NonFiniteCheckpoint` is returned. Without it the
/// checkpoint is accepted as is.
pub fn check_finite(path: &Path, all_finite: bool, options: &RestoreOptions) -> TrainingResult<()> {
    if all_finite || !options.remove_nonfinite_checkpoints {
        return Ok(());
    }
    warn!(path = %path.display(), "checkpoint contains non-finite values, removing it");
    remove_checkpoint_files(path)?;
    Err(TrainingError::NonFiniteCheckpoint { path: path.to_path_buf() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mainloop_options_defaults() {
        let options = MainloopOptions::new(1000, vec!["train"]);

        assert_eq!(options.saver_interval, 10_000);
        assert_eq!(options.recovery_saver_interval, Duration::from_secs(600));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_saver_var_list_requires_global_step() {
        let options = MainloopOptions::new(10, vec![()]).with_saver_var_list(vec!["w".to_string()]);
        assert!(options.validate().is_err());

        let options = MainloopOptions::new(10, vec![()])
            .with_saver_var_list(vec!["w".to_string(), GLOBAL_STEP_VAR.to_string()]);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_intervals_are_passed_through_unchecked() {
        let options = MainloopOptions::new(10, vec![()])
            .with_summary_op(0, ())
            .with_display_interval(0)
            .with_saver(0, 3);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_check_finite_removes_when_requested() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("snapshot-5");
        std::fs::write(temp.path().join("snapshot-5.index"), b"").unwrap();

        let keep = RestoreOptions::default();
        assert!(check_finite(&path, false, &keep).is_ok());
        assert!(temp.path().join("snapshot-5.index").exists());

        let remove = RestoreOptions { remove_nonfinite_checkpoints: true, ..Default::default() };
        assert!(check_finite(&path, true, &remove).is_ok());
        let err = check_finite(&path, false, &remove).unwrap_err();
        assert!(matches!(err, TrainingError::NonFiniteCheckpoint { .. }));
        assert!(!temp.path().join("snapshot-5.index").exists());
    }
}
