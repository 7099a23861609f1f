//! Evolution configuration, loadable from TOML or JSON.

use crate::error::{TrainingError, TrainingResult};
use crate::stage::StageList;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Evolution setup of a training run.
///
/// ```toml
/// train_dir = "runs/flow"
/// stages = ["coarse", "refine", "finetune"]
/// force_stage = "refine"   # optional
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Base directory holding one subdirectory per stage.
    pub train_dir: PathBuf,
    /// Stage names in training order.
    pub stages: Vec<String>,
    #[serde(default)]
    pub force_stage: Option<String>,
}

impl EvolutionConfig {
    #[must_use]
    pub fn new(train_dir: impl Into<PathBuf>, stages: Vec<String>) -> Self {
        Self { train_dir: train_dir.into(), stages, force_stage: None }
    }

    #[must_use]
    pub fn with_force_stage(mut self, stage: impl Into<String>) -> Self {
        self.force_stage = Some(stage.into());
        self
    }

    /// Loads a config file. `.json` files are parsed as JSON, everything else as TOML.
    pub fn load(path: &Path) -> TrainingResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let is_json = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Ok(serde_json::from_str(&contents)?)
        } else {
            Self::from_toml_str(&contents)
        }
    }

    pub fn from_toml_str(contents: &str) -> TrainingResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Validates stage names and the forced stage without touching the disk.
    pub fn validate(&self) -> TrainingResult<StageList> {
        if self.train_dir.as_os_str().is_empty() {
            return Err(TrainingError::Config("train_dir is required".to_string()));
        }
        let stages = StageList::new(self.stages.iter().cloned())?;
        if let Some(forced) = &self.force_stage {
            if !stages.contains(forced) {
                return Err(TrainingError::StageNotInList(forced.clone()));
            }
        }
        Ok(stages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_toml() {
        let config = EvolutionConfig::from_toml_str(
            r#"
            train_dir = "runs/flow"
            stages = ["coarse", "refine"]
            "#,
        )
        .unwrap();

        assert_eq!(config.train_dir, PathBuf::from("runs/flow"));
        assert_eq!(config.stages, vec!["coarse", "refine"]);
        assert_eq!(config.force_stage, None);
        assert_eq!(config.validate().unwrap().len(), 2);
    }

    #[test]
    fn test_load_json_by_extension() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("evo.json");
        std::fs::write(&path, r#"{"train_dir": "t", "stages": ["a", "b"], "force_stage": "b"}"#)
            .unwrap();

        let config = EvolutionConfig::load(&path).unwrap();
        assert_eq!(config.force_stage.as_deref(), Some("b"));
    }

    #[test]
    fn test_validate_rejects_bad_setups() {
        let dup = EvolutionConfig::new("t", vec!["a".into(), "a".into()]);
        assert!(matches!(dup.validate(), Err(TrainingError::DuplicateStage(_))));

        let forced = EvolutionConfig::new("t", vec!["a".into()]).with_force_stage("b");
        assert!(matches!(forced.validate(), Err(TrainingError::StageNotInList(_))));

        let no_dir = EvolutionConfig::new("", vec!["a".into()]);
        assert!(no_dir.validate().unwrap_err().is_configuration());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(matches!(
            EvolutionConfig::from_toml_str("stages = 3"),
            Err(TrainingError::Toml(_))
        ));
    }
}
