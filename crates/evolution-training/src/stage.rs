//! Stage lists and the comparison value for the active stage.
//!
//! Stages are ordered by their position in the list. All comparisons go
//! through list indices, never through the lexical order of the names.

use crate::error::{TrainingError, TrainingResult};
use crate::layout::is_reserved_name;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Validated, ordered list of unique stage names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageList {
    names: Arc<[String]>,
}

impl StageList {
    /// Validates and wraps a list of stage names.
    ///
    /// Fails on an empty list, on names that collide with directories owned by
    /// the single-stage trainer, and on duplicates.
    pub fn new<I, S>(names: I) -> TrainingResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();

        if let Some(name) = names.iter().find(|n| is_reserved_name(n)) {
            return Err(TrainingError::ReservedStageName(name.clone()));
        }

        let mut seen = HashSet::new();
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(TrainingError::DuplicateStage(name.clone()));
            }
        }

        if names.is_empty() {
            return Err(TrainingError::EmptyStageList);
        }

        Ok(Self { names: names.into() })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false for a constructed list; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[must_use]
    pub fn first(&self) -> &str {
        &self.names[0]
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Index of `name`, or `UnknownStage`.
    pub fn require(&self, name: &str) -> TrainingResult<usize> {
        self.index_of(name).ok_or_else(|| TrainingError::UnknownStage(name.to_string()))
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Builds the comparison value for `name`.
    pub fn stage(&self, name: &str) -> TrainingResult<CurrentStage> {
        let index = self.require(name)?;
        Ok(CurrentStage { index, stages: self.clone() })
    }
}

/// A stage bound to its list, comparable against raw stage names.
///
/// Every query validates the other name against the list and fails with
/// `UnknownStage` if it is not part of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentStage {
    index: usize,
    stages: StageList,
}

impl CurrentStage {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.stages.names[self.index]
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn stages(&self) -> &StageList {
        &self.stages
    }

    #[must_use]
    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.index + 1 == self.stages.len()
    }

    #[must_use]
    pub fn previous(&self) -> Option<&str> {
        self.index.checked_sub(1).and_then(|i| self.stages.get(i))
    }

    #[must_use]
    pub fn next(&self) -> Option<&str> {
        self.stages.get(self.index + 1)
    }

    /// Orders this stage relative to `other` by list position.
    pub fn compare(&self, other: &str) -> TrainingResult<Ordering> {
        let other_index = self.stages.require(other)?;
        Ok(self.index.cmp(&other_index))
    }

    pub fn equals(&self, other: &str) -> TrainingResult<bool> {
        Ok(self.compare(other)? == Ordering::Equal)
    }

    pub fn not_equals(&self, other: &str) -> TrainingResult<bool> {
        Ok(self.compare(other)? != Ordering::Equal)
    }

    pub fn less_than(&self, other: &str) -> TrainingResult<bool> {
        Ok(self.compare(other)? == Ordering::Less)
    }

    pub fn less_equal(&self, other: &str) -> TrainingResult<bool> {
        Ok(self.compare(other)? != Ordering::Greater)
    }

    pub fn greater_than(&self, other: &str) -> TrainingResult<bool> {
        Ok(self.compare(other)? == Ordering::Greater)
    }

    pub fn greater_equal(&self, other: &str) -> TrainingResult<bool> {
        Ok(self.compare(other)? != Ordering::Less)
    }

    /// True if this stage is one of `names`. Every name must be a known stage.
    pub fn is_in<I, S>(&self, names: I) -> TrainingResult<bool>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut found = false;
        for name in names {
            let name = name.as_ref();
            self.stages.require(name)?;
            found |= name == self.name();
        }
        Ok(found)
    }
}

impl fmt::Display for CurrentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> StageList {
        StageList::new(["a", "b", "c"]).unwrap()
    }

    #[test]
    fn test_stage_list_rejects_empty() {
        let err = StageList::new(Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, TrainingError::EmptyStageList));
    }

    #[test]
    fn test_stage_list_rejects_duplicates() {
        let err = StageList::new(["a", "b", "a"]).unwrap_err();
        assert!(matches!(err, TrainingError::DuplicateStage(name) if name == "a"));
    }

    #[test]
    fn test_stage_list_rejects_reserved_names() {
        for reserved in crate::layout::RESERVED_NAMES {
            let err = StageList::new(["a", reserved]).unwrap_err();
            assert!(matches!(err, TrainingError::ReservedStageName(ref name) if name == reserved));
        }
    }

    #[test]
    fn test_comparisons_use_list_order() {
        // "z" sorts after "a" lexically but comes first in the list
        let stages = StageList::new(["z", "a"]).unwrap();
        let current = stages.stage("z").unwrap();

        assert!(current.less_than("a").unwrap());
        assert!(!current.greater_than("a").unwrap());
    }

    #[test]
    fn test_current_stage_relations() {
        let current = abc().stage("b").unwrap();

        assert!(current.less_than("c").unwrap());
        assert!(current.greater_than("a").unwrap());
        assert!(current.equals("b").unwrap());
        assert!(current.not_equals("a").unwrap());
        assert!(current.less_equal("b").unwrap());
        assert!(current.greater_equal("b").unwrap());
        assert!(!current.greater_equal("c").unwrap());
        assert_eq!(current.to_string(), "b");
    }

    #[test]
    fn test_unknown_stage_fails() {
        let current = abc().stage("b").unwrap();

        let err = current.compare("z").unwrap_err();
        assert!(matches!(err, TrainingError::UnknownStage(name) if name == "z"));
        assert!(current.equals("z").is_err());
        assert!(current.less_than("z").is_err());
    }

    #[test]
    fn test_is_in_validates_every_name() {
        let current = abc().stage("b").unwrap();

        assert!(current.is_in(["a", "b"]).unwrap());
        assert!(!current.is_in(["a", "c"]).unwrap());
        assert!(current.is_in(["b", "z"]).is_err());
    }

    #[test]
    fn test_neighbours() {
        let stages = abc();

        let first = stages.stage("a").unwrap();
        assert!(first.is_first());
        assert_eq!(first.previous(), None);
        assert_eq!(first.next(), Some("b"));

        let last = stages.stage("c").unwrap();
        assert!(last.is_last());
        assert_eq!(last.next(), None);
        assert_eq!(last.previous(), Some("b"));
    }
}
