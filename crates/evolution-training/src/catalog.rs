//! Checkpoint discovery.
//!
//! Stage resolution only ever asks two questions of the filesystem: does a
//! directory exist, and which checkpoints exist for a prefix. `CheckpointCatalog`
//! captures exactly that so resolution can run against an in-memory listing.

use crate::error::TrainingResult;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

pub trait CheckpointCatalog {
    fn is_dir(&self, path: &Path) -> bool;

    /// Returns `(iteration, checkpoint_path)` pairs for a checkpoint file prefix
    /// such as `<dir>/snapshot`. Order is unspecified.
    fn list_checkpoints(&self, prefix: &Path) -> TrainingResult<Vec<(u64, PathBuf)>>;
}

/// Catalog backed by the real filesystem.
///
/// A checkpoint `<dir>/snapshot-1000` may consist of several files
/// (`snapshot-1000.index`, `snapshot-1000.data-00000-of-00001`, ...); they
/// are reported once.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsCatalog;

impl CheckpointCatalog for FsCatalog {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_checkpoints(&self, prefix: &Path) -> TrainingResult<Vec<(u64, PathBuf)>> {
        let (Some(dir), Some(stem)) = (prefix.parent(), prefix.file_name().and_then(|s| s.to_str()))
        else {
            return Ok(Vec::new());
        };

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut found = BTreeMap::new();
        for entry in entries {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some((iteration, digits)) = parse_iteration(stem, file_name) {
                found
                    .entry((iteration, digits.to_string()))
                    .or_insert_with(|| dir.join(format!("{stem}-{digits}")));
            }
        }

        debug!(prefix = %prefix.display(), count = found.len(), "listed checkpoints");
        Ok(found.into_iter().map(|((iteration, _), path)| (iteration, path)).collect())
    }
}

/// Parses `<stem>-<iter>` optionally followed by `.<ext>`. Returns the
/// iteration and its digits as written, which may be zero-padded.
fn parse_iteration<'a>(stem: &str, file_name: &'a str) -> Option<(u64, &'a str)> {
    let rest = file_name.strip_prefix(stem)?.strip_prefix('-')?;
    let digits_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    if digits_end == 0 {
        return None;
    }
    let (digits, tail) = rest.split_at(digits_end);
    if !tail.is_empty() && !tail.starts_with('.') {
        return None;
    }
    digits.parse().ok().map(|iteration| (iteration, digits))
}

/// Deletes every file belonging to the checkpoint at `path`
/// (`path` itself and `path.*`). Returns the number of removed files.
pub fn remove_checkpoint_files(path: &Path) -> TrainingResult<usize> {
    let (Some(dir), Some(name)) = (path.parent(), path.file_name().and_then(|s| s.to_str())) else {
        return Ok(0);
    };
    let dotted = format!("{name}.");

    let mut removed = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if (file_name == name || file_name.starts_with(&dotted)) && entry.path().is_file() {
            std::fs::remove_file(entry.path())?;
            removed += 1;
        }
    }

    debug!(path = %path.display(), removed, "removed checkpoint files");
    Ok(removed)
}

/// In-memory catalog, for resolving stages without touching the disk.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    dirs: HashSet<PathBuf>,
    checkpoints: HashMap<PathBuf, Vec<(u64, PathBuf)>>,
}

impl MemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.dirs.insert(path.into());
        self
    }

    /// Registers checkpoint `<prefix>-<iteration>`. Parent directories count as existing.
    #[must_use]
    pub fn with_checkpoint(mut self, prefix: impl Into<PathBuf>, iteration: u64) -> Self {
        let prefix = prefix.into();
        let name = prefix.file_name().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let path = prefix.with_file_name(format!("{name}-{iteration}"));
        for ancestor in prefix.ancestors().skip(1) {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            self.dirs.insert(ancestor.to_path_buf());
        }
        self.checkpoints.entry(prefix).or_default().push((iteration, path));
        self
    }
}

impl CheckpointCatalog for MemoryCatalog {
    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.contains(path)
    }

    fn list_checkpoints(&self, prefix: &Path) -> TrainingResult<Vec<(u64, PathBuf)>> {
        Ok(self.checkpoints.get(prefix).cloned().unwrap_or_default())
    }
}
