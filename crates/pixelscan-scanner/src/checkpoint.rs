//! Crash-safe batch progress.
//!
//! One checkpoint file per batch id, rewritten atomically (temp file, fsync,
//! rename) so a reader never observes a partial write.

use crate::error::CheckpointError;
use pixelscan_core::{BatchId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Current checkpoint format version; bump on breaking changes.
pub const CHECKPOINT_VERSION: u32 = 1;

/// A domain whose scan ended in failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedDomain {
    pub domain: String,
    pub reason: String,
}

/// Which list of a [`Checkpoint`] holds a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Completed,
    Failed,
    Remaining,
}

/// Progress of one batch.
///
/// Every domain is in exactly one of `completed`, `failed` or `remaining`.
/// The lists are meant to be read; move domains between them with the
/// `mark_*` and `add_remaining` methods so the lookup index stays in step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub version: u32,
    pub batch_id: String,
    pub completed: Vec<String>,
    pub failed: Vec<FailedDomain>,
    pub remaining: Vec<String>,
    pub started_at: Timestamp,
    pub last_updated_at: Timestamp,
    pub elapsed_seconds: f64,
    #[serde(skip)]
    slots: HashMap<String, Slot>,
}

impl Checkpoint {
    #[must_use]
    pub fn new(batch_id: &BatchId, remaining: Vec<String>) -> Self {
        let now = Timestamp::now();
        let mut checkpoint = Self {
            version: CHECKPOINT_VERSION,
            batch_id: batch_id.to_string(),
            completed: Vec::new(),
            failed: Vec::new(),
            remaining: Vec::new(),
            started_at: now,
            last_updated_at: now,
            elapsed_seconds: 0.0,
            slots: HashMap::new(),
        };
        for domain in remaining {
            checkpoint.add_remaining(&domain);
        }
        checkpoint
    }

    /// Checkpoint file for a batch.
    #[must_use]
    pub fn path(dir: &Path, batch_id: &BatchId) -> PathBuf {
        file_path(dir, batch_id.as_str(), "json")
    }

    /// Load the checkpoint for `batch_id`, or `None` if there is none.
    pub fn load(dir: &Path, batch_id: &BatchId) -> Result<Option<Self>, CheckpointError> {
        let path = Self::path(dir, batch_id);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut checkpoint: Self = serde_json::from_str(&content)?;
        if checkpoint.version != CHECKPOINT_VERSION {
            return Err(CheckpointError::VersionMismatch {
                found: checkpoint.version,
                expected: CHECKPOINT_VERSION,
            });
        }
        if checkpoint.batch_id != batch_id.as_str() {
            return Err(CheckpointError::BatchMismatch {
                found: checkpoint.batch_id,
                expected: batch_id.to_string(),
            });
        }
        checkpoint.reindex();
        Ok(Some(checkpoint))
    }

    /// Stamp and persist atomically.
    pub fn save(&mut self, dir: &Path) -> Result<(), CheckpointError> {
        self.last_updated_at = Timestamp::now();
        self.elapsed_seconds = self.last_updated_at.seconds_since(&self.started_at);

        let path = file_path(dir, &self.batch_id, "json");
        let temp_path = file_path(dir, &self.batch_id, "tmp");
        let content = serde_json::to_string_pretty(self)?;

        {
            let mut file = std::fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }
        std::fs::rename(&temp_path, &path)?;

        Ok(())
    }

    /// Move a domain to `completed`.
    pub fn mark_completed(&mut self, domain: &str) {
        self.forget(domain);
        self.completed.push(domain.to_string());
        self.slots.insert(domain.to_string(), Slot::Completed);
    }

    /// Move a domain to `failed`.
    pub fn mark_failed(&mut self, domain: &str, reason: impl Into<String>) {
        self.forget(domain);
        self.failed.push(FailedDomain {
            domain: domain.to_string(),
            reason: reason.into(),
        });
        self.slots.insert(domain.to_string(), Slot::Failed);
    }

    /// Queue a domain unless it is already tracked.
    pub fn add_remaining(&mut self, domain: &str) {
        if !self.slots.contains_key(domain) {
            self.remaining.push(domain.to_string());
            self.slots.insert(domain.to_string(), Slot::Remaining);
        }
    }

    /// Drop every queued domain, keeping terminal ones.
    pub fn clear_remaining(&mut self) {
        self.slots.retain(|_, slot| *slot != Slot::Remaining);
        self.remaining.clear();
    }

    /// Whether the domain already reached a terminal state.
    #[must_use]
    pub fn is_terminal(&self, domain: &str) -> bool {
        matches!(self.slots.get(domain), Some(Slot::Completed | Slot::Failed))
    }

    fn forget(&mut self, domain: &str) {
        match self.slots.remove(domain) {
            Some(Slot::Remaining) => remove_first(&mut self.remaining, |d| d == domain),
            Some(Slot::Completed) => remove_first(&mut self.completed, |d| d == domain),
            Some(Slot::Failed) => remove_first(&mut self.failed, |f| f.domain == domain),
            None => {}
        }
    }

    /// Rebuild the lookup index from the lists, later lists winning.
    fn reindex(&mut self) {
        self.slots.clear();
        for domain in &self.remaining {
            self.slots.insert(domain.clone(), Slot::Remaining);
        }
        for domain in &self.completed {
            self.slots.insert(domain.clone(), Slot::Completed);
        }
        for failed in &self.failed {
            self.slots.insert(failed.domain.clone(), Slot::Failed);
        }
    }
}

fn remove_first<T>(list: &mut Vec<T>, matches: impl Fn(&T) -> bool) {
    if let Some(idx) = list.iter().position(matches) {
        list.remove(idx);
    }
}

fn file_path(dir: &Path, batch_id: &str, extension: &str) -> PathBuf {
    dir.join(format!("{batch_id}.checkpoint.{extension}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn batch() -> BatchId {
        BatchId::new("batch-1").expect("valid batch id")
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().expect("tempdir");
        let mut checkpoint = Checkpoint::new(&batch(), vec!["a.com".into(), "b.com".into()]);
        checkpoint.mark_completed("a.com");
        checkpoint.save(dir.path()).expect("save");

        assert!(!dir.path().join("batch-1.checkpoint.tmp").exists());

        let loaded = Checkpoint::load(dir.path(), &batch())
            .expect("load")
            .expect("present");
        assert_eq!(loaded.completed, vec!["a.com"]);
        assert_eq!(loaded.remaining, vec!["b.com"]);
        assert_eq!(loaded.started_at, checkpoint.started_at);
    }

    #[test]
    fn test_missing_checkpoint() {
        let dir = TempDir::new().expect("tempdir");
        assert!(Checkpoint::load(dir.path(), &batch()).expect("load").is_none());
    }

    #[test]
    fn test_version_mismatch() {
        let dir = TempDir::new().expect("tempdir");
        let mut checkpoint = Checkpoint::new(&batch(), Vec::new());
        checkpoint.version = CHECKPOINT_VERSION + 1;
        checkpoint.save(dir.path()).expect("save");

        let err = Checkpoint::load(dir.path(), &batch()).expect_err("version");
        assert!(matches!(err, CheckpointError::VersionMismatch { .. }));
    }

    #[test]
    fn test_corrupt_checkpoint() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(Checkpoint::path(dir.path(), &batch()), "{\"version\": 1, \"batch").expect("write");
        let err = Checkpoint::load(dir.path(), &batch()).expect_err("corrupt");
        assert!(matches!(err, CheckpointError::Corrupt(_)));
    }

    #[test]
    fn test_domain_in_exactly_one_set() {
        let mut checkpoint = Checkpoint::new(&batch(), vec!["a.com".into(), "b.com".into()]);
        checkpoint.mark_failed("a.com", "timeout");
        checkpoint.mark_completed("a.com");
        checkpoint.add_remaining("a.com");
        checkpoint.add_remaining("b.com");

        assert_eq!(checkpoint.completed, vec!["a.com"]);
        assert!(checkpoint.failed.is_empty());
        assert_eq!(checkpoint.remaining, vec!["b.com"]);
        assert!(checkpoint.is_terminal("a.com"));
        assert!(!checkpoint.is_terminal("b.com"));
    }

    #[test]
    fn test_loaded_checkpoint_answers_membership() {
        let dir = TempDir::new().expect("tempdir");
        let domains: Vec<String> = (0..5000).map(|i| format!("site{i}.example")).collect();
        let mut checkpoint = Checkpoint::new(&batch(), domains.clone());
        for domain in domains.iter().step_by(2) {
            checkpoint.mark_completed(domain);
        }
        checkpoint.mark_failed("site1.example", "timeout");
        checkpoint.save(dir.path()).expect("save");

        let mut loaded = Checkpoint::load(dir.path(), &batch())
            .expect("load")
            .expect("present");
        assert_eq!(loaded.completed.len(), 2500);
        assert_eq!(loaded.remaining.len(), 2499);
        assert!(loaded.is_terminal("site0.example"));
        assert!(loaded.is_terminal("site1.example"));
        assert!(!loaded.is_terminal("site3.example"));

        loaded.mark_completed("site1.example");
        loaded.add_remaining("site4.example");
        assert!(loaded.failed.is_empty());
        assert_eq!(loaded.completed.len(), 2501);
        assert_eq!(loaded.remaining.len(), 2499);

        loaded.clear_remaining();
        loaded.add_remaining("site3.example");
        loaded.add_remaining("site2.example");
        assert_eq!(loaded.remaining, vec!["site3.example"]);
    }

    #[test]
    fn test_serialized_field_names() {
        let checkpoint = Checkpoint::new(&batch(), vec!["a.com".into()]);
        let json = serde_json::to_value(&checkpoint).expect("serialize");
        for key in ["version", "batchId", "completed", "failed", "remaining", "startedAt", "lastUpdatedAt", "elapsedSeconds"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
