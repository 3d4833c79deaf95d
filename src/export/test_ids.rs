//! Durable storage of held-out test ids.
//!
//! The test ids are the only output of a preparation run that outlives it:
//! a later evaluation job reloads them to re-fetch exactly the holdout rows
//! without re-deriving the split.

use crate::error::{PrepError, Result};
use crate::sample::SampleId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Storage backend for the test ids of a run.
pub trait TestIdStore {
    /// Persist the test ids of `run`, replacing any earlier record.
    fn save_test_ids(&self, run: &str, ids: &[SampleId]) -> Result<()>;

    /// Load the test ids of `run`.
    fn load_test_ids(&self, run: &str) -> Result<Vec<SampleId>>;
}

/// One persisted record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestIdRecord {
    /// Run name
    pub run: String,

    /// When the record was written
    pub created_at: DateTime<Utc>,

    /// Test ids in split order
    pub test_ids: Vec<SampleId>,
}

/// Stores each run as `<dir>/<run>_test_ids.json`.
#[derive(Debug, Clone)]
pub struct JsonTestIdStore {
    dir: PathBuf,
}

impl JsonTestIdStore {
    /// Create a store rooted at `dir` (created on first save).
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Path of the record of `run`.
    pub fn path_for(&self, run: &str) -> Result<PathBuf> {
        if run.is_empty()
            || run == "."
            || run == ".."
            || run.contains(|c: char| c == '/' || c == '\\')
        {
            return Err(PrepError::Validation(format!("invalid run name: {run:?}")));
        }
        Ok(self.dir.join(format!("{run}_test_ids.json")))
    }

    /// Load the full record of `run`.
    pub fn load_record(&self, run: &str) -> Result<TestIdRecord> {
        let contents = fs::read_to_string(self.path_for(run)?)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

impl TestIdStore for JsonTestIdStore {
    fn save_test_ids(&self, run: &str, ids: &[SampleId]) -> Result<()> {
        let path = self.path_for(run)?;
        fs::create_dir_all(&self.dir)?;

        let record = TestIdRecord {
            run: run.to_string(),
            created_at: Utc::now(),
            test_ids: ids.to_vec(),
        };
        fs::write(&path, serde_json::to_string_pretty(&record)?)?;

        log::info!("Saved {} test ids for run {} to {}", ids.len(), run, path.display());
        Ok(())
    }

    fn load_test_ids(&self, run: &str) -> Result<Vec<SampleId>> {
        Ok(self.load_record(run)?.test_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let store = JsonTestIdStore::new(dir.path().join("holdouts"));

        store.save_test_ids("run-1", &[9, 4, 17]).unwrap();
        assert_eq!(store.load_test_ids("run-1").unwrap(), vec![9, 4, 17]);
        assert!(dir.path().join("holdouts/run-1_test_ids.json").exists());

        let record = store.load_record("run-1").unwrap();
        assert_eq!(record.run, "run-1");
    }

    #[test]
    fn test_save_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = JsonTestIdStore::new(dir.path());

        store.save_test_ids("r", &[1, 2]).unwrap();
        store.save_test_ids("r", &[3]).unwrap();
        assert_eq!(store.load_test_ids("r").unwrap(), vec![3]);
    }

    #[test]
    fn test_missing_run_is_io_error() {
        let dir = TempDir::new().unwrap();
        let store = JsonTestIdStore::new(dir.path());
        assert!(matches!(store.load_test_ids("nope"), Err(PrepError::Io(_))));
    }

    #[test]
    fn test_rejects_path_like_run_names() {
        let store = JsonTestIdStore::new("unused");
        assert!(store.path_for("").is_err());
        assert!(store.path_for("../escape").is_err());
        assert!(store.path_for("a/b").is_err());
        assert!(store.path_for("ok-run_1").is_ok());
    }
}
