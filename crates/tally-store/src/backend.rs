//! Storage backends for the whole-document execution store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tally_core::write_text_atomic;
use thiserror::Error;

use crate::model::ExecutionRecord;

/// Errors surfaced by store load/save.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read store file {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// The document exists but does not parse; the caller must not continue
    /// with a silently empty store.
    #[error("store file {path} is malformed")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write store file {path}: {reason}")]
    Write { path: String, reason: String },
    #[error("failed to encode store document")]
    Encode(#[source] serde_json::Error),
}

/// Whole-document load/save seam so the repository can run against a file in
/// production and plain memory in tests.
pub trait StoreBackend: Send + Sync {
    fn load(&self) -> Result<HashMap<String, ExecutionRecord>, StoreError>;
    fn save(&self, records: &HashMap<String, ExecutionRecord>) -> Result<(), StoreError>;
}

/// File-backed store: one JSON document, read wholesale at startup and
/// overwritten atomically after every mutation.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StoreBackend for FileBackend {
    fn load(&self) -> Result<HashMap<String, ExecutionRecord>, StoreError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let raw = std::fs::read_to_string(&self.path).map_err(|source| StoreError::Read {
            path: self.path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| StoreError::Malformed {
            path: self.path.display().to_string(),
            source,
        })
    }

    fn save(&self, records: &HashMap<String, ExecutionRecord>) -> Result<(), StoreError> {
        let encoded = serde_json::to_string_pretty(records).map_err(StoreError::Encode)?;
        write_text_atomic(&self.path, &encoded).map_err(|error| StoreError::Write {
            path: self.path.display().to_string(),
            reason: error.to_string(),
        })
    }
}

/// In-memory backend used by tests; retains the last saved document so
/// persistence calls can be asserted on.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    saved: Mutex<HashMap<String, ExecutionRecord>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(records: HashMap<String, ExecutionRecord>) -> Self {
        Self {
            saved: Mutex::new(records),
        }
    }

    /// Last document handed to `save`.
    pub fn saved_records(&self) -> HashMap<String, ExecutionRecord> {
        self.saved.lock().expect("memory backend lock").clone()
    }
}

impl StoreBackend for MemoryBackend {
    fn load(&self) -> Result<HashMap<String, ExecutionRecord>, StoreError> {
        Ok(self.saved.lock().expect("memory backend lock").clone())
    }

    fn save(&self, records: &HashMap<String, ExecutionRecord>) -> Result<(), StoreError> {
        *self.saved.lock().expect("memory backend lock") = records.clone();
        Ok(())
    }
}
