//! Persistent record of the last commit, used by undo.
//!
//! The log lives next to the files it describes, as a JSON document in the
//! organized root directory.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the operation log inside a root directory.
pub const HISTORY_FILE_NAME: &str = ".tidyboard_history.json";

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Failed to write history file: {0}")]
    Write(#[source] std::io::Error),

    #[error("Failed to read history file: {0}")]
    Read(#[source] std::io::Error),

    #[error("Invalid history file format: {0}")]
    InvalidFormat(String),
}

pub type HistoryResult<T> = Result<T, HistoryError>;

/// A single file move or rename that was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub original_path: PathBuf,
    pub new_path: PathBuf,
    /// Subfolder the file went into; empty for in-place renames.
    #[serde(default)]
    pub destination: String,
}

/// All operations applied by one commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationLog {
    /// RFC 3339 timestamp of the commit.
    pub timestamp: String,
    pub base_path: PathBuf,
    pub operations: Vec<Operation>,
}

impl OperationLog {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            base_path,
            operations: Vec::new(),
        }
    }

    pub fn with_operations(base_path: PathBuf, operations: Vec<Operation>) -> Self {
        Self {
            operations,
            ..Self::new(base_path)
        }
    }

    pub fn add_operation(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    pub fn history_file_path(base_path: &Path) -> PathBuf {
        base_path.join(HISTORY_FILE_NAME)
    }

    /// Writes this log into `base_path`, replacing any previous one.
    pub fn save(&self, base_path: &Path) -> HistoryResult<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            HistoryError::Write(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;

        fs::write(Self::history_file_path(base_path), json).map_err(HistoryError::Write)
    }

    /// Loads the log stored in `base_path`, if any.
    pub fn load(base_path: &Path) -> HistoryResult<Option<Self>> {
        let history_path = Self::history_file_path(base_path);
        if !history_path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&history_path).map_err(HistoryError::Read)?;
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| HistoryError::InvalidFormat(e.to_string()))
    }

    pub fn delete(base_path: &Path) -> HistoryResult<()> {
        let history_path = Self::history_file_path(base_path);
        if history_path.exists() {
            fs::remove_file(&history_path).map_err(HistoryError::Write)?;
        }
        Ok(())
    }
}
