//! Reverting the last commit.
//!
//! Undo reads the operation log written after a commit and moves every file
//! back, newest operation first.

use crate::commit::move_file;
use crate::history::{HistoryError, Operation, OperationLog};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum UndoError {
    #[error("Directory not found: {}", .0.display())]
    InvalidBasePath(PathBuf),

    #[error("No previous commit found to undo in {}", .0.display())]
    NothingToUndo(PathBuf),

    #[error(transparent)]
    History(#[from] HistoryError),
}

/// What an undo run restored, skipped and failed on.
#[derive(Debug, Default)]
pub struct UndoReport {
    pub restored_files: usize,
    pub failed_restores: Vec<(PathBuf, String)>,
    /// Files no longer at the location the log recorded.
    pub skipped_files: Vec<(PathBuf, String)>,
    /// Files that sat at an original location and were moved aside.
    pub backups: Vec<PathBuf>,
}

impl UndoReport {
    pub fn total_processed(&self) -> usize {
        self.restored_files + self.failed_restores.len() + self.skipped_files.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed_restores.is_empty() && self.skipped_files.is_empty()
    }
}

enum RestoreFailure {
    Missing(PathBuf, String),
    Failed(PathBuf, String),
}

/// Restores files from the operation log.
pub struct UndoManager;

impl UndoManager {
    /// Undoes the most recent commit in `base_path`.
    ///
    /// A file that now occupies an original location is renamed aside with
    /// a `.bak.<timestamp>` suffix rather than replaced. Files missing from
    /// their recorded location are skipped. The log is deleted only when
    /// every operation was restored.
    ///
    /// ```no_run
    /// use tidyboard::undo::UndoManager;
    /// use std::path::Path;
    ///
    /// match UndoManager::undo(Path::new("/home/me/Downloads")) {
    ///     Ok(report) => println!("Restored {} files", report.restored_files),
    ///     Err(e) => eprintln!("Undo failed: {}", e),
    /// }
    /// ```
    pub fn undo(base_path: &Path) -> Result<UndoReport, UndoError> {
        if !base_path.is_dir() {
            return Err(UndoError::InvalidBasePath(base_path.to_path_buf()));
        }

        let log = OperationLog::load(base_path)?
            .ok_or_else(|| UndoError::NothingToUndo(base_path.to_path_buf()))?;

        let mut report = UndoReport::default();
        for operation in log.operations.iter().rev() {
            match Self::restore_file(operation) {
                Ok(backup) => {
                    report.restored_files += 1;
                    report.backups.extend(backup);
                }
                Err(RestoreFailure::Missing(path, reason)) => {
                    warn!(path = %path.display(), "skipping restore: {}", reason);
                    report.skipped_files.push((path, reason));
                }
                Err(RestoreFailure::Failed(path, reason)) => {
                    warn!(path = %path.display(), "restore failed: {}", reason);
                    report.failed_restores.push((path, reason));
                }
            }
        }

        if report.is_complete_success()
            && let Err(e) = OperationLog::delete(base_path)
        {
            warn!("could not delete history file: {}", e);
        }

        info!(
            restored = report.restored_files,
            skipped = report.skipped_files.len(),
            failed = report.failed_restores.len(),
            "undo finished"
        );
        Ok(report)
    }

    /// Moves one file back, returning the backup path if one was needed.
    fn restore_file(operation: &Operation) -> Result<Option<PathBuf>, RestoreFailure> {
        if fs::symlink_metadata(&operation.new_path).is_err() {
            return Err(RestoreFailure::Missing(
                operation.new_path.clone(),
                "File not found at expected location".to_string(),
            ));
        }

        let mut backup = None;
        if fs::symlink_metadata(&operation.original_path).is_ok() {
            let backup_path = Self::generate_backup_path(&operation.original_path);
            move_file(&operation.original_path, &backup_path).map_err(|e| {
                RestoreFailure::Failed(
                    operation.original_path.clone(),
                    format!("Could not back up conflicting file: {}", e),
                )
            })?;
            backup = Some(backup_path);
        }

        move_file(&operation.new_path, &operation.original_path).map_err(|e| {
            RestoreFailure::Failed(
                operation.new_path.clone(),
                format!("Failed to restore file: {}", e),
            )
        })?;

        Ok(backup)
    }

    /// `file.txt` becomes `file.txt.bak.20251109-143052`; a counter is
    /// appended if that name is taken too.
    fn generate_backup_path(original_path: &Path) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let filename = original_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        let parent = original_path.parent().unwrap_or(Path::new(""));

        let mut candidate = parent.join(format!("{}.bak.{}", filename, timestamp));
        let mut attempt = 1;
        while fs::symlink_metadata(&candidate).is_ok() {
            candidate = parent.join(format!("{}.bak.{}-{}", filename, timestamp, attempt));
            attempt += 1;
        }
        candidate
    }
}
