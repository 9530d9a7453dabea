//! Folder upload to a sync target.
//!
//! The engine only needs an upload capability: something that takes a local
//! file and reports success or failure. Each folder sync runs on its own
//! thread and reports progress over a channel.

use crate::config::CompiledFilters;
use crate::plan::{PlanError, scan_directory};
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Failed to upload {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Upload of {} rejected: {reason}", .path.display())]
    Rejected { path: PathBuf, reason: String },
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Scan(#[from] PlanError),

    #[error("Sync worker panicked")]
    WorkerPanicked,
}

/// Capability to push one local file somewhere.
pub trait Uploader: Send + Sync {
    /// Human-readable target name used in reports.
    fn name(&self) -> &str;

    fn upload(&self, path: &Path) -> Result<(), UploadError>;
}

/// Uploads by copying into a directory, such as a mounted cloud drive.
#[derive(Debug, Clone)]
pub struct DirectoryUploader {
    target: PathBuf,
    name: String,
}

impl DirectoryUploader {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        let target = target.into();
        let name = target.display().to_string();
        Self { target, name }
    }
}

impl Uploader for DirectoryUploader {
    fn name(&self) -> &str {
        &self.name
    }

    fn upload(&self, path: &Path) -> Result<(), UploadError> {
        let io_err = |source| UploadError::Io {
            path: path.to_path_buf(),
            source,
        };

        let file_name = path.file_name().ok_or_else(|| UploadError::Rejected {
            path: path.to_path_buf(),
            reason: "path has no file name".to_string(),
        })?;

        fs::create_dir_all(&self.target).map_err(io_err)?;
        fs::copy(path, self.target.join(file_name)).map_err(io_err)?;
        Ok(())
    }
}

/// Progress notifications emitted while a folder syncs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    Started { folder: PathBuf, total: usize },
    Uploaded { path: PathBuf },
    Failed { path: PathBuf, reason: String },
    Finished { uploaded: usize, failed: usize },
}

/// Result of syncing one folder.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub uploaded: usize,
    pub failed: Vec<(PathBuf, String)>,
}

impl SyncReport {
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Uploads the top-level files of `folder`, in name order.
///
/// Fails only when the folder cannot be scanned; per-file upload errors are
/// collected in the report. Events are best effort: a dropped receiver does
/// not stop the sync.
pub fn sync_folder(
    folder: &Path,
    filters: &CompiledFilters,
    uploader: &dyn Uploader,
    events: &Sender<SyncEvent>,
) -> Result<SyncReport, SyncError> {
    let files = scan_directory(folder, filters)?;
    info!(folder = %folder.display(), target = uploader.name(), files = files.len(), "syncing");

    let _ = events.send(SyncEvent::Started {
        folder: folder.to_path_buf(),
        total: files.len(),
    });

    let mut report = SyncReport::default();
    for file in &files {
        match uploader.upload(&file.path) {
            Ok(()) => {
                debug!(path = %file.path.display(), "uploaded");
                report.uploaded += 1;
                let _ = events.send(SyncEvent::Uploaded {
                    path: file.path.clone(),
                });
            }
            Err(e) => {
                warn!(path = %file.path.display(), error = %e, "upload failed");
                let reason = e.to_string();
                let _ = events.send(SyncEvent::Failed {
                    path: file.path.clone(),
                    reason: reason.clone(),
                });
                report.failed.push((file.path.clone(), reason));
            }
        }
    }

    let _ = events.send(SyncEvent::Finished {
        uploaded: report.uploaded,
        failed: report.failed.len(),
    });
    Ok(report)
}

/// Handle to a folder sync running on its own thread.
pub struct SyncHandle {
    handle: JoinHandle<Result<SyncReport, SyncError>>,
    pub events: Receiver<SyncEvent>,
}

impl SyncHandle {
    /// Waits for the worker and returns its report.
    pub fn join(self) -> Result<SyncReport, SyncError> {
        self.handle.join().map_err(|_| SyncError::WorkerPanicked)?
    }
}

/// Starts syncing `folder` on a new thread.
pub fn spawn_sync(
    folder: PathBuf,
    filters: CompiledFilters,
    uploader: Arc<dyn Uploader>,
) -> SyncHandle {
    let (sender, events) = unbounded();
    let handle = thread::spawn(move || sync_folder(&folder, &filters, uploader.as_ref(), &sender));
    SyncHandle { handle, events }
}
