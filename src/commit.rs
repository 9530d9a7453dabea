//! Applying an approved plan to the filesystem.
//!
//! The executor walks the pending rows of a [`Plan`] in order and moves or
//! renames each file. Every row is attempted: failures are collected next to
//! the success count instead of stopping the batch. Existing files are never
//! overwritten.

use crate::file_category::is_plain_name;
use crate::history::Operation;
use crate::plan::{Plan, PlanRow};
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a single row could not be applied.
#[derive(Debug, Error)]
pub enum CommitError {
    /// Something already exists at the target path.
    #[error("Destination already exists: {}", .path.display())]
    DestinationExists { path: PathBuf },

    /// The planned folder or file name would leave the root directory.
    #[error("Target '{}' is not a plain name inside the folder", .name)]
    InvalidTarget { name: String },

    #[error("Failed to create directory {}: {source}", .path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move {} to {}: {source}", .from.display(), .to.display())]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of a whole commit.
#[derive(Debug, Default)]
pub struct CommitResult {
    /// Number of files moved or renamed.
    pub moved_count: usize,
    /// Source path and reason for every row that was not applied.
    pub errors: Vec<(PathBuf, CommitError)>,
    /// Applied operations, in order, for the history log.
    pub operations: Vec<Operation>,
}

impl CommitResult {
    pub fn is_complete_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn total_attempted(&self) -> usize {
        self.moved_count + self.errors.len()
    }
}

/// Applies plans to disk.
pub struct CommitExecutor;

impl CommitExecutor {
    /// Applies every included row that changes something.
    ///
    /// The plan itself is left untouched; callers should rebuild it from the
    /// directory afterwards.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tidyboard::commit::CommitExecutor;
    /// use tidyboard::destination::ClassificationMode;
    /// use tidyboard::plan::{PlanAction, PlanBuilder, Selection};
    /// use std::path::Path;
    ///
    /// let plan = PlanBuilder::default()
    ///     .build(
    ///         Path::new("/home/me/Downloads"),
    ///         &PlanAction::Organize(ClassificationMode::Date),
    ///         &Selection::All,
    ///     )
    ///     .unwrap();
    ///
    /// let result = CommitExecutor::commit(&plan);
    /// println!("moved {}, failed {}", result.moved_count, result.errors.len());
    /// ```
    pub fn commit(plan: &Plan) -> CommitResult {
        Self::commit_with_progress(plan, |_, _| {})
    }

    /// Like [`CommitExecutor::commit`], calling `on_row` after each attempt
    /// with the row and its error, if any.
    pub fn commit_with_progress<F>(plan: &Plan, mut on_row: F) -> CommitResult
    where
        F: FnMut(&PlanRow, Option<&CommitError>),
    {
        let mut result = CommitResult::default();

        for row in plan.pending() {
            match Self::apply_row(plan.root(), row) {
                Ok(operation) => {
                    debug!(
                        from = %operation.original_path.display(),
                        to = %operation.new_path.display(),
                        "applied"
                    );
                    on_row(row, None);
                    result.moved_count += 1;
                    result.operations.push(operation);
                }
                Err(error) => {
                    warn!(path = %row.source().display(), %error, "row not applied");
                    on_row(row, Some(&error));
                    result.errors.push((row.source().to_path_buf(), error));
                }
            }
        }

        info!(
            moved = result.moved_count,
            failed = result.errors.len(),
            "commit finished"
        );
        result
    }

    /// Moves one file to its planned target without overwriting anything.
    fn apply_row(root: &Path, row: &PlanRow) -> Result<Operation, CommitError> {
        // Checked before anything is created so a bad row leaves no trace.
        if !row.destination.is_empty() && !is_plain_name(&row.destination) {
            return Err(CommitError::InvalidTarget {
                name: row.destination.clone(),
            });
        }
        if !is_plain_name(&row.new_name) {
            return Err(CommitError::InvalidTarget {
                name: row.new_name.clone(),
            });
        }
        let target = row.target(root);

        if !row.destination.is_empty() {
            let dir = root.join(&row.destination);
            fs::create_dir_all(&dir).map_err(|source| CommitError::DirectoryCreationFailed {
                path: dir.clone(),
                source,
            })?;
        }

        move_file(row.source(), &target).map_err(|source| {
            if source.kind() == ErrorKind::AlreadyExists {
                CommitError::DestinationExists {
                    path: target.clone(),
                }
            } else {
                CommitError::MoveFailed {
                    from: row.source().to_path_buf(),
                    to: target.clone(),
                    source,
                }
            }
        })?;

        Ok(Operation {
            original_path: row.source().to_path_buf(),
            new_path: target,
            destination: row.destination.clone(),
        })
    }
}

/// Moves `from` to `to`, failing with `AlreadyExists` if anything is at `to`.
///
/// The target is claimed atomically: a hard link where the filesystem
/// supports one, otherwise a copy into a newly created file. The source is
/// removed only once the target is complete; if that removal fails the
/// target is removed again so the file exists exactly once.
pub(crate) fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::hard_link(from, to) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Err(e),
        Err(e) => {
            debug!(from = %from.display(), error = %e, "hard link unavailable, copying");
            copy_new(from, to)?;
        }
    }

    if let Err(e) = fs::remove_file(from) {
        let _ = fs::remove_file(to);
        return Err(e);
    }
    Ok(())
}

/// Copies `from` into a file created at `to`, which must not exist yet.
fn copy_new(from: &Path, to: &Path) -> io::Result<()> {
    let mut source = File::open(from)?;
    let metadata = source.metadata()?;
    let mut target = OpenOptions::new().write(true).create_new(true).open(to)?;

    let copied = io::copy(&mut source, &mut target)
        .and_then(|_| target.set_permissions(metadata.permissions()))
        .and_then(|_| target.set_modified(metadata.modified()?));
    if let Err(e) = copied {
        drop(target);
        let _ = fs::remove_file(to);
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompiledFilters;
    use crate::destination::ClassificationMode;
    use crate::file_category::ExtensionClassifier;
    use crate::plan::{PlanAction, PlanBuilder, Selection};
    use crate::rename::RenameSpec;
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::TempDir;

    fn organize_plan(root: &Path) -> Plan {
        PlanBuilder::default()
            .build(root, &PlanAction::Organize(ClassificationMode::Type), &Selection::All)
            .expect("Failed to build plan")
    }

    #[test]
    fn test_commit_creates_category_directories() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::write(root.join("a.pdf"), "pdf").unwrap();
        fs::write(root.join("b.jpg"), "jpg").unwrap();

        let result = CommitExecutor::commit(&organize_plan(root));

        assert_eq!(result.moved_count, 2);
        assert!(result.is_complete_success());
        assert!(root.join("Documents").join("a.pdf").is_file());
        assert!(root.join("Images").join("b.jpg").is_file());
        assert!(!root.join("a.pdf").exists());
        assert_eq!(result.operations.len(), 2);
        assert_eq!(result.operations[0].destination, "Documents");
    }

    #[test]
    fn test_commit_uses_existing_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::create_dir(root.join("Images")).unwrap();
        fs::write(root.join("Images").join("old.png"), "old").unwrap();
        fs::write(root.join("new.png"), "new").unwrap();

        let result = CommitExecutor::commit(&organize_plan(root));

        assert_eq!(result.moved_count, 1);
        assert!(root.join("Images").join("old.png").exists());
        assert!(root.join("Images").join("new.png").exists());
    }

    #[test]
    fn test_commit_refuses_to_overwrite() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::create_dir(root.join("Documents")).unwrap();
        fs::write(root.join("Documents").join("report.pdf"), "keep me").unwrap();
        fs::write(root.join("report.pdf"), "incoming").unwrap();

        let result = CommitExecutor::commit(&organize_plan(root));

        assert_eq!(result.moved_count, 0);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].0, root.join("report.pdf"));
        assert!(matches!(
            result.errors[0].1,
            CommitError::DestinationExists { .. }
        ));
        assert_eq!(
            fs::read_to_string(root.join("Documents").join("report.pdf")).unwrap(),
            "keep me"
        );
        assert_eq!(fs::read_to_string(root.join("report.pdf")).unwrap(), "incoming");
    }

    #[test]
    fn test_rename_in_place_no_clobber() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::write(root.join("a.txt"), "a").unwrap();
        fs::write(root.join("b.txt"), "b").unwrap();

        // a.txt -> b.txt would replace b.txt
        let plan = PlanBuilder::default()
            .build(
                root,
                &PlanAction::Rename(RenameSpec {
                    find: Some("a".to_string()),
                    replace: Some("b".to_string()),
                    ..Default::default()
                }),
                &Selection::All,
            )
            .unwrap();
        let result = CommitExecutor::commit(&plan);

        assert_eq!(result.moved_count, 0);
        assert!(matches!(
            result.errors[0].1,
            CommitError::DestinationExists { .. }
        ));
        assert_eq!(fs::read_to_string(root.join("a.txt")).unwrap(), "a");
        assert_eq!(fs::read_to_string(root.join("b.txt")).unwrap(), "b");
    }

    #[test]
    fn test_skips_excluded_and_unchanged_rows() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::write(root.join("a.pdf"), "a").unwrap();
        fs::write(root.join("b.pdf"), "b").unwrap();

        let plan = organize_plan(root)
            .with_selection(&Selection::from_names(root, &[], &["b.pdf".to_string()]));
        let result = CommitExecutor::commit(&plan);

        assert_eq!(result.moved_count, 1);
        assert!(root.join("b.pdf").exists());
        assert!(root.join("Documents").join("a.pdf").exists());
    }

    #[test]
    fn test_vanished_source_is_reported() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::write(root.join("a.pdf"), "a").unwrap();
        fs::write(root.join("b.pdf"), "b").unwrap();

        let plan = organize_plan(root);
        fs::remove_file(root.join("a.pdf")).unwrap();
        let result = CommitExecutor::commit(&plan);

        assert_eq!(result.moved_count, 1);
        assert!(matches!(result.errors[0].1, CommitError::MoveFailed { .. }));
        assert_eq!(result.total_attempted(), 2);
    }

    #[test]
    fn test_progress_callback_sees_every_row() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        for name in ["a.pdf", "b.mp3", "c.zip"] {
            fs::write(root.join(name), name).unwrap();
        }

        let mut seen = Vec::new();
        let result = CommitExecutor::commit_with_progress(&organize_plan(root), |row, error| {
            seen.push((row.entry.name.clone(), error.is_none()));
        });

        assert_eq!(result.moved_count, 3);
        assert_eq!(
            seen,
            vec![
                ("a.pdf".to_string(), true),
                ("b.mp3".to_string(), true),
                ("c.zip".to_string(), true),
            ]
        );
    }

    #[test]
    fn test_commit_does_not_mutate_plan() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::write(root.join("a.pdf"), "a").unwrap();

        let plan = organize_plan(root);
        let before = plan.clone();
        CommitExecutor::commit(&plan);
        assert_eq!(plan, before);
    }

    fn rename_plan(root: &Path, spec: RenameSpec) -> Plan {
        PlanBuilder::default()
            .build(root, &PlanAction::Rename(spec), &Selection::All)
            .expect("Failed to build plan")
    }

    #[test]
    fn test_prefix_cannot_escape_root() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().join("root");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();

        let plan = rename_plan(
            &root,
            RenameSpec {
                prefix: Some("../".to_string()),
                ..Default::default()
            },
        );
        let result = CommitExecutor::commit(&plan);

        assert_eq!(result.moved_count, 0);
        assert!(matches!(
            result.errors[0].1,
            CommitError::InvalidTarget { .. }
        ));
        assert!(root.join("a.txt").exists());
        assert!(!temp_dir.path().join("a.txt").exists());
    }

    #[test]
    fn test_absolute_pattern_cannot_escape_root() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().join("root");
        let elsewhere = temp_dir.path().join("elsewhere");
        fs::create_dir(&root).unwrap();
        fs::create_dir(&elsewhere).unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();

        let pattern = format!("{}/x{{n}}", elsewhere.display());
        let plan = rename_plan(
            &root,
            RenameSpec {
                pattern: Some(pattern),
                ..Default::default()
            },
        );
        let result = CommitExecutor::commit(&plan);

        assert_eq!(result.moved_count, 0);
        assert!(matches!(
            result.errors[0].1,
            CommitError::InvalidTarget { .. }
        ));
        assert!(root.join("a.txt").exists());
        assert_eq!(fs::read_dir(&elsewhere).unwrap().count(), 0);
    }

    #[test]
    fn test_category_folder_cannot_escape_root() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().join("root");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("novel.epub"), "book").unwrap();

        let classifier = ExtensionClassifier::default().with_category("../Books", ["epub"]);
        let plan = PlanBuilder::new(CompiledFilters::default(), classifier)
            .build(&root, &PlanAction::Organize(ClassificationMode::Type), &Selection::All)
            .unwrap();
        let result = CommitExecutor::commit(&plan);

        assert_eq!(result.moved_count, 0);
        assert!(matches!(
            result.errors[0].1,
            CommitError::InvalidTarget { .. }
        ));
        assert!(root.join("novel.epub").exists());
        assert!(!temp_dir.path().join("Books").exists());
    }

    #[test]
    fn test_move_file_refuses_existing_target() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let from = temp_dir.path().join("from.txt");
        let to = temp_dir.path().join("to.txt");
        fs::write(&from, "incoming").unwrap();
        fs::write(&to, "keep me").unwrap();

        let err = move_file(&from, &to).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(&from).unwrap(), "incoming");
        assert_eq!(fs::read_to_string(&to).unwrap(), "keep me");
    }

    #[test]
    fn test_copy_new_refuses_existing_target() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let from = temp_dir.path().join("from.txt");
        let to = temp_dir.path().join("to.txt");
        fs::write(&from, "incoming").unwrap();
        fs::write(&to, "keep me").unwrap();

        let err = copy_new(&from, &to).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(&to).unwrap(), "keep me");
    }

    #[test]
    fn test_copy_new_keeps_content_and_mtime() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let from = temp_dir.path().join("from.txt");
        let to = temp_dir.path().join("to.txt");
        fs::write(&from, "payload").unwrap();
        let mtime = UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        File::options()
            .write(true)
            .open(&from)
            .unwrap()
            .set_modified(mtime)
            .unwrap();

        copy_new(&from, &to).unwrap();

        assert_eq!(fs::read_to_string(&to).unwrap(), "payload");
        assert_eq!(fs::metadata(&to).unwrap().modified().unwrap(), mtime);
        assert!(from.exists());
    }
}
