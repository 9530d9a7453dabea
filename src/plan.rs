//! Batch plan construction.
//!
//! A [`Plan`] is the full list of proposed operations for one snapshot of a
//! directory: for each top-level file, where it would go and under which
//! name. Plans are rebuilt wholesale whenever the directory, the rename spec
//! or the organize mode changes; they are never patched in place.

use crate::config::CompiledFilters;
use crate::destination::{ClassificationMode, DestinationPlanner};
use crate::file_category::{ExtensionClassifier, split_extension};
use crate::rename::RenameSpec;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that abort a plan build.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Directory not found: {}", .path.display())]
    DirectoryNotFound { path: PathBuf },

    #[error("Failed to read directory {}: {source}", .path.display())]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type PlanResult<T> = Result<T, PlanError>;

/// Snapshot of one file taken at scan time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Full path of the file.
    pub path: PathBuf,
    /// File name including the extension.
    pub name: String,
    /// Lower-cased extension including the dot, empty when there is none.
    pub extension: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: SystemTime,
}

impl FileEntry {
    /// File name without its extension.
    pub fn stem(&self) -> &str {
        split_extension(&self.name).0
    }

    /// Extension exactly as it appears in the file name.
    pub fn original_extension(&self) -> &str {
        split_extension(&self.name).1
    }
}

/// What a plan does with each file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanAction {
    /// Move every file into a subfolder chosen by the mode.
    Organize(ClassificationMode),
    /// Rename every file in place.
    Rename(RenameSpec),
}

/// Which rows of a plan are included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    All,
    /// Only these source paths.
    Only(BTreeSet<PathBuf>),
    /// Everything but these source paths.
    Except(BTreeSet<PathBuf>),
}

impl Selection {
    /// Builds a selection from file names relative to `root`.
    ///
    /// A non-empty `only` list restricts the selection to those names minus
    /// `skip`; otherwise `skip` alone removes names from the full set.
    pub fn from_names(root: &Path, only: &[String], skip: &[String]) -> Self {
        let skip: BTreeSet<PathBuf> = skip.iter().map(|name| root.join(name)).collect();

        if !only.is_empty() {
            let only = only
                .iter()
                .map(|name| root.join(name))
                .filter(|path| !skip.contains(path))
                .collect();
            Selection::Only(only)
        } else if !skip.is_empty() {
            Selection::Except(skip)
        } else {
            Selection::All
        }
    }

    pub fn includes(&self, path: &Path) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(paths) => paths.contains(path),
            Selection::Except(paths) => !paths.contains(path),
        }
    }
}

/// One planned operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRow {
    pub entry: FileEntry,
    /// Subfolder relative to the plan root; empty for in-place renames.
    pub destination: String,
    /// New file name, extension included.
    pub new_name: String,
    pub included: bool,
}

impl PlanRow {
    pub fn source(&self) -> &Path {
        &self.entry.path
    }

    /// Full path the file ends up at.
    pub fn target(&self, root: &Path) -> PathBuf {
        if self.destination.is_empty() {
            root.join(&self.new_name)
        } else {
            root.join(&self.destination).join(&self.new_name)
        }
    }

    /// False when applying the row would leave the file where it is.
    pub fn is_change(&self) -> bool {
        !self.destination.is_empty() || self.new_name != self.entry.name
    }
}

/// Ordered rows for one directory snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    root: PathBuf,
    action: PlanAction,
    rows: Vec<PlanRow>,
}

impl Plan {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn action(&self) -> &PlanAction {
        &self.action
    }

    pub fn rows(&self) -> &[PlanRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn included_count(&self) -> usize {
        self.rows.iter().filter(|row| row.included).count()
    }

    /// Rows a commit would act on: included and actually changing something.
    pub fn pending(&self) -> impl Iterator<Item = &PlanRow> {
        self.rows.iter().filter(|row| row.included && row.is_change())
    }

    /// Returns a new plan with inclusion flags taken from `selection`.
    pub fn with_selection(self, selection: &Selection) -> Plan {
        let rows = self
            .rows
            .into_iter()
            .map(|row| PlanRow {
                included: selection.includes(row.source()),
                ..row
            })
            .collect();

        Plan { rows, ..self }
    }

    /// Number of pending rows per destination subfolder.
    pub fn summary(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for row in self.pending() {
            *counts.entry(row.destination.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Target paths claimed by more than one pending row.
    ///
    /// Only the first of those rows can be applied; the commit rejects the
    /// rest as existing destinations.
    pub fn duplicate_targets(&self) -> Vec<PathBuf> {
        let mut seen: HashMap<PathBuf, usize> = HashMap::new();
        for row in self.pending() {
            *seen.entry(row.target(&self.root)).or_insert(0) += 1;
        }

        let mut duplicates: Vec<PathBuf> = seen
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(path, _)| path)
            .collect();
        duplicates.sort();
        duplicates
    }
}

/// Lists the top-level files of `root` that pass `filters`, sorted by name.
///
/// Fails only when `root` is not a readable directory. Entries whose
/// metadata cannot be read, that are not regular files (after following
/// symlinks) or whose names are not valid UTF-8 are skipped.
pub fn scan_directory(root: &Path, filters: &CompiledFilters) -> PlanResult<Vec<FileEntry>> {
    match fs::metadata(root) {
        Ok(meta) if meta.is_dir() => {}
        _ => {
            return Err(PlanError::DirectoryNotFound {
                path: root.to_path_buf(),
            });
        }
    }

    let entries = fs::read_dir(root).map_err(|source| PlanError::ReadDirectory {
        path: root.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };

        let path = entry.path();
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                warn!(name = ?raw, "skipping file with non UTF-8 name");
                continue;
            }
        };

        if !filters.should_include(Path::new(&name)) {
            debug!(%name, "excluded by filters");
            continue;
        }

        let meta = match fs::metadata(&path) {
            Ok(meta) => meta,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping file");
                continue;
            }
        };
        if !meta.is_file() {
            continue;
        }

        let modified = match meta.modified() {
            Ok(modified) => modified,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping file without mtime");
                continue;
            }
        };

        let extension = split_extension(&name).1.to_lowercase();
        files.push(FileEntry {
            path,
            name,
            extension,
            size: meta.len(),
            modified,
        });
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Builds plans for a directory from filters, a classifier and an action.
#[derive(Debug, Clone, Default)]
pub struct PlanBuilder {
    filters: CompiledFilters,
    planner: DestinationPlanner,
}

impl PlanBuilder {
    pub fn new(filters: CompiledFilters, classifier: ExtensionClassifier) -> Self {
        Self {
            filters,
            planner: DestinationPlanner::new(classifier),
        }
    }

    /// Scans `root` and plans `action` for each file.
    ///
    /// Rows start included according to `selection`. Rename counters are
    /// assigned in name order across all rows, selected or not.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tidyboard::destination::ClassificationMode;
    /// use tidyboard::plan::{PlanAction, PlanBuilder, Selection};
    /// use std::path::Path;
    ///
    /// let builder = PlanBuilder::default();
    /// let plan = builder
    ///     .build(
    ///         Path::new("/home/me/Downloads"),
    ///         &PlanAction::Organize(ClassificationMode::Type),
    ///         &Selection::All,
    ///     )
    ///     .expect("Downloads should exist");
    ///
    /// for row in plan.rows() {
    ///     println!("{} -> {}", row.entry.name, row.target(plan.root()).display());
    /// }
    /// ```
    pub fn build(
        &self,
        root: &Path,
        action: &PlanAction,
        selection: &Selection,
    ) -> PlanResult<Plan> {
        let entries = scan_directory(root, &self.filters)?;
        let plan = self.plan_entries(root, action, entries, |path| selection.includes(path));
        info!(
            root = %root.display(),
            rows = plan.len(),
            included = plan.included_count(),
            "built plan"
        );
        Ok(plan)
    }

    /// Rebuilds `existing` against the current directory state and `action`.
    ///
    /// Rows keep their inclusion flag when the same source path is still
    /// present; files that disappeared drop out and new files start included.
    pub fn recompute(&self, existing: &Plan, action: &PlanAction) -> PlanResult<Plan> {
        let previous: HashMap<&Path, bool> = existing
            .rows
            .iter()
            .map(|row| (row.source(), row.included))
            .collect();

        let entries = scan_directory(&existing.root, &self.filters)?;
        let plan = self.plan_entries(&existing.root, action, entries, |path| {
            previous.get(path).copied().unwrap_or(true)
        });
        debug!(rows = plan.len(), "recomputed plan");
        Ok(plan)
    }

    fn plan_entries<F>(
        &self,
        root: &Path,
        action: &PlanAction,
        entries: Vec<FileEntry>,
        included: F,
    ) -> Plan
    where
        F: Fn(&Path) -> bool,
    {
        let rows = entries
            .into_iter()
            .enumerate()
            .map(|(position, entry)| {
                let (destination, new_name) = match action {
                    PlanAction::Organize(mode) => (
                        self.planner
                            .destination(&entry.extension, entry.modified, *mode),
                        entry.name.clone(),
                    ),
                    PlanAction::Rename(spec) => {
                        let index = spec.start.saturating_add(position as i64);
                        (
                            String::new(),
                            spec.rename(entry.stem(), entry.original_extension(), index),
                        )
                    }
                };

                PlanRow {
                    included: included(&entry.path),
                    entry,
                    destination,
                    new_name,
                }
            })
            .collect();

        Plan {
            root: root.to_path_buf(),
            action: action.clone(),
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dir_with(files: &[&str]) -> TempDir {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        for name in files {
            fs::write(temp_dir.path().join(name), name.as_bytes()).expect("Failed to write file");
        }
        temp_dir
    }

    fn organize() -> PlanAction {
        PlanAction::Organize(ClassificationMode::Type)
    }

    fn counter(pattern: &str, start: i64, padding: usize) -> PlanAction {
        PlanAction::Rename(RenameSpec {
            pattern: Some(pattern.to_string()),
            start,
            padding,
            ..Default::default()
        })
    }

    #[test]
    fn test_missing_directory_fails() {
        let result = PlanBuilder::default().build(
            Path::new("/definitely/not/a/dir"),
            &organize(),
            &Selection::All,
        );
        assert!(matches!(result, Err(PlanError::DirectoryNotFound { .. })));
    }

    #[test]
    fn test_file_as_root_fails() {
        let temp_dir = dir_with(&["a.txt"]);
        let result = PlanBuilder::default().build(
            &temp_dir.path().join("a.txt"),
            &organize(),
            &Selection::All,
        );
        assert!(matches!(result, Err(PlanError::DirectoryNotFound { .. })));
    }

    #[test]
    fn test_scan_is_top_level_and_sorted() {
        let temp_dir = dir_with(&["b.jpg", "a.pdf", "C.txt"]);
        fs::create_dir(temp_dir.path().join("nested")).unwrap();
        fs::write(temp_dir.path().join("nested").join("deep.txt"), "x").unwrap();

        let entries = scan_directory(temp_dir.path(), &CompiledFilters::default()).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["C.txt", "a.pdf", "b.jpg"]);
    }

    #[test]
    fn test_file_entry_fields() {
        let temp_dir = dir_with(&[]);
        fs::write(temp_dir.path().join("Report.Final.PDF"), b"12345").unwrap();

        let entries = scan_directory(temp_dir.path(), &CompiledFilters::default()).unwrap();
        let entry = &entries[0];
        assert_eq!(entry.name, "Report.Final.PDF");
        assert_eq!(entry.extension, ".pdf");
        assert_eq!(entry.stem(), "Report.Final");
        assert_eq!(entry.original_extension(), ".PDF");
        assert_eq!(entry.size, 5);
        assert_eq!(entry.path, temp_dir.path().join("Report.Final.PDF"));
    }

    #[test]
    fn test_hidden_files_filtered() {
        let temp_dir = dir_with(&[".hidden", "shown.txt"]);
        let entries = scan_directory(temp_dir.path(), &CompiledFilters::default()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "shown.txt");
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_followed_and_dangling_skipped() {
        let temp_dir = dir_with(&["real.txt"]);
        let root = temp_dir.path();
        std::os::unix::fs::symlink(root.join("real.txt"), root.join("link.txt")).unwrap();
        std::os::unix::fs::symlink(root.join("missing.txt"), root.join("broken.txt")).unwrap();

        let entries = scan_directory(root, &CompiledFilters::default()).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["link.txt", "real.txt"]);
    }

    #[test]
    fn test_organize_by_type_rows() {
        let temp_dir = dir_with(&["a.pdf", "b.jpg", "note.txt", "mystery.xyz"]);
        let plan = PlanBuilder::default()
            .build(temp_dir.path(), &organize(), &Selection::All)
            .unwrap();

        let rows: Vec<(&str, &str, &str)> = plan
            .rows()
            .iter()
            .map(|r| (r.entry.name.as_str(), r.destination.as_str(), r.new_name.as_str()))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("a.pdf", "Documents", "a.pdf"),
                ("b.jpg", "Images", "b.jpg"),
                ("mystery.xyz", "Others", "mystery.xyz"),
                ("note.txt", "Documents", "note.txt"),
            ]
        );
        assert!(plan.rows().iter().all(|r| r.included));
        assert_eq!(
            plan.rows()[0].target(plan.root()),
            temp_dir.path().join("Documents").join("a.pdf")
        );
    }

    #[test]
    fn test_rename_counter_follows_sorted_order() {
        let temp_dir = dir_with(&["zebra.jpg", "apple.png"]);
        let plan = PlanBuilder::default()
            .build(temp_dir.path(), &counter("Photo_{n}", 5, 3), &Selection::All)
            .unwrap();

        let names: Vec<&str> = plan.rows().iter().map(|r| r.new_name.as_str()).collect();
        assert_eq!(names, vec!["Photo_005.png", "Photo_006.jpg"]);
        assert!(plan.rows().iter().all(|r| r.destination.is_empty()));
    }

    #[test]
    fn test_rename_counter_ignores_selection() {
        let temp_dir = dir_with(&["a.txt", "b.txt", "c.txt"]);
        let selection = Selection::from_names(temp_dir.path(), &[], &["a.txt".to_string()]);
        let plan = PlanBuilder::default()
            .build(temp_dir.path(), &counter("f{n}", 1, 1), &selection)
            .unwrap();

        assert!(!plan.rows()[0].included);
        assert_eq!(plan.rows()[1].new_name, "f2.txt");
        assert_eq!(plan.included_count(), 2);
    }

    #[test]
    fn test_build_is_idempotent() {
        let temp_dir = dir_with(&["x.pdf", "y.mp3", "z.zip"]);
        let builder = PlanBuilder::default();
        let action = counter("Track {n}", 1, 2);

        let first = builder.build(temp_dir.path(), &action, &Selection::All).unwrap();
        let second = builder.build(temp_dir.path(), &action, &Selection::All).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unchanged_rows_are_not_pending() {
        let temp_dir = dir_with(&["keep.txt"]);
        let plan = PlanBuilder::default()
            .build(
                temp_dir.path(),
                &PlanAction::Rename(RenameSpec::default()),
                &Selection::All,
            )
            .unwrap();

        assert_eq!(plan.len(), 1);
        assert!(!plan.rows()[0].is_change());
        assert_eq!(plan.pending().count(), 0);
    }

    #[test]
    fn test_recompute_preserves_selection() {
        let temp_dir = dir_with(&["a.pdf", "b.pdf", "c.pdf"]);
        let root = temp_dir.path();
        let builder = PlanBuilder::default();

        let selection = Selection::from_names(root, &[], &["b.pdf".to_string()]);
        let plan = builder.build(root, &organize(), &selection).unwrap();

        fs::remove_file(root.join("c.pdf")).unwrap();
        fs::write(root.join("d.pdf"), "new").unwrap();

        let rebuilt = builder
            .recompute(&plan, &counter("doc{n}", 1, 1))
            .unwrap();
        let rows: Vec<(&str, bool, &str)> = rebuilt
            .rows()
            .iter()
            .map(|r| (r.entry.name.as_str(), r.included, r.new_name.as_str()))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("a.pdf", true, "doc1.pdf"),
                ("b.pdf", false, "doc2.pdf"),
                ("d.pdf", true, "doc3.pdf"),
            ]
        );
    }

    #[test]
    fn test_with_selection_replaces_flags() {
        let temp_dir = dir_with(&["a.pdf", "b.pdf"]);
        let root = temp_dir.path();
        let plan = PlanBuilder::default()
            .build(root, &organize(), &Selection::All)
            .unwrap();

        let only_b = Selection::from_names(root, &["b.pdf".to_string()], &[]);
        let plan = plan.with_selection(&only_b);
        let flags: Vec<bool> = plan.rows().iter().map(|r| r.included).collect();
        assert_eq!(flags, vec![false, true]);
    }

    #[test]
    fn test_selection_from_names() {
        let root = Path::new("/r");
        assert_eq!(Selection::from_names(root, &[], &[]), Selection::All);

        let only = Selection::from_names(
            root,
            &["a".to_string(), "b".to_string()],
            &["b".to_string()],
        );
        assert!(only.includes(Path::new("/r/a")));
        assert!(!only.includes(Path::new("/r/b")));
        assert!(!only.includes(Path::new("/r/c")));

        let except = Selection::from_names(root, &[], &["c".to_string()]);
        assert!(except.includes(Path::new("/r/a")));
        assert!(!except.includes(Path::new("/r/c")));
    }

    #[test]
    fn test_summary_counts_pending_rows() {
        let temp_dir = dir_with(&["a.txt", "b.pdf", "photo.png"]);
        let root = temp_dir.path();
        let plan = PlanBuilder::default()
            .build(root, &organize(), &Selection::All)
            .unwrap()
            .with_selection(&Selection::from_names(root, &[], &["b.pdf".to_string()]));

        let summary = plan.summary();
        assert_eq!(summary.get("Documents"), Some(&1));
        assert_eq!(summary.get("Images"), Some(&1));
        assert_eq!(summary.len(), 2);
    }

    #[test]
    fn test_duplicate_targets_detected() {
        let temp_dir = dir_with(&["draft.txt", "draftdraft.txt", "other.md"]);
        let plan = PlanBuilder::default()
            .build(
                temp_dir.path(),
                &PlanAction::Rename(RenameSpec {
                    find: Some("draft".to_string()),
                    prefix: Some("notes".to_string()),
                    ..Default::default()
                }),
                &Selection::All,
            )
            .unwrap();

        assert_eq!(
            plan.duplicate_targets(),
            vec![temp_dir.path().join("notes.txt")]
        );

        let without_second = plan.with_selection(&Selection::from_names(
            temp_dir.path(),
            &[],
            &["draftdraft.txt".to_string()],
        ));
        assert!(without_second.duplicate_targets().is_empty());
    }
}
