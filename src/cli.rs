//! Command orchestration for the tidyboard binary.
//!
//! Each command loads configuration, builds a plan for the target directory,
//! shows it, and (unless it is a dry run) commits it and records history so
//! the run can be undone.

use crate::commit::CommitExecutor;
use crate::config::AppConfig;
use crate::destination::ClassificationMode;
use crate::history::OperationLog;
use crate::output::OutputFormatter;
use crate::plan::{Plan, PlanAction, PlanBuilder, Selection};
use crate::rename::{RenameInputs, RenameSpec};
use crate::sync::{DirectoryUploader, SyncEvent, Uploader, spawn_sync};
use crate::undo::UndoManager;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// A command to run against one directory.
#[derive(Debug, Clone)]
pub enum TidyCommand {
    /// Move files into subfolders by type or date.
    Organize {
        /// Overrides the configured mode when set.
        mode: Option<ClassificationMode>,
        dry_run: bool,
    },
    /// Rename files in place from a pattern.
    Rename { inputs: RenameInputs, dry_run: bool },
    /// Revert the last organize or rename.
    Undo,
    /// Copy the directory's files to a sync target directory.
    Sync { target: PathBuf },
}

/// Options shared by all commands.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config_path: Option<PathBuf>,
    /// File names to include exclusively.
    pub only: Vec<String>,
    /// File names to leave alone.
    pub skip: Vec<String>,
}

/// Runs `command` on `dir_path`.
///
/// ```no_run
/// use tidyboard::cli::{RunOptions, TidyCommand, run_cli};
/// use std::path::Path;
///
/// let command = TidyCommand::Organize { mode: None, dry_run: true };
/// if let Err(e) = run_cli(command, Path::new("/home/me/Downloads"), &RunOptions::default()) {
///     eprintln!("Error: {:#}", e);
/// }
/// ```
pub fn run_cli(command: TidyCommand, dir_path: &Path, options: &RunOptions) -> Result<()> {
    match command {
        TidyCommand::Undo => undo(dir_path),
        TidyCommand::Sync { target } => sync(dir_path, &target, options),
        TidyCommand::Organize { mode, dry_run } => {
            let config = AppConfig::load(options.config_path.as_deref())?;
            let action = PlanAction::Organize(mode.unwrap_or(config.organize.mode));
            plan_and_commit(&config, action, dir_path, options, dry_run)
        }
        TidyCommand::Rename { inputs, dry_run } => {
            let config = AppConfig::load(options.config_path.as_deref())?;
            let spec = RenameSpec::from_inputs(inputs, &config.rename_defaults());
            let changes_names = spec.uses_counter()
                || spec.find.is_some()
                || spec.prefix.is_some()
                || spec.suffix.is_some();
            if !changes_names {
                OutputFormatter::warning(
                    "No pattern, find/replace, prefix or suffix given; names stay the same.",
                );
            }
            plan_and_commit(&config, PlanAction::Rename(spec), dir_path, options, dry_run)
        }
    }
}

fn plan_and_commit(
    config: &AppConfig,
    action: PlanAction,
    dir_path: &Path,
    options: &RunOptions,
    dry_run: bool,
) -> Result<()> {
    let builder = PlanBuilder::new(config.compile_filters()?, config.classifier()?);
    let selection = Selection::from_names(dir_path, &options.only, &options.skip);
    let plan = builder
        .build(dir_path, &action, &selection)
        .with_context(|| format!("Cannot plan {}", dir_path.display()))?;

    OutputFormatter::plan_preview(&plan);

    if dry_run {
        OutputFormatter::dry_run_notice("No files were modified.");
        return Ok(());
    }

    if plan.pending().next().is_none() {
        OutputFormatter::info("Nothing to do.");
        return Ok(());
    }

    commit(&plan)?;

    let refreshed = builder.recompute(&plan, &action)?;
    debug!(remaining = refreshed.len(), "rebuilt plan after commit");
    OutputFormatter::info(&format!(
        "{} top-level {} left in {}",
        refreshed.len(),
        if refreshed.len() == 1 { "file" } else { "files" },
        dir_path.display()
    ));
    Ok(())
}

fn commit(plan: &Plan) -> Result<()> {
    let pb = OutputFormatter::create_progress_bar(plan.pending().count() as u64);
    let result = CommitExecutor::commit_with_progress(plan, |row, _| {
        pb.set_message(row.entry.name.clone());
        pb.inc(1);
    });
    pb.finish_and_clear();

    OutputFormatter::commit_report(&result);

    if !result.operations.is_empty() {
        let log = OperationLog::with_operations(plan.root().to_path_buf(), result.operations);
        match log.save(plan.root()) {
            Ok(()) => OutputFormatter::info(&format!(
                "History saved. Use 'tidyboard undo {}' to revert changes.",
                plan.root().display()
            )),
            Err(e) => OutputFormatter::warning(&format!("Could not save history: {}", e)),
        }
    }
    Ok(())
}

fn undo(dir_path: &Path) -> Result<()> {
    OutputFormatter::info("Undoing previous changes...");
    let report = UndoManager::undo(dir_path)?;
    OutputFormatter::undo_report(&report);
    Ok(())
}

fn sync(dir_path: &Path, target: &Path, options: &RunOptions) -> Result<()> {
    let config = AppConfig::load(options.config_path.as_deref())?;
    let uploader = Arc::new(DirectoryUploader::new(target));
    let target_name = uploader.name().to_string();

    let handle = spawn_sync(dir_path.to_path_buf(), config.compile_filters()?, uploader);

    let pb = OutputFormatter::create_progress_bar(0);
    for event in handle.events.iter() {
        match event {
            SyncEvent::Started { total, .. } => pb.set_length(total as u64),
            SyncEvent::Uploaded { path } | SyncEvent::Failed { path, .. } => {
                pb.set_message(path.display().to_string());
                pb.inc(1);
            }
            SyncEvent::Finished { .. } => break,
        }
    }
    pb.finish_and_clear();

    let report = handle
        .join()
        .with_context(|| format!("Cannot sync {}", dir_path.display()))?;
    OutputFormatter::sync_report(&target_name, &report);
    Ok(())
}
