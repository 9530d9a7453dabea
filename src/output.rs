//! Terminal output for plans and results.
//!
//! All user-facing printing goes through [`OutputFormatter`] so the CLI has a
//! single place for colors, symbols and layout.

use crate::commit::CommitResult;
use crate::plan::{Plan, PlanAction};
use crate::sync::SyncReport;
use crate::undo::UndoReport;
use chrono::{DateTime, Local};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;

/// Label used in summaries for in-place renames.
const IN_PLACE: &str = "(same folder)";

pub struct OutputFormatter;

impl OutputFormatter {
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Progress bar for a batch of `total` file operations.
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("█▓░"));
        }
        pb
    }

    /// Prints every row of a plan: checkbox, old name, new location, size and date.
    pub fn plan_preview(plan: &Plan) {
        let title = match plan.action() {
            PlanAction::Organize(mode) => {
                format!("Organize by {}: {}", mode, plan.root().display())
            }
            PlanAction::Rename(_) => format!("Rename files in {}", plan.root().display()),
        };
        Self::header(&title);

        if plan.is_empty() {
            Self::info("No files found.");
            return;
        }

        for row in plan.rows() {
            let mark = if row.included { "[x]".green() } else { "[ ]".dimmed() };
            let target = if row.destination.is_empty() {
                row.new_name.clone()
            } else {
                format!("{}/{}", row.destination, row.new_name)
            };
            let arrow = if row.is_change() {
                target.cyan()
            } else {
                "unchanged".dimmed()
            };
            let modified: DateTime<Local> = row.entry.modified.into();

            println!(
                " {} {} → {}  {}",
                mark,
                row.entry.name,
                arrow,
                format!(
                    "{} • {}",
                    format_size(row.entry.size),
                    modified.format("%Y-%m-%d")
                )
                .dimmed()
            );
        }

        println!(
            "\nTotal files: {}   Selected: {}",
            plan.len(),
            plan.included_count().to_string().blue()
        );

        for duplicate in plan.duplicate_targets() {
            Self::warning(&format!(
                "Several files would end up at {}; only the first will be applied",
                duplicate.display()
            ));
        }

        let summary = plan.summary();
        if !summary.is_empty() {
            let total = summary.values().sum();
            Self::summary_table(&summary, total);
        }
    }

    /// Prints pending counts per destination folder.
    pub fn summary_table(counts: &BTreeMap<String, usize>, total_files: usize) {
        Self::header("SUMMARY");

        let label = |name: &str| {
            if name.is_empty() {
                IN_PLACE.to_string()
            } else {
                name.to_string()
            }
        };
        let width = counts
            .keys()
            .map(|name| label(name).len())
            .max()
            .unwrap_or(0)
            .max(11);

        println!("{:<width$} | {}", "Destination".bold(), "Files".bold(), width = width);
        println!("{}", "-".repeat(width + 10));
        for (name, count) in counts {
            println!(
                "{:<width$} | {} {}",
                label(name),
                count.to_string().green(),
                plural(*count),
                width = width
            );
        }
        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total_files.to_string().green().bold(),
            plural(total_files),
            width = width
        );
    }

    pub fn commit_report(result: &CommitResult) {
        if result.moved_count > 0 {
            Self::success(&format!("Moved {} {}.", result.moved_count, plural(result.moved_count)));
        } else {
            Self::info("Nothing was moved.");
        }

        if !result.errors.is_empty() {
            Self::warning(&format!("{} could not be applied:", result.errors.len()));
            for (path, error) in &result.errors {
                Self::error(&format!("{}: {}", path.display(), error));
            }
        }
    }

    pub fn undo_report(report: &UndoReport) {
        Self::success(&format!("Restored: {}", report.restored_files));

        for backup in &report.backups {
            Self::info(&format!("  Backed up existing file to {}", backup.display()));
        }
        if !report.skipped_files.is_empty() {
            Self::warning(&format!("Skipped: {}", report.skipped_files.len()));
            for (path, reason) in &report.skipped_files {
                println!("    - {}: {}", path.display(), reason);
            }
        }
        if !report.failed_restores.is_empty() {
            Self::warning(&format!("Failed: {}", report.failed_restores.len()));
            for (path, reason) in &report.failed_restores {
                Self::error(&format!("{}: {}", path.display(), reason));
            }
        }
        if !report.is_complete_success() {
            Self::warning("History was kept; fix the issues above and run undo again.");
        }
    }

    pub fn sync_report(target: &str, report: &SyncReport) {
        Self::success(&format!(
            "Uploaded {} {} to {}",
            report.uploaded,
            plural(report.uploaded),
            target
        ));
        for (path, reason) in &report.failed {
            Self::error(&format!("{}: {}", path.display(), reason));
        }
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}

/// Formats a byte count with one decimal, e.g. `1.5KB`.
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB"] {
        if size < 1024.0 {
            return format!("{:.1}{}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.1}GB", size)
}
