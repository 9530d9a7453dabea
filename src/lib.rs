//! tidyboard - batch organize and rename the files of a folder
//!
//! The library scans the top-level files of a directory, builds a reviewable
//! [`Plan`] that either moves each file into a category or month subfolder or
//! renames it in place, and commits the approved rows without ever
//! overwriting an existing file. Commits are recorded so they can be undone,
//! and folders can be pushed to a sync target.

pub mod cli;
pub mod commit;
pub mod config;
pub mod destination;
pub mod file_category;
pub mod history;
pub mod output;
pub mod plan;
pub mod rename;
pub mod sync;
pub mod undo;

pub use commit::{CommitError, CommitExecutor, CommitResult};
pub use config::{AppConfig, CompiledFilters, ConfigError};
pub use destination::{ClassificationMode, DestinationPlanner};
pub use file_category::{Category, ExtensionClassifier};
pub use plan::{FileEntry, Plan, PlanAction, PlanBuilder, PlanError, PlanRow, Selection};
pub use rename::{RenameInputs, RenameSpec};
pub use undo::{UndoManager, UndoReport};

pub use cli::{RunOptions, TidyCommand, run_cli};
