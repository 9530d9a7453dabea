use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tidyboard::cli::{RunOptions, TidyCommand, run_cli};
use tidyboard::destination::ClassificationMode;
use tidyboard::rename::RenameInputs;
use tracing_subscriber::EnvFilter;

/// tidyboard - organize and batch rename the files of a folder
#[derive(Parser, Debug)]
#[command(name = "tidyboard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./.tidyboardrc.toml, then ~/.config/tidyboard/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print debug logs
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct SelectionArgs {
    /// Only touch these file names (repeatable)
    #[arg(long = "only", value_name = "NAME")]
    only: Vec<String>,

    /// Leave these file names alone (repeatable)
    #[arg(long = "skip", value_name = "NAME")]
    skip: Vec<String>,

    /// Show the plan without changing anything
    #[arg(short = 'n', long)]
    dry_run: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Move files into subfolders by type or by month
    Organize {
        directory: PathBuf,

        /// "type" or "date" (defaults to the configured mode)
        #[arg(long = "by", value_name = "MODE")]
        mode: Option<ClassificationMode>,

        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Rename files in place
    Rename {
        directory: PathBuf,

        /// New name pattern; {n} is replaced by a zero-padded counter
        #[arg(short, long)]
        pattern: Option<String>,

        /// First counter value
        #[arg(long)]
        start: Option<String>,

        /// Minimum counter width
        #[arg(long)]
        padding: Option<String>,

        /// Text to search for in each name
        #[arg(long)]
        find: Option<String>,

        /// Replacement for --find
        #[arg(long)]
        replace: Option<String>,

        #[arg(long)]
        prefix: Option<String>,

        #[arg(long)]
        suffix: Option<String>,

        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Revert the last organize or rename in a directory
    Undo { directory: PathBuf },

    /// Copy the top-level files of a directory to a sync folder
    Sync {
        directory: PathBuf,

        /// Target folder, e.g. a mounted cloud drive
        #[arg(short, long)]
        to: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "tidyboard=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let mut options = RunOptions {
        config_path: cli.config,
        ..Default::default()
    };

    let (command, directory) = match cli.command {
        Commands::Organize {
            directory,
            mode,
            selection,
        } => {
            options.only = selection.only;
            options.skip = selection.skip;
            (
                TidyCommand::Organize {
                    mode,
                    dry_run: selection.dry_run,
                },
                directory,
            )
        }
        Commands::Rename {
            directory,
            pattern,
            start,
            padding,
            find,
            replace,
            prefix,
            suffix,
            selection,
        } => {
            options.only = selection.only;
            options.skip = selection.skip;
            let inputs = RenameInputs {
                pattern,
                start,
                padding,
                find,
                replace,
                prefix,
                suffix,
            };
            (
                TidyCommand::Rename {
                    inputs,
                    dry_run: selection.dry_run,
                },
                directory,
            )
        }
        Commands::Undo { directory } => (TidyCommand::Undo, directory),
        Commands::Sync { directory, to } => (TidyCommand::Sync { target: to }, directory),
    };

    run_cli(command, &directory, &options)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
