//! Canon CLI - canonical code ingestion and drift detection.
//!
//! Canon stores every ingestion of a Python file as an immutable snapshot,
//! reports structural drift between snapshots, and proves that the stored
//! components rebuild the original source.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod cli;

/// Canon: canonical code ingestion and drift detection.
#[derive(Parser)]
#[command(name = "canon")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Workspace root directory (defaults to current directory)
    #[arg(short, long, global = true)]
    workspace: Option<PathBuf>,

    /// Database path (overrides the workspace configuration)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest source files as new versions
    Ingest {
        /// Files to ingest
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Rebuild the latest version of a file and compare it with the source
    Verify {
        /// File to verify
        file: PathBuf,
    },

    /// List the components of a file
    Components {
        /// File to inspect
        file: PathBuf,

        /// Version number (defaults to the latest)
        #[arg(long)]
        version: Option<u32>,
    },

    /// Show drift detected for a version of a file
    Drift {
        /// File to inspect
        file: PathBuf,

        /// Version number (defaults to the latest)
        #[arg(long)]
        version: Option<u32>,
    },

    /// List the versions of a file
    Versions {
        /// File to inspect
        file: PathBuf,
    },

    /// Show the history of one component
    History {
        /// File containing the component
        file: PathBuf,

        /// Qualified component name (e.g., "`ClassA.method_b`")
        qualified_name: String,
    },

    /// Show store statistics
    Stats,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Determine workspace root
    let workspace = match cli.workspace {
        Some(w) => w,
        None => match std::env::current_dir() {
            Ok(dir) => dir,
            Err(e) => {
                eprintln!(
                    "{}: failed to get current directory: {e}",
                    "error".red().bold()
                );
                return ExitCode::FAILURE;
            }
        },
    };

    let ctx = cli::Context {
        workspace,
        database: cli.database,
        json: cli.json,
    };

    // Run the appropriate command
    let result = match cli.command {
        Commands::Ingest { files } => cli::ingest::run(&ctx, &files),
        Commands::Verify { file } => cli::verify::run(&ctx, &file),
        Commands::Components { file, version } => cli::components::run(&ctx, &file, version),
        Commands::Drift { file, version } => cli::drift::run(&ctx, &file, version),
        Commands::Versions { file } => cli::versions::run(&ctx, &file),
        Commands::History {
            file,
            qualified_name,
        } => cli::history::run(&ctx, &file, &qualified_name),
        Commands::Stats => cli::stats::run(&ctx),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {e}", "error".red().bold());
            // Show cause chain for nested errors
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                eprintln!("  {}: {cause}", "caused by".dimmed());
                source = std::error::Error::source(cause);
            }
            ExitCode::from(e.exit_code())
        }
    }
}
