//! Holo CLI: maintenance commands for HoloScript incremental builds.
//!
//! Provides `holo diff` for comparing two scene snapshots, `holo cache` for
//! inspecting and pruning the persistent build cache, and `holo manifest` for
//! creating and validating build manifests.

#![warn(missing_docs)]

mod cache;
mod diff;
mod manifest;
mod project;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use holo_cache::ArtifactKind;
use tracing::Level;

/// Holo: incremental build tooling for HoloScript scenes.
#[derive(Parser, Debug)]
#[command(name = "holo", version, about = "HoloScript build tooling")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a custom `holo.toml` configuration file or project directory.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compare two composition snapshots (JSON).
    Diff(DiffArgs),
    /// Inspect or maintain the persistent build cache.
    Cache {
        /// The cache operation to run.
        #[command(subcommand)]
        command: CacheCommand,
    },
    /// Create or validate build manifests.
    Manifest {
        /// The manifest operation to run.
        #[command(subcommand)]
        command: ManifestCommand,
    },
}

/// Arguments for the `holo diff` subcommand.
#[derive(Parser, Debug)]
pub struct DiffArgs {
    /// Previous snapshot.
    pub old: PathBuf,

    /// New snapshot.
    pub new: PathBuf,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// `holo cache` operations.
#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Print entry counts, sizes and per-kind totals.
    Stats {
        /// Output format.
        #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
    },
    /// Remove expired entries and entries whose source is gone.
    Prune,
    /// Remove every entry.
    Clear,
    /// Remove the entries built from one source file.
    Invalidate {
        /// Source file path.
        source: PathBuf,

        /// Only these artifact kinds (repeatable).
        #[arg(short, long, value_parser = parse_kind)]
        kind: Vec<ArtifactKind>,

        /// Also remove entries that list the source as a dependency.
        #[arg(long)]
        dependents: bool,
    },
    /// Remove every entry carrying a tag.
    InvalidateTag {
        /// Tag to match.
        tag: String,
    },
}

/// `holo manifest` operations.
#[derive(Subcommand, Debug)]
pub enum ManifestCommand {
    /// Hash source files and write a manifest.
    Create {
        /// Output manifest path.
        output: PathBuf,

        /// Source files to record.
        #[arg(required = true, num_args = 1..)]
        sources: Vec<PathBuf>,

        /// Artifact files to record, stored as bundles.
        #[arg(long, num_args = 1..)]
        artifact: Vec<PathBuf>,
    },
    /// Check whether the sources recorded in a manifest are unchanged.
    Validate {
        /// Manifest path.
        manifest: PathBuf,
    },
}

/// Output format for reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn parse_kind(s: &str) -> Result<ArtifactKind, String> {
    s.parse()
}

fn init_tracing(global: &GlobalArgs) {
    let level = if global.quiet {
        Level::ERROR
    } else if global.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .init();
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };
    init_tracing(&global);

    let result = match cli.command {
        Command::Diff(ref args) => diff::run(args, &global),
        Command::Cache { ref command } => cache::run(command, &global),
        Command::Manifest { ref command } => manifest::run(command, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
