//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod build;
mod graph;
mod init;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;

/// Knapsack - bundle a JavaScript module graph into a single artifact
#[derive(Parser)]
#[command(name = "knap", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the bundle
    Build {
        /// Path to knap.toml (discovered by walking up from cwd if omitted)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Override the entry point
        #[arg(long)]
        entry: Option<PathBuf>,
        /// Override the output directory
        #[arg(long)]
        out: Option<PathBuf>,
        /// Override the artifact filename
        #[arg(long)]
        filename: Option<String>,
        /// Override the output module format (esm, cjs, umd)
        #[arg(long)]
        format: Option<String>,
        /// Skip the combined source map
        #[arg(long)]
        no_source_map: bool,
        /// Number of parallel transform workers
        #[arg(long, short = 'j')]
        jobs: Option<usize>,
        /// Build the graph but write nothing
        #[arg(long)]
        dry_run: bool,
        /// Verbose output
        #[arg(long, short)]
        verbose: bool,
    },
    /// Print the resolved module graph
    Graph {
        /// Path to knap.toml (discovered by walking up from cwd if omitted)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Override the entry point
        #[arg(long)]
        entry: Option<PathBuf>,
    },
    /// Scaffold a knap.toml and starter entry point
    Init {
        /// Directory to initialize (defaults to the current directory)
        dir: Option<PathBuf>,
        /// Project name (defaults to the directory name)
        #[arg(long)]
        name: Option<String>,
    },
}

/// CLI entry point.
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            config,
            entry,
            out,
            filename,
            format,
            no_source_map,
            jobs,
            dry_run,
            verbose,
        } => build::run_build(
            config.as_deref(),
            entry,
            out,
            filename,
            format,
            no_source_map,
            jobs,
            dry_run,
            verbose,
        ),
        Commands::Graph { config, entry } => graph::run_graph(config.as_deref(), entry),
        Commands::Init { dir, name } => init::run_init(dir, name),
    }
}
