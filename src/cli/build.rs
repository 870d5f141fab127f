//! Build command implementation

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use super::{EXIT_ERROR, EXIT_SUCCESS};
use crate::build::{BuildContext, BuildPipeline};
use crate::config::{
    default_config, find_config, load_config, merge_cli_overrides, CliOverrides, KnapConfig,
    ModuleFormat,
};

/// Load configuration and determine the project root.
pub(crate) fn load_project(
    config_path: Option<&Path>,
    verbose: bool,
) -> Result<(KnapConfig, PathBuf), String> {
    let path = match config_path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match path {
        Some(path) => {
            if verbose {
                println!("Using config: {}", path.display());
            }
            let config = load_config(Some(&path)).map_err(|e| e.to_string())?;
            let root = path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());
            Ok((config, root))
        }
        None => {
            if verbose {
                println!("No knap.toml found, using defaults");
            }
            let root = std::env::current_dir().unwrap_or_default();
            Ok((default_config(), root))
        }
    }
}

/// Run the build command
pub fn run_build(
    config_path: Option<&Path>,
    entry: Option<PathBuf>,
    out: Option<PathBuf>,
    filename: Option<String>,
    format: Option<String>,
    no_source_map: bool,
    jobs: Option<usize>,
    dry_run: bool,
    verbose: bool,
) -> ExitCode {
    let format = match format.as_deref().map(str::parse::<ModuleFormat>).transpose() {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let (mut config, project_root) = match load_project(config_path, verbose) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let overrides = CliOverrides { entry, out, filename, format, no_source_map };
    merge_cli_overrides(&mut config, &overrides);

    let mut context = BuildContext::new(config, project_root).with_verbose(verbose);
    if let Some(jobs) = jobs {
        context = context.with_jobs(jobs);
    }

    if verbose {
        println!("Entry:  {}", context.entry_path().display());
        println!("Output: {}", context.out_dir().display());
    }

    let pipeline = BuildPipeline::new(context).with_dry_run(dry_run);
    match pipeline.build() {
        Ok(result) => {
            if dry_run {
                println!("Dry run: {} modules, nothing written", result.module_count);
            } else {
                println!(
                    "Bundled {} modules in {:.2?}",
                    result.module_count, result.duration
                );
                for artifact in &result.artifacts {
                    println!("  {}", artifact.display());
                }
            }
            for warning in &result.warnings {
                eprintln!("warning: {warning}");
            }
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}
