//! Build context containing configuration and state for a build.

use crate::config::KnapConfig;
use std::path::{Path, PathBuf};

/// Build context containing configuration and paths for a build operation.
///
/// The context provides access to all information needed to execute a build,
/// including the configuration, project root, and output directories. It is
/// an explicit value passed into each build call, so independent builds can
/// run concurrently with different configurations.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// The loaded configuration
    config: KnapConfig,
    /// Project root directory (where knap.toml is located)
    project_root: PathBuf,
    /// Whether to run in verbose mode
    verbose: bool,
    /// Number of parallel transform workers
    jobs: usize,
}

impl BuildContext {
    /// Create a new build context.
    ///
    /// # Arguments
    /// - `config` - The loaded configuration
    /// - `project_root` - The project root directory
    pub fn new(config: KnapConfig, project_root: PathBuf) -> Self {
        Self { config, project_root, verbose: false, jobs: default_jobs() }
    }

    /// Get the configuration.
    pub fn config(&self) -> &KnapConfig {
        &self.config
    }

    /// Get the project root directory.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Get the entry path (resolved to absolute).
    pub fn entry_path(&self) -> PathBuf {
        self.resolve_path(&self.config.project.entry)
    }

    /// Get the output directory (resolved to absolute).
    pub fn out_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.project.out)
    }

    /// Whether verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Number of parallel transform workers.
    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Set verbose mode.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set the number of parallel transform workers.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Resolve a config path relative to the project root.
    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }
}

/// Default worker count (available parallelism).
fn default_jobs() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}
