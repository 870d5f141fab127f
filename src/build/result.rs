//! Build result types.
//!
//! Contains types for representing the outcome of a build: written
//! artifacts, collected non-fatal warnings, and timing.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Non-fatal condition collected during a build and reported after success.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BuildWarning {
    /// An import cycle was broken during emission by skipping a back edge
    CyclicOutput {
        /// Module whose dependency edge was skipped
        from: String,
        /// The cyclic dependency
        to: String,
    },
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildWarning::CyclicOutput { from, to } => {
                write!(f, "import cycle broken during emit: {from} -> {to} (edge skipped)")
            }
        }
    }
}

/// Result of a complete build run.
#[derive(Debug, Default)]
pub struct BuildResult {
    /// Paths of written artifacts (bundle and source map)
    pub artifacts: Vec<PathBuf>,
    /// Number of modules in the final graph (synthetic included)
    pub module_count: usize,
    /// Non-fatal warnings collected during the build
    pub warnings: Vec<BuildWarning>,
    /// Total build duration
    pub duration: Duration,
}

impl BuildResult {
    /// Whether the build produced warnings.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
