//! Build pipeline orchestration.
//!
//! One build is one logical operation: construct the module graph, run the
//! polyfill injection pass, then emit artifacts. Any fatal error aborts the
//! build before the output directory is touched.

use std::time::Instant;

use thiserror::Error;

use crate::build::{BuildContext, BuildResult};
use crate::config::ConfigError;
use crate::emit::{self, Emitter, OutputError};
use crate::graph::{GraphBuilder, GraphError, ModuleGraph};
use crate::loader::LoaderRegistry;
use crate::polyfill::{self, PolyfillSet, UnknownCapability};
use crate::resolve::Resolver;

/// Error during build execution.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BuildError {
    /// Configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    /// Graph construction error (resolution, transform, or read failure)
    #[error("Build error: {0}")]
    Graph(#[from] GraphError),
    /// Unknown polyfill capability
    #[error("Config error: {0}")]
    Polyfill(#[from] UnknownCapability),
    /// Artifact write error
    #[error("Output error: {0}")]
    Output(#[from] OutputError),
}

/// Build pipeline for executing builds.
pub struct BuildPipeline {
    /// Build context
    context: BuildContext,
    /// Whether to do a dry run (build the graph, write nothing)
    dry_run: bool,
    /// Registry override for library callers with custom transforms
    registry: Option<LoaderRegistry>,
}

impl BuildPipeline {
    /// Create a new build pipeline.
    pub fn new(context: BuildContext) -> Self {
        Self { context, dry_run: false, registry: None }
    }

    /// Set dry-run mode (build the graph, write nothing).
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Replace the config-derived loader registry, for callers plugging in
    /// transforms that are not built-ins.
    pub fn with_registry(mut self, registry: LoaderRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Get the build context.
    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    /// Run the build.
    pub fn build(&self) -> Result<BuildResult, BuildError> {
        let start = Instant::now();
        let graph = self.build_graph()?;

        if self.dry_run {
            return Ok(BuildResult {
                artifacts: Vec::new(),
                module_count: graph.len(),
                warnings: Vec::new(),
                duration: start.elapsed(),
            });
        }

        let config = self.context.config();
        let emitter = Emitter::new(&graph, config.output.format, config.output.filename.clone())
            .with_source_map(config.output.source_map)
            .with_umd_name(config.project.name.clone());
        let (artifacts, warnings) = emitter.render();
        let written = emit::write_artifacts(&artifacts, &self.context.out_dir())?;

        Ok(BuildResult {
            artifacts: written,
            module_count: graph.len(),
            warnings,
            duration: start.elapsed(),
        })
    }

    /// Build the module graph without emitting.
    pub fn build_graph(&self) -> Result<ModuleGraph, BuildError> {
        let config = self.context.config();

        let owned;
        let registry: &LoaderRegistry = match self.registry.as_ref() {
            Some(registry) => registry,
            None => {
                owned = LoaderRegistry::from_config(&config.rules)?;
                &owned
            }
        };

        let resolver = Resolver::new(config.resolve.extensions.clone());
        let mut graph = GraphBuilder::new(
            registry,
            &resolver,
            self.context.project_root().to_path_buf(),
        )
        .with_jobs(self.context.jobs())
        .build(&self.context.entry_path())?;

        if config.polyfills.enabled {
            let set = PolyfillSet::from_names(&config.polyfills.capabilities)?;
            polyfill::inject(&mut graph, &set);
        }

        Ok(graph)
    }
}
