//! Module graph construction.
//!
//! Work-queue traversal from the entry file, processed in frontier waves:
//! every queued path of a wave is read, transformed, and scanned in parallel,
//! then graph insertion, specifier resolution, and deduplication run
//! serially before the next wave starts. The serial phase preserves the
//! invariant that a path is transformed at most once even when the same
//! dependency is discovered from multiple importers. Any failure in a wave
//! aborts the build once the wave's in-flight work has drained.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use rayon::ThreadPool;
use thiserror::Error;

use crate::graph::imports::scan_module;
use crate::graph::{Module, ModuleGraph};
use crate::loader::LoaderRegistry;
use crate::resolve::{split_query, ResolveError, Resolver};
use crate::transform::{self, TransformError};

/// Error during graph construction. All variants are fatal.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GraphError {
    /// Unresolved entry or import specifier
    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),
    /// A transform stage rejected its input
    #[error("transform error: {0}")]
    Transform(#[from] TransformError),
    /// Source file read failure
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Worker pool setup failure
    #[error("graph build error: {0}")]
    Build(String),
}

/// A module loaded and scanned, before graph insertion.
struct LoadedModule {
    id: String,
    name: String,
    raw: String,
    code: String,
    source_map: Option<String>,
    line_preserving: bool,
    imports: Vec<String>,
    exports: Vec<String>,
    star_exports: Vec<String>,
}

/// Builds a [`ModuleGraph`] from an entry file.
pub struct GraphBuilder<'a> {
    registry: &'a LoaderRegistry,
    resolver: &'a Resolver,
    project_root: PathBuf,
    jobs: usize,
}

impl<'a> GraphBuilder<'a> {
    /// Create a builder. Module names in emitted output are computed relative
    /// to `project_root`.
    pub fn new(registry: &'a LoaderRegistry, resolver: &'a Resolver, project_root: PathBuf) -> Self {
        Self { registry, resolver, project_root, jobs: 1 }
    }

    /// Set the number of parallel transform workers.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Build the graph starting from `entry`.
    pub fn build(&self, entry: &Path) -> Result<ModuleGraph, GraphError> {
        let root = fs::canonicalize(&self.project_root)
            .unwrap_or_else(|_| self.project_root.clone());

        let entry_id = self.resolver.resolve_entry(entry)?;
        let mut graph = ModuleGraph::new(entry_id.clone());

        let pool = self.worker_pool()?;

        // Ids ever queued or inserted; checked before enqueueing so cycles
        // and self-imports terminate.
        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(entry_id.clone());
        let mut frontier = vec![entry_id];

        while !frontier.is_empty() {
            let loaded: Vec<Result<LoadedModule, GraphError>> = match &pool {
                Some(pool) => pool.install(|| {
                    frontier.par_iter().map(|id| self.load_module(id, &root)).collect()
                }),
                None => frontier.iter().map(|id| self.load_module(id, &root)).collect(),
            };

            let mut next = Vec::new();
            for item in loaded {
                let loaded = item?;
                let (file_part, _) = split_query(&loaded.id);
                let dir = Path::new(file_part)
                    .parent()
                    .map(|p| p.to_path_buf())
                    .unwrap_or_default();

                let mut dependencies = Vec::new();
                let mut import_map = HashMap::new();
                for spec in &loaded.imports {
                    let dep_id = self.resolver.resolve(spec, &dir, &loaded.name)?;
                    import_map.insert(spec.clone(), dep_id.clone());
                    if !dependencies.contains(&dep_id) {
                        dependencies.push(dep_id.clone());
                    }
                    if seen.insert(dep_id.clone()) {
                        next.push(dep_id);
                    }
                }

                // Star re-export specifiers were resolved along with the
                // other imports; map them to dependency ids for the emitter.
                let star_exports = loaded
                    .star_exports
                    .iter()
                    .filter_map(|spec| import_map.get(spec).cloned())
                    .collect();

                graph.insert(Module {
                    id: loaded.id,
                    name: loaded.name,
                    raw_source: loaded.raw,
                    transformed: loaded.code,
                    source_map: loaded.source_map,
                    dependencies,
                    import_map,
                    exports: loaded.exports,
                    star_exports,
                    synthetic: false,
                    line_preserving: loaded.line_preserving,
                });
            }
            frontier = next;
        }

        Ok(graph)
    }

    fn worker_pool(&self) -> Result<Option<ThreadPool>, GraphError> {
        if self.jobs <= 1 {
            return Ok(None);
        }
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .map(Some)
            .map_err(|e| GraphError::Build(e.to_string()))
    }

    /// Read, transform, and scan a single module.
    fn load_module(&self, id: &str, root: &Path) -> Result<LoadedModule, GraphError> {
        let (file_part, query) = split_query(id);
        let path = Path::new(file_part);
        let raw = fs::read_to_string(path)
            .map_err(|e| GraphError::Io { path: path.to_path_buf(), source: e })?;

        let (code, source_map, line_preserving) = match self.registry.resolve_chain(path) {
            Some(rule) => {
                let out = transform::apply_chain(&rule.chain, path, query, &raw, &rule.options)?;
                (out.code, out.source_map, false)
            }
            // No rule matched: the file passes through unchanged
            None => (raw.clone(), None, true),
        };

        let scan = scan_module(&code);
        Ok(LoadedModule {
            id: id.to_string(),
            name: module_name(root, id),
            raw,
            code,
            source_map,
            line_preserving,
            imports: scan.imports,
            exports: scan.exports,
            star_exports: scan.star_exports,
        })
    }
}

/// Project-root-relative module name, with the query selector retained and
/// separators normalized so artifacts are identical across platforms.
fn module_name(root: &Path, id: &str) -> String {
    let (file_part, query) = split_query(id);
    let path = Path::new(file_part);
    let rel = path.strip_prefix(root).unwrap_or(path);
    let mut name = rel.to_string_lossy().replace('\\', "/");
    if let Some(q) = query {
        name.push('?');
        name.push_str(q);
    }
    name
}
