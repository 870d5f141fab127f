//! Module graph: build-time representation of the dependency graph.
//!
//! Module identity is the canonical module id (canonical path plus any query
//! selector, or a `knap:` id for synthetic modules). A path is transformed at
//! most once; the graph also records first-discovery order, which is the
//! pinned tie-break for deterministic emission.

pub mod builder;
pub mod imports;

pub use builder::{GraphBuilder, GraphError};

use std::collections::HashMap;

/// One module in the graph.
#[derive(Debug, Clone)]
pub struct Module {
    /// Canonical module id (identity key)
    pub id: String,
    /// Project-root-relative name used in emitted artifacts
    pub name: String,
    /// Raw file contents
    pub raw_source: String,
    /// JavaScript text after the transform chain
    pub transformed: String,
    /// Serialized v3 source map from the transform chain, if any
    pub source_map: Option<String>,
    /// Dependency module ids, in scan order (synthetic deps are prepended)
    pub dependencies: Vec<String>,
    /// Import specifier -> resolved dependency id, for emit-time rewriting
    pub import_map: HashMap<String, String>,
    /// Names exported by static export statements
    pub exports: Vec<String>,
    /// Resolved dependency ids of `export * from` statements, in source order
    pub star_exports: Vec<String>,
    /// Synthetic module injected by a graph pass (identity is not a disk path)
    pub synthetic: bool,
    /// Line structure matches the raw source (no transform ran), so an
    /// identity source mapping is valid
    pub line_preserving: bool,
}

impl Module {
    /// Create a synthetic module with the given id and body.
    pub fn synthetic(id: String, body: String) -> Self {
        Self {
            name: id.clone(),
            id,
            raw_source: String::new(),
            transformed: body,
            source_map: None,
            dependencies: Vec::new(),
            import_map: HashMap::new(),
            exports: Vec::new(),
            star_exports: Vec::new(),
            synthetic: true,
            line_preserving: false,
        }
    }
}

/// The dependency graph for one build.
///
/// Build-time only; never persisted.
#[derive(Debug, Default)]
pub struct ModuleGraph {
    entry: String,
    modules: HashMap<String, Module>,
    /// First-discovery order of module ids
    order: Vec<String>,
}

impl ModuleGraph {
    /// Create an empty graph rooted at the given entry id.
    pub fn new(entry: String) -> Self {
        Self { entry, modules: HashMap::new(), order: Vec::new() }
    }

    /// Id of the entry module.
    pub fn entry_id(&self) -> &str {
        &self.entry
    }

    /// Insert a module. Re-inserting an id is ignored (a path is processed
    /// at most once).
    pub fn insert(&mut self, module: Module) {
        if !self.modules.contains_key(&module.id) {
            self.order.push(module.id.clone());
            self.modules.insert(module.id.clone(), module);
        }
    }

    /// Whether a module id is present.
    pub fn contains(&self, id: &str) -> bool {
        self.modules.contains_key(id)
    }

    /// Look up a module by id.
    pub fn get(&self, id: &str) -> Option<&Module> {
        self.modules.get(id)
    }

    /// Look up a module mutably.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Module> {
        self.modules.get_mut(id)
    }

    /// Module ids in first-discovery order.
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    /// Modules in first-discovery order.
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.order.iter().filter_map(|id| self.modules.get(id))
    }

    /// Number of modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the graph holds no modules.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Total number of dependency edges.
    pub fn edge_count(&self) -> usize {
        self.modules.values().map(|m| m.dependencies.len()).sum()
    }
}
