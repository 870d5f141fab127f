//! Output emission: deterministic module ordering, format wrapping, and
//! all-or-nothing artifact writing.
//!
//! Modules are ordered by a depth-first post-order traversal from the entry
//! (dependencies before dependents). Back edges are skipped and surfaced as
//! non-fatal cycle warnings; tie-breaks follow each module's stored
//! dependency order, which is scan order, so the same graph always emits the
//! same bytes. Artifacts are written to a staging directory and renamed into
//! place, so a failed build never leaves a partially written output tree.

mod rewrite;
mod sourcemap;

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::build::BuildWarning;
use crate::config::ModuleFormat;
use crate::graph::ModuleGraph;
use crate::transform::js_string;

/// Filesystem failure during directory swap or artifact write. Fatal.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OutputError {
    /// IO error during staging, clearing, or renaming
    #[error("IO error writing {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The configured output directory is a symlink
    #[error("output directory {} is a symlink; refusing to replace it", .0.display())]
    OutputDirSymlink(PathBuf),
}

/// A rendered output target.
#[derive(Debug, Clone)]
pub struct OutputArtifact {
    /// Filename inside the output directory
    pub filename: String,
    /// Module format the body is wrapped for
    pub format: ModuleFormat,
    /// Bundled JavaScript text
    pub body: String,
    /// Combined v3 index source map, when enabled
    pub source_map: Option<String>,
}

const RUNTIME_PRELUDE: &str = "\
var __knap_modules = {};
var __knap_cache = {};
function __knap_define(id, factory) {
  __knap_modules[id] = factory;
}
function __knap_require(id) {
  var cached = __knap_cache[id];
  if (cached) {
    return cached.exports;
  }
  var module = { exports: {} };
  __knap_cache[id] = module;
  __knap_modules[id](module, module.exports, __knap_require);
  return module.exports;
}";

/// Compute the emission order for a graph.
///
/// Depth-first post-order from the entry, driven by an explicit frame stack
/// so arbitrarily deep import chains cannot exhaust the call stack. A
/// dependency already on the visit path is a back edge: the edge is skipped,
/// the cycle is reported as a warning, and emission continues. Every
/// reachable module appears exactly once.
pub fn module_order(graph: &ModuleGraph) -> (Vec<String>, Vec<BuildWarning>) {
    let mut visited: HashSet<String> = HashSet::new();
    let mut on_path: HashSet<String> = HashSet::new();
    let mut order = Vec::new();
    let mut warnings = Vec::new();

    let entry = graph.entry_id().to_string();
    on_path.insert(entry.clone());
    // Each frame is a module id plus the index of its next unvisited edge.
    let mut stack: Vec<(String, usize)> = vec![(entry, 0)];

    while let Some((id, next)) = stack.last().map(|(id, next)| (id.clone(), *next)) {
        let dep = graph.get(&id).and_then(|m| m.dependencies.get(next)).cloned();
        match dep {
            Some(dep) => {
                if let Some(frame) = stack.last_mut() {
                    frame.1 += 1;
                }
                if visited.contains(&dep) {
                    continue;
                }
                if on_path.contains(&dep) {
                    warnings.push(BuildWarning::CyclicOutput {
                        from: display_name(graph, &id),
                        to: display_name(graph, &dep),
                    });
                    continue;
                }
                on_path.insert(dep.clone());
                stack.push((dep, 0));
            }
            None => {
                stack.pop();
                on_path.remove(&id);
                visited.insert(id.clone());
                order.push(id);
            }
        }
    }
    (order, warnings)
}

fn display_name(graph: &ModuleGraph, id: &str) -> String {
    graph.get(id).map(|m| m.name.clone()).unwrap_or_else(|| id.to_string())
}

/// Public export names of the entry module, star re-exports flattened.
///
/// Names come from the entry's own static exports first, then breadth-first
/// from each `export * from` dependency in source order. Per ES semantics a
/// star re-export never forwards `default`. First occurrence of a name wins.
fn entry_export_names(graph: &ModuleGraph) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: Vec<(String, bool)> = vec![(graph.entry_id().to_string(), true)];
    let mut head = 0;

    while head < queue.len() {
        let (id, include_default) = queue[head].clone();
        head += 1;
        if !visited.insert(id.clone()) {
            continue;
        }
        if let Some(module) = graph.get(&id) {
            for export in &module.exports {
                if (include_default || export != "default") && !names.contains(export) {
                    names.push(export.clone());
                }
            }
            for dep in &module.star_exports {
                queue.push((dep.clone(), false));
            }
        }
    }
    names
}

/// Renders and writes output artifacts for one graph.
pub struct Emitter<'a> {
    graph: &'a ModuleGraph,
    format: ModuleFormat,
    filename: String,
    source_map: bool,
    /// Global name used by the UMD fallback branch
    umd_name: String,
}

impl<'a> Emitter<'a> {
    /// Create an emitter for a graph and output target.
    pub fn new(graph: &'a ModuleGraph, format: ModuleFormat, filename: String) -> Self {
        Self { graph, format, filename, source_map: true, umd_name: "bundle".to_string() }
    }

    /// Enable or disable the combined source map.
    pub fn with_source_map(mut self, source_map: bool) -> Self {
        self.source_map = source_map;
        self
    }

    /// Set the UMD global name.
    pub fn with_umd_name(mut self, name: String) -> Self {
        self.umd_name = name;
        self
    }

    /// Render the bundle without touching the filesystem.
    pub fn render(&self) -> (Vec<OutputArtifact>, Vec<BuildWarning>) {
        let (order, warnings) = module_order(self.graph);

        let mut body = String::new();
        let mut line: u32 = 0;
        let mut sections: Vec<(u32, &crate::graph::Module)> = Vec::new();

        if self.format == ModuleFormat::Umd {
            push_block(&mut body, &mut line, &umd_header(&self.umd_name));
        }
        push_block(&mut body, &mut line, RUNTIME_PRELUDE);

        for id in &order {
            let module = match self.graph.get(id) {
                Some(m) => m,
                None => continue,
            };

            // Synthetic shims install globals; they run before any factory.
            if module.synthetic {
                push_block(&mut body, &mut line, &module.transformed);
                continue;
            }

            push_block(
                &mut body,
                &mut line,
                &format!(
                    "__knap_define({}, function (module, exports, __knap_require) {{",
                    js_string(&module.name)
                ),
            );
            if self.source_map && (module.source_map.is_some() || module.line_preserving) {
                sections.push((line, module));
            }
            push_block(&mut body, &mut line, &rewrite::rewrite_module(module, self.graph));
            push_block(&mut body, &mut line, "});");
        }

        let entry = self.graph.get(self.graph.entry_id());
        let entry_name = entry.map(|m| m.name.clone()).unwrap_or_default();
        let entry_require = format!("__knap_require({})", js_string(&entry_name));

        match self.format {
            ModuleFormat::Esm => {
                push_block(&mut body, &mut line, &format!("var __knap_entry = {entry_require};"));
                for export in entry_export_names(self.graph) {
                    if export == "default" {
                        push_block(&mut body, &mut line, "export default __knap_entry.default;");
                    } else {
                        push_block(
                            &mut body,
                            &mut line,
                            &format!("export var {export} = __knap_entry.{export};"),
                        );
                    }
                }
            }
            ModuleFormat::Cjs => {
                push_block(&mut body, &mut line, &format!("module.exports = {entry_require};"));
            }
            ModuleFormat::Umd => {
                push_block(&mut body, &mut line, &format!("return {entry_require};"));
                push_block(&mut body, &mut line, "});");
            }
        }

        let source_map = if self.source_map {
            push_block(&mut body, &mut line, &format!("//# sourceMappingURL={}.map", self.filename));
            Some(sourcemap::build_index_map(&self.filename, &sections))
        } else {
            None
        };

        let artifact = OutputArtifact {
            filename: self.filename.clone(),
            format: self.format,
            body,
            source_map,
        };
        (vec![artifact], warnings)
    }

    /// Render and write artifacts, replacing `out_dir` atomically.
    pub fn emit(
        &self,
        out_dir: &Path,
    ) -> Result<(Vec<OutputArtifact>, Vec<BuildWarning>), OutputError> {
        let (artifacts, warnings) = self.render();
        write_artifacts(&artifacts, out_dir)?;
        Ok((artifacts, warnings))
    }
}

/// Write artifacts to a staging directory, then swap it into place.
///
/// The previous output directory is removed only after every artifact has
/// been written, and the swap is a single rename, so interruption never
/// leaves `out_dir` empty or partially written. A symlinked `out_dir` is
/// refused rather than followed.
pub fn write_artifacts(artifacts: &[OutputArtifact], out_dir: &Path) -> Result<Vec<PathBuf>, OutputError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| OutputError::Io { path, source }
    };

    let staging = staging_dir(out_dir);
    if staging.exists() {
        fs::remove_dir_all(&staging).map_err(io_err(&staging))?;
    }
    fs::create_dir_all(&staging).map_err(io_err(&staging))?;

    let mut written = Vec::new();
    for artifact in artifacts {
        let path = staging.join(&artifact.filename);
        fs::write(&path, &artifact.body).map_err(io_err(&path))?;
        written.push(out_dir.join(&artifact.filename));

        if let Some(map) = &artifact.source_map {
            let map_name = format!("{}.map", artifact.filename);
            let map_path = staging.join(&map_name);
            fs::write(&map_path, map).map_err(io_err(&map_path))?;
            written.push(out_dir.join(map_name));
        }
    }

    if let Ok(meta) = fs::symlink_metadata(out_dir) {
        if meta.file_type().is_symlink() {
            let _ = fs::remove_dir_all(&staging);
            return Err(OutputError::OutputDirSymlink(out_dir.to_path_buf()));
        }
        let clear = if meta.is_dir() {
            fs::remove_dir_all(out_dir)
        } else {
            fs::remove_file(out_dir)
        };
        if let Err(source) = clear {
            let _ = fs::remove_dir_all(&staging);
            return Err(OutputError::Io { path: out_dir.to_path_buf(), source });
        }
    }

    if let Err(source) = fs::rename(&staging, out_dir) {
        let _ = fs::remove_dir_all(&staging);
        return Err(OutputError::Io { path: out_dir.to_path_buf(), source });
    }

    Ok(written)
}

fn staging_dir(out_dir: &Path) -> PathBuf {
    let name = out_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string());
    let staged = format!(".{name}.knap-stage");
    match out_dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(staged),
        _ => PathBuf::from(staged),
    }
}

fn umd_header(name: &str) -> String {
    format!(
        "(function (root, factory) {{
  if (typeof module === \"object\" && module.exports) {{
    module.exports = factory();
  }} else if (typeof define === \"function\" && define.amd) {{
    define(factory);
  }} else {{
    root[{}] = factory();
  }}
}})(typeof self !== \"undefined\" ? self : this, function () {{",
        js_string(name)
    )
}

/// Append a block of text, tracking the current output line.
fn push_block(out: &mut String, line: &mut u32, text: &str) {
    out.push_str(text);
    *line += text.matches('\n').count() as u32;
    if !text.ends_with('\n') {
        out.push('\n');
        *line += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Module;
    use std::collections::HashMap;

    fn module(id: &str, deps: &[&str], code: &str, exports: &[&str]) -> Module {
        Module {
            id: id.to_string(),
            name: id.to_string(),
            raw_source: code.to_string(),
            transformed: code.to_string(),
            source_map: None,
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
            import_map: HashMap::new(),
            exports: exports.iter().map(|e| e.to_string()).collect(),
            star_exports: Vec::new(),
            synthetic: false,
            line_preserving: true,
        }
    }

    fn graph(entry: &str, modules: Vec<Module>) -> ModuleGraph {
        let mut g = ModuleGraph::new(entry.to_string());
        for m in modules {
            g.insert(m);
        }
        g
    }

    #[test]
    fn dependencies_come_before_dependents() {
        let g = graph(
            "main",
            vec![
                module("main", &["a", "b"], "", &[]),
                module("a", &["c"], "", &[]),
                module("b", &["c"], "", &[]),
                module("c", &[], "", &[]),
            ],
        );
        let (order, warnings) = module_order(&g);
        assert!(warnings.is_empty());
        assert_eq!(order, vec!["c", "a", "b", "main"]);

        let pos = |id: &str| order.iter().position(|o| o == id).unwrap();
        for m in g.modules() {
            for dep in &m.dependencies {
                assert!(pos(dep) < pos(&m.id), "{dep} must precede {}", m.id);
            }
        }
    }

    #[test]
    fn cycle_is_broken_with_a_warning_and_each_module_emitted_once() {
        let g = graph(
            "a",
            vec![module("a", &["b"], "", &[]), module("b", &["a"], "", &[])],
        );
        let (order, warnings) = module_order(&g);
        assert_eq!(order, vec!["b", "a"]);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].to_string().contains('b'));
    }

    #[test]
    fn order_is_deterministic() {
        let g = graph(
            "main",
            vec![
                module("main", &["x", "y"], "", &[]),
                module("x", &["y"], "", &[]),
                module("y", &["x"], "", &[]),
            ],
        );
        let (first, _) = module_order(&g);
        let (second, _) = module_order(&g);
        assert_eq!(first, second);
    }

    #[test]
    fn deep_dependency_chain_orders_without_exhausting_the_stack() {
        let count = 10_000;
        let mut modules = Vec::new();
        for i in 0..count {
            let dep = format!("m{}", i + 1);
            let edge = [dep.as_str()];
            let deps: &[&str] = if i + 1 < count { &edge } else { &[] };
            modules.push(module(&format!("m{i}"), deps, "", &[]));
        }
        let g = graph("m0", modules);

        let (order, warnings) = module_order(&g);
        assert!(warnings.is_empty());
        assert_eq!(order.len(), count);
        let deepest = format!("m{}", count - 1);
        assert_eq!(order.first(), Some(&deepest));
        assert_eq!(order.last().map(String::as_str), Some("m0"));
    }

    #[test]
    fn esm_footer_reexports_entry_statics() {
        let g = graph(
            "main.js",
            vec![module("main.js", &[], "var greet = 1;\n", &["default", "greet"])],
        );
        let (artifacts, _) = Emitter::new(&g, ModuleFormat::Esm, "out.js".to_string()).render();
        let body = &artifacts[0].body;
        assert!(body.contains("export default __knap_entry.default;"));
        assert!(body.contains("export var greet = __knap_entry.greet;"));
    }

    #[test]
    fn esm_footer_surfaces_star_reexported_names() {
        let mut entry = module(
            "main.js",
            &["util.js"],
            "Object.assign(exports, __knap_require(\"util.js\"));\n",
            &[],
        );
        entry.star_exports = vec!["util.js".to_string()];
        let util = module("util.js", &[], "", &["greet", "version", "default"]);
        let g = graph("main.js", vec![entry, util]);

        let (artifacts, _) = Emitter::new(&g, ModuleFormat::Esm, "out.js".to_string()).render();
        let body = &artifacts[0].body;
        assert!(body.contains("export var greet = __knap_entry.greet;"));
        assert!(body.contains("export var version = __knap_entry.version;"));
        // A star re-export never forwards the dependency's default
        assert!(!body.contains("export default"));
    }

    #[test]
    fn cjs_footer_assigns_module_exports() {
        let g = graph("main.js", vec![module("main.js", &[], "", &["default"])]);
        let (artifacts, _) = Emitter::new(&g, ModuleFormat::Cjs, "out.js".to_string()).render();
        assert!(artifacts[0]
            .body
            .contains("module.exports = __knap_require(\"main.js\");"));
    }

    #[test]
    fn umd_wrapper_names_the_global() {
        let g = graph("main.js", vec![module("main.js", &[], "", &[])]);
        let (artifacts, _) = Emitter::new(&g, ModuleFormat::Umd, "out.js".to_string())
            .with_umd_name("widget".to_string())
            .render();
        let body = &artifacts[0].body;
        assert!(body.contains("root[\"widget\"] = factory();"));
        assert!(body.contains("return __knap_require(\"main.js\");"));
    }

    #[test]
    fn synthetic_modules_are_emitted_as_plain_statements() {
        let mut g = graph("main.js", vec![module("main.js", &[], "process.env;\n", &[])]);
        crate::polyfill::inject(&mut g, &crate::polyfill::PolyfillSet::all());
        let (artifacts, _) = Emitter::new(&g, ModuleFormat::Esm, "out.js".to_string()).render();
        let body = &artifacts[0].body;
        assert!(body.contains("globalThis.process"));
        assert!(!body.contains("__knap_define(\"knap:polyfill/process\""));
    }

    #[test]
    fn source_map_can_be_disabled() {
        let g = graph("main.js", vec![module("main.js", &[], "", &[])]);
        let (artifacts, _) = Emitter::new(&g, ModuleFormat::Esm, "out.js".to_string())
            .with_source_map(false)
            .render();
        assert!(artifacts[0].source_map.is_none());
        assert!(!artifacts[0].body.contains("sourceMappingURL"));
    }
}
