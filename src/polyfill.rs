//! Runtime polyfill injection.
//!
//! A graph-mutation pass that scans every module's transformed text for
//! references to target-runtime globals and wires in synthetic shim modules
//! as implicit dependencies. Synthetic identity is the capability name
//! (`knap:polyfill/<name>`), not a path on disk, and the pass is idempotent:
//! a second run adds no modules and no edges.

use regex::Regex;
use thiserror::Error;

use crate::graph::{Module, ModuleGraph};

/// Prefix for synthetic polyfill module ids.
pub const POLYFILL_ID_PREFIX: &str = "knap:polyfill/";

struct CapabilityDef {
    name: &'static str,
    pattern: &'static str,
    shim: &'static str,
}

const CAPABILITIES: &[CapabilityDef] = &[
    CapabilityDef {
        name: "process",
        pattern: r"\bprocess\b",
        shim: "if (typeof globalThis.process === \"undefined\") {\n  globalThis.process = {\n    env: {},\n    argv: [],\n    platform: \"browser\",\n    cwd: function () { return \"/\"; },\n    nextTick: function (fn) { Promise.resolve().then(fn); }\n  };\n}",
    },
    CapabilityDef {
        name: "buffer",
        pattern: r"\bBuffer\b",
        shim: "if (typeof globalThis.Buffer === \"undefined\") {\n  globalThis.Buffer = {\n    from: function (data) { return new TextEncoder().encode(String(data)); },\n    isBuffer: function () { return false; }\n  };\n}",
    },
    CapabilityDef {
        name: "global",
        pattern: r"\bglobal\b",
        shim: "if (typeof globalThis.global === \"undefined\") {\n  globalThis.global = globalThis;\n}",
    },
    CapabilityDef {
        name: "setImmediate",
        pattern: r"\bsetImmediate\b",
        shim: "if (typeof globalThis.setImmediate === \"undefined\") {\n  globalThis.setImmediate = function (fn) { return setTimeout(fn, 0); };\n  globalThis.clearImmediate = function (id) { clearTimeout(id); };\n}",
    },
];

/// Names of all supported capabilities.
pub fn capability_names() -> Vec<&'static str> {
    CAPABILITIES.iter().map(|c| c.name).collect()
}

/// Unknown capability name in configuration.
#[derive(Debug, Error)]
#[error("unknown polyfill capability '{0}' (supported: {})", capability_names().join(", "))]
pub struct UnknownCapability(pub String);

/// A compiled capability: reference pattern plus shim body.
#[derive(Debug)]
struct Capability {
    name: &'static str,
    regex: Regex,
    shim: &'static str,
}

impl Capability {
    fn module_id(&self) -> String {
        format!("{POLYFILL_ID_PREFIX}{}", self.name)
    }
}

/// The fixed set of capabilities enabled for one build.
#[derive(Debug)]
pub struct PolyfillSet {
    caps: Vec<Capability>,
}

impl PolyfillSet {
    /// Set containing every supported capability.
    pub fn all() -> Self {
        Self::compile(CAPABILITIES.iter())
    }

    /// Set built from configured capability names.
    pub fn from_names(names: &[String]) -> Result<Self, UnknownCapability> {
        let mut defs = Vec::new();
        for name in names {
            match CAPABILITIES.iter().find(|c| c.name == name) {
                Some(def) => defs.push(def),
                None => return Err(UnknownCapability(name.clone())),
            }
        }
        Ok(Self::compile(defs.into_iter()))
    }

    fn compile<'a>(defs: impl Iterator<Item = &'a CapabilityDef>) -> Self {
        let caps = defs
            .map(|def| Capability {
                name: def.name,
                // Patterns are static and known-valid
                regex: Regex::new(def.pattern).unwrap(),
                shim: def.shim,
            })
            .collect();
        Self { caps }
    }

    /// Number of capabilities in the set.
    pub fn len(&self) -> usize {
        self.caps.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.caps.is_empty()
    }
}

/// Inject polyfill modules into the graph.
///
/// For each enabled capability, every non-synthetic module whose transformed
/// text references the capability's global gets the shared synthetic module
/// prepended to its dependency list (once). Local shadowing of the global is
/// not analyzed.
pub fn inject(graph: &mut ModuleGraph, set: &PolyfillSet) {
    // Scan first (immutable), mutate after.
    let mut hits: Vec<(String, usize)> = Vec::new();
    for module in graph.modules() {
        if module.synthetic {
            continue;
        }
        for (idx, cap) in set.caps.iter().enumerate() {
            if cap.regex.is_match(&module.transformed) {
                hits.push((module.id.clone(), idx));
            }
        }
    }

    for (module_id, idx) in hits {
        let cap = &set.caps[idx];
        let synth_id = cap.module_id();
        if !graph.contains(&synth_id) {
            graph.insert(Module::synthetic(synth_id.clone(), cap.shim.to_string()));
        }
        if let Some(module) = graph.get_mut(&module_id) {
            if !module.dependencies.contains(&synth_id) {
                module.dependencies.insert(0, synth_id);
            }
        }
    }
}
