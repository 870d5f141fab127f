//! Combined source map assembly.
//!
//! The bundle carries a single v3 index map with one section per mapped
//! module, offset to the module body's first line inside the bundle.
//! A transform-produced map is embedded as-is; pass-through modules get a
//! synthesized identity line mapping with `sourcesContent`, which is valid
//! because emit-time rewriting never changes their line structure.

use serde_json::{json, Value};

use crate::graph::Module;

/// Build the serialized index map for a rendered bundle.
///
/// `sections` pairs each mapped module with the zero-based bundle line its
/// body starts on.
pub(crate) fn build_index_map(file: &str, sections: &[(u32, &Module)]) -> String {
    let sections: Vec<Value> = sections
        .iter()
        .map(|(line, module)| {
            let map = module
                .source_map
                .as_deref()
                .and_then(|raw| serde_json::from_str(raw).ok())
                .unwrap_or_else(|| identity_map(module));
            json!({
                "offset": { "line": line, "column": 0 },
                "map": map,
            })
        })
        .collect();

    json!({
        "version": 3,
        "file": file,
        "sections": sections,
    })
    .to_string()
}

/// Identity line mapping for a module whose output lines match its source.
fn identity_map(module: &Module) -> Value {
    json!({
        "version": 3,
        "file": module.name,
        "sources": [module.name],
        "sourcesContent": [module.raw_source],
        "names": [],
        "mappings": identity_mappings(module.raw_source.lines().count()),
    })
}

/// VLQ mappings string mapping output line N column 0 to source line N
/// column 0 of source index 0: `AAAA` for the first line, `AACA` (source
/// line delta +1) for each following line.
fn identity_mappings(lines: usize) -> String {
    let mut mappings = String::new();
    for i in 0..lines {
        if i == 0 {
            mappings.push_str("AAAA");
        } else {
            mappings.push_str(";AACA");
        }
    }
    mappings
}
