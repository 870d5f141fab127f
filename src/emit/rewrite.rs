//! Emit-time rewriting of one module body.
//!
//! Converts static import/export statements into runtime require calls and
//! export-object assignments so the body runs inside its scope-preserving
//! factory. Shares the scan patterns with the import scanner, so every
//! statement recorded as a dependency is also rewritten here. Each rewrite
//! is a single statement padded to the replaced statement's line span, so
//! the line structure of pass-through modules stays intact for identity
//! source mappings.

use regex::Captures;

use crate::graph::imports::{named_pairs, patterns};
use crate::graph::{Module, ModuleGraph};
use crate::transform::js_string;

/// Rewrite a module body for inclusion in the bundle.
pub(crate) fn rewrite_module(module: &Module, graph: &ModuleGraph) -> String {
    let p = patterns();

    // Emitted names for resolved specifiers. A specifier missing from the
    // map was never recorded by the scanner; its statement stays untouched.
    let resolve = |spec: &str| -> Option<String> {
        module.import_map.get(spec).and_then(|id| graph.get(id)).map(|m| m.name.clone())
    };
    let require = |name: &str| format!("__knap_require({})", js_string(name));

    // Declaration exports keep their declaration in place and are assigned
    // onto the export object after the body.
    let decl_names: Vec<String> =
        p.export_decl.captures_iter(&module.transformed).map(|c| c[3].to_string()).collect();

    let mut code = module.transformed.clone();

    code = p
        .export_from
        .replace_all(&code, |caps: &Captures| match resolve(&caps[2]) {
            Some(name) => {
                let req = require(&name);
                let rewritten = if &caps[1] == "*" {
                    format!("Object.assign(exports, {req});")
                } else {
                    let inner = caps[1].trim_start_matches('{').trim_end_matches('}');
                    let assigns: Vec<String> = named_pairs(inner)
                        .into_iter()
                        .map(|(from, to)| format!("exports.{to} = __m.{from};"))
                        .collect();
                    format!("{{ var __m = {req}; {} }}", assigns.join(" "))
                };
                keep_lines(rewritten, &caps[0])
            }
            None => caps[0].to_string(),
        })
        .into_owned();

    code = p
        .static_import
        .replace_all(&code, |caps: &Captures| match resolve(&caps[2]) {
            Some(name) => keep_lines(rewrite_import_clause(&caps[1], &require(&name)), &caps[0]),
            None => caps[0].to_string(),
        })
        .into_owned();

    code = p
        .side_effect
        .replace_all(&code, |caps: &Captures| match resolve(&caps[1]) {
            Some(name) => format!("{};", require(&name)),
            None => caps[0].to_string(),
        })
        .into_owned();

    code = p.export_default.replace_all(&code, "${1}exports.default =").into_owned();
    code = p.export_decl.replace_all(&code, "${1}${2} ${3}").into_owned();

    code = p
        .export_named
        .replace_all(&code, |caps: &Captures| {
            let assigns = named_pairs(&caps[1])
                .into_iter()
                .map(|(from, to)| format!("exports.{to} = {from};"))
                .collect::<Vec<_>>()
                .join(" ");
            keep_lines(assigns, &caps[0])
        })
        .into_owned();

    code = p
        .dynamic_import
        .replace_all(&code, |caps: &Captures| match resolve(&caps[1]) {
            Some(name) => format!("Promise.resolve({})", require(&name)),
            None => caps[0].to_string(),
        })
        .into_owned();

    code = p
        .require_call
        .replace_all(&code, |caps: &Captures| match resolve(&caps[1]) {
            Some(name) => require(&name),
            None => caps[0].to_string(),
        })
        .into_owned();

    if !decl_names.is_empty() {
        if !code.ends_with('\n') {
            code.push('\n');
        }
        for name in &decl_names {
            code.push_str(&format!("exports.{name} = {name};\n"));
        }
    }

    code
}

/// Pad a single-statement rewrite with trailing newlines so it spans as many
/// lines as the statement it replaces. Keeps the line structure of modules
/// with multi-line import or export lists intact for identity mappings.
fn keep_lines(mut rewritten: String, matched: &str) -> String {
    for _ in rewritten.matches('\n').count()..matched.matches('\n').count() {
        rewritten.push('\n');
    }
    rewritten
}

/// Rewrite an import clause into destructuring from the require expression.
fn rewrite_import_clause(clause: &str, req: &str) -> String {
    let clause = clause.trim();

    let (default, rest) = if clause.starts_with('{') || clause.starts_with('*') {
        (None, Some(clause.to_string()))
    } else {
        match clause.split_once(',') {
            Some((d, r)) => (Some(d.trim().to_string()), Some(r.trim().to_string())),
            None => (Some(clause.to_string()), None),
        }
    };

    let mut parts = Vec::new();
    if let Some(d) = default {
        parts.push(format!("const {d} = {req}.default;"));
    }
    if let Some(rest) = rest {
        if let Some(ns) = rest.strip_prefix('*') {
            let ns = ns.trim();
            let ns = ns.strip_prefix("as").map(str::trim).unwrap_or(ns);
            parts.push(format!("const {ns} = {req};"));
        } else {
            let inner = rest.trim_start_matches('{').trim_end_matches('}');
            let bindings: Vec<String> = named_pairs(inner)
                .into_iter()
                .map(|(from, to)| if from == to { from } else { format!("{from}: {to}") })
                .collect();
            parts.push(format!("const {{ {} }} = {req};", bindings.join(", ")));
        }
    }
    parts.join(" ")
}
