//! Import and export scanning over transformed JavaScript text.
//!
//! The scanner is regex-driven and intentionally coarse: it recognizes the
//! static import forms, `export ... from`, dynamic `import()`, and
//! `require()` calls, and records static export names for emit-time
//! re-exporting. The emitter's rewriter shares these patterns so every
//! statement the scanner records is also the statement it rewrites.

use std::sync::OnceLock;

use regex::Regex;

/// Compiled statement patterns shared by the scanner and the rewriter.
pub(crate) struct Patterns {
    /// `import <clause> from '<spec>'`
    pub static_import: Regex,
    /// `import '<spec>'`
    pub side_effect: Regex,
    /// `export { ... } from '<spec>'` or `export * from '<spec>'`
    pub export_from: Regex,
    /// `export { ... }` with no source
    pub export_named: Regex,
    /// `export default`
    pub export_default: Regex,
    /// `export <decl-keyword> <name>`
    pub export_decl: Regex,
    /// `import('<spec>')`
    pub dynamic_import: Regex,
    /// `require('<spec>')`
    pub require_call: Regex,
}

pub(crate) fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        // The binding clause may span lines (multi-line named imports);
        // quotes and semicolons bound it so statements never merge.
        static_import: Regex::new(
            r#"(?m)^[ \t]*import[ \t]+([^'";]+?)[ \t]*from[ \t]*['"]([^'"]+)['"][ \t]*;?"#,
        )
        .unwrap(),
        side_effect: Regex::new(r#"(?m)^[ \t]*import[ \t]*['"]([^'"]+)['"][ \t]*;?"#).unwrap(),
        export_from: Regex::new(
            r#"(?m)^[ \t]*export[ \t]+(\{[^}]*\}|\*)[ \t]+from[ \t]+['"]([^'"]+)['"][ \t]*;?"#,
        )
        .unwrap(),
        export_named: Regex::new(r"(?m)^[ \t]*export[ \t]*\{([^}]*)\}[ \t]*;?[ \t]*$").unwrap(),
        export_default: Regex::new(r"(?m)^([ \t]*)export[ \t]+default\b").unwrap(),
        export_decl: Regex::new(
            r"(?m)^([ \t]*)export[ \t]+(async[ \t]+function\*?|function\*?|class|const|let|var)[ \t]+([A-Za-z_$][A-Za-z0-9_$]*)",
        )
        .unwrap(),
        dynamic_import: Regex::new(r#"import[ \t]*\([ \t]*['"]([^'"]+)['"][ \t]*\)"#).unwrap(),
        require_call: Regex::new(r#"\brequire[ \t]*\([ \t]*['"]([^'"]+)['"][ \t]*\)"#).unwrap(),
    })
}

/// Result of scanning one module's JavaScript text.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ScanResult {
    /// Import specifiers in order of first appearance, deduplicated
    pub imports: Vec<String>,
    /// Statically exported names (`default` included), deduplicated
    pub exports: Vec<String>,
    /// Specifiers of `export * from` statements, deduplicated
    pub star_exports: Vec<String>,
}

/// Scan JavaScript text for import specifiers and static export names.
///
/// Comments are blanked out first so a commented-out statement is never
/// recorded as a dependency.
pub fn scan_module(code: &str) -> ScanResult {
    let code = &strip_comments(code);
    let p = patterns();

    // Gather (position, specifier) across all import forms, then order by
    // position so the dependency list follows source order.
    let mut found: Vec<(usize, String)> = Vec::new();
    for caps in p.static_import.captures_iter(code) {
        let m = caps.get(0).unwrap();
        found.push((m.start(), caps[2].to_string()));
    }
    for caps in p.side_effect.captures_iter(code) {
        let m = caps.get(0).unwrap();
        found.push((m.start(), caps[1].to_string()));
    }
    for caps in p.export_from.captures_iter(code) {
        let m = caps.get(0).unwrap();
        found.push((m.start(), caps[2].to_string()));
    }
    for caps in p.dynamic_import.captures_iter(code) {
        let m = caps.get(0).unwrap();
        found.push((m.start(), caps[1].to_string()));
    }
    for caps in p.require_call.captures_iter(code) {
        let m = caps.get(0).unwrap();
        found.push((m.start(), caps[1].to_string()));
    }
    found.sort_by_key(|(pos, _)| *pos);

    let mut imports = Vec::new();
    for (_, spec) in found {
        if !imports.contains(&spec) {
            imports.push(spec);
        }
    }

    let mut exports = Vec::new();
    let mut record = |name: String| {
        if !exports.contains(&name) {
            exports.push(name);
        }
    };

    if p.export_default.is_match(code) {
        record("default".to_string());
    }
    for caps in p.export_decl.captures_iter(code) {
        record(caps[3].to_string());
    }
    for caps in p.export_named.captures_iter(code) {
        for (_, alias) in named_pairs(&caps[1]) {
            record(alias);
        }
    }
    let mut star_exports = Vec::new();
    for caps in p.export_from.captures_iter(code) {
        if &caps[1] == "*" {
            let spec = caps[2].to_string();
            if !star_exports.contains(&spec) {
                star_exports.push(spec);
            }
        } else {
            let inner = caps[1].trim_start_matches('{').trim_end_matches('}');
            for (_, alias) in named_pairs(inner) {
                record(alias);
            }
        }
    }

    ScanResult { imports, exports, star_exports }
}

/// Blank out line and block comments, keeping every newline and the text of
/// string and template literals, so statement positions are unchanged.
pub(crate) fn strip_comments(code: &str) -> String {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Code,
        Single,
        Double,
        Template,
        Line,
        Block,
    }

    let mut out = String::with_capacity(code.len());
    let mut state = State::Code;
    let mut chars = code.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Code => match c {
                '\'' => {
                    state = State::Single;
                    out.push(c);
                }
                '"' => {
                    state = State::Double;
                    out.push(c);
                }
                '`' => {
                    state = State::Template;
                    out.push(c);
                }
                '/' => match chars.peek() {
                    Some('/') => {
                        chars.next();
                        state = State::Line;
                        out.push_str("  ");
                    }
                    Some('*') => {
                        chars.next();
                        state = State::Block;
                        out.push_str("  ");
                    }
                    _ => out.push(c),
                },
                _ => out.push(c),
            },
            State::Single | State::Double | State::Template => {
                out.push(c);
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                } else if (state == State::Single && c == '\'')
                    || (state == State::Double && c == '"')
                    || (state == State::Template && c == '`')
                {
                    state = State::Code;
                }
            }
            State::Line => {
                if c == '\n' {
                    out.push('\n');
                    state = State::Code;
                } else {
                    out.push(' ');
                }
            }
            State::Block => {
                if c == '\n' {
                    out.push('\n');
                } else if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("  ");
                    state = State::Code;
                } else {
                    out.push(' ');
                }
            }
        }
    }
    out
}

/// Parse a `{ a, b as c }` list body into (source name, exported alias) pairs.
pub(crate) fn named_pairs(list: &str) -> Vec<(String, String)> {
    list.split(',')
        .filter_map(|item| {
            let item = item.trim();
            if item.is_empty() {
                return None;
            }
            match item.split_once(" as ") {
                Some((from, to)) => Some((from.trim().to_string(), to.trim().to_string())),
                None => Some((item.to_string(), item.to_string())),
            }
        })
        .collect()
}
