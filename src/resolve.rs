//! Import specifier resolution.
//!
//! Maps an import specifier (as written in source) to a canonical module id
//! by trying the literal path first, then each configured extension in
//! priority order. A query selector (`./style.css?raw`) is carried on the
//! resolved id, not matched against the filesystem.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error during specifier resolution
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResolveError {
    /// Entry file does not exist
    #[error("entry file not found: {0}")]
    EntryNotFound(PathBuf),
    /// Import specifier exhausted all candidates
    #[error("cannot resolve '{specifier}' imported from {importer}")]
    ModuleNotFound { specifier: String, importer: String },
}

/// Split a specifier or module id into path part and optional query selector.
///
/// The query is everything after the first `?`, without the `?` itself.
pub fn split_query(spec: &str) -> (&str, Option<&str>) {
    match spec.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (spec, None),
    }
}

/// Resolves import specifiers against the filesystem.
#[derive(Debug, Clone)]
pub struct Resolver {
    /// Extensions tried in priority order when the literal path misses
    extensions: Vec<String>,
}

impl Resolver {
    /// Create a resolver with the given extension priority list.
    pub fn new(extensions: Vec<String>) -> Self {
        Self { extensions }
    }

    /// Resolve the entry point to a canonical module id.
    pub fn resolve_entry(&self, path: &Path) -> Result<String, ResolveError> {
        if !path.is_file() {
            return Err(ResolveError::EntryNotFound(path.to_path_buf()));
        }
        Ok(canonical_id(path, None))
    }

    /// Resolve a specifier imported from `importer_dir`.
    ///
    /// Candidates are tried in order: the literal path, then the literal path
    /// with each priority extension appended. Bare specifiers (no `./`, `../`
    /// or absolute prefix) are not resolved against any package tree and fail
    /// immediately.
    ///
    /// # Returns
    /// The canonical module id (canonical path plus any query selector).
    pub fn resolve(
        &self,
        specifier: &str,
        importer_dir: &Path,
        importer: &str,
    ) -> Result<String, ResolveError> {
        let (spec_path, query) = split_query(specifier);

        let not_found = || ResolveError::ModuleNotFound {
            specifier: specifier.to_string(),
            importer: importer.to_string(),
        };

        let is_relative = spec_path.starts_with("./") || spec_path.starts_with("../");
        let base = if Path::new(spec_path).is_absolute() {
            PathBuf::from(spec_path)
        } else if is_relative {
            importer_dir.join(spec_path)
        } else {
            // Bare specifier - ecosystem resolution is out of scope
            return Err(not_found());
        };

        for candidate in self.candidates(&base) {
            if candidate.is_file() {
                return Ok(canonical_id(&candidate, query));
            }
        }

        Err(not_found())
    }

    /// The candidate paths for a resolved base, in the order they are tried.
    fn candidates(&self, base: &Path) -> Vec<PathBuf> {
        let mut candidates = vec![base.to_path_buf()];
        for ext in &self.extensions {
            let mut with_ext = base.as_os_str().to_os_string();
            with_ext.push(ext);
            candidates.push(PathBuf::from(with_ext));
        }
        candidates
    }
}

/// Canonicalize a path that is known to exist and attach the query selector.
fn canonical_id(path: &Path, query: Option<&str>) -> String {
    let canon = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let mut id = canon.to_string_lossy().into_owned();
    if let Some(q) = query {
        id.push('?');
        id.push_str(q);
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(b"// test\n").unwrap();
        path
    }

    fn resolver() -> Resolver {
        Resolver::new(vec![".js".to_string(), ".css".to_string()])
    }

    #[test]
    fn split_query_separates_selector() {
        assert_eq!(split_query("./a.css?raw"), ("./a.css", Some("raw")));
        assert_eq!(split_query("./a.css"), ("./a.css", None));
    }

    #[test]
    fn literal_path_wins_over_extension() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "util");
        touch(temp.path(), "util.js");

        let id = resolver().resolve("./util", temp.path(), "main.js").unwrap();
        assert!(id.ends_with("util"), "expected literal match, got {id}");
    }

    #[test]
    fn extension_priority_order_is_respected() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "style.js");
        touch(temp.path(), "style.css");

        let id = resolver().resolve("./style", temp.path(), "main.js").unwrap();
        assert!(id.ends_with("style.js"), "expected .js before .css, got {id}");
    }

    #[test]
    fn query_selector_is_kept_on_the_id() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "style.css");

        let id = resolver().resolve("./style.css?raw", temp.path(), "main.js").unwrap();
        assert!(id.ends_with("style.css?raw"));
    }

    #[test]
    fn unresolved_specifier_names_importer() {
        let temp = TempDir::new().unwrap();
        let err = resolver().resolve("./missing", temp.path(), "src/main.js").unwrap_err();
        match err {
            ResolveError::ModuleNotFound { specifier, importer } => {
                assert_eq!(specifier, "./missing");
                assert_eq!(importer, "src/main.js");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bare_specifier_is_not_resolved() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "lodash.js");
        let err = resolver().resolve("lodash", temp.path(), "main.js");
        assert!(err.is_err());
    }

    #[test]
    fn missing_entry_is_reported() {
        let temp = TempDir::new().unwrap();
        let err = resolver().resolve_entry(&temp.path().join("index.js")).unwrap_err();
        assert!(matches!(err, ResolveError::EntryNotFound(_)));
    }
}
