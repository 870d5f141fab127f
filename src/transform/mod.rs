//! Source transforms and the chain executor.
//!
//! A transform converts source text in one dialect into JavaScript text
//! (or another intermediate form) plus optional source-map data. Transforms
//! are chained: each stage receives the output of the previous one, and the
//! first stage receives the raw file contents. Built-in transforms cover
//! stylesheets, raw assets, and JSON; compiled-dialect compilers plug in
//! through the [`Transform`] trait.

mod builtin;

pub use builtin::{builtin_transform, builtin_transform_names, CssTransform, JsonTransform, RawTransform};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Error raised when a transform stage rejects its input.
///
/// Transform failures are fatal: the build aborts and surfaces the offending
/// file path together with the failing transform's name.
#[derive(Debug, Clone, Error)]
#[error("transform '{transform}' failed for {}: {message}", .path.display())]
pub struct TransformError {
    /// Name of the failing transform
    pub transform: String,
    /// File the transform was applied to
    pub path: PathBuf,
    /// Underlying error detail
    pub message: String,
}

impl TransformError {
    /// Create a transform error for the given stage and file.
    pub fn new(transform: &str, path: &Path, message: impl Into<String>) -> Self {
        Self {
            transform: transform.to_string(),
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

/// Input to a single transform stage.
#[derive(Debug)]
pub struct TransformInput<'a> {
    /// File the source came from
    pub path: &'a Path,
    /// Query selector carried on the resolved id (`style.css?raw` -> `raw`)
    pub query: Option<&'a str>,
    /// Output of the previous stage (raw file contents for the first stage)
    pub source: &'a str,
    /// Original raw file contents, for stages that branch to a raw-asset path
    pub raw: &'a str,
    /// Per-rule transform options
    pub options: &'a HashMap<String, String>,
}

/// Output of a transform stage.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    /// JavaScript (or intermediate) text
    pub code: String,
    /// Serialized v3 source map, when the stage produces one
    pub source_map: Option<String>,
}

impl TransformOutput {
    /// Output with code only, no source map.
    pub fn code(code: String) -> Self {
        Self { code, source_map: None }
    }
}

/// A source transform stage.
pub trait Transform: Send + Sync {
    /// Stable name used in error reporting and configuration.
    fn name(&self) -> &str;

    /// Apply the transform to one module's source.
    fn apply(&self, input: &TransformInput) -> Result<TransformOutput, TransformError>;
}

/// Apply a transform chain in order over the raw source of one file.
///
/// The last source map produced by any stage wins; stages that pass no map
/// through leave the previous one in place.
pub fn apply_chain(
    chain: &[Arc<dyn Transform>],
    path: &Path,
    query: Option<&str>,
    raw: &str,
    options: &HashMap<String, String>,
) -> Result<TransformOutput, TransformError> {
    let mut code = raw.to_string();
    let mut source_map = None;

    for stage in chain {
        let input = TransformInput { path, query, source: &code, raw, options };
        let output = stage.apply(&input)?;
        code = output.code;
        source_map = output.source_map.or(source_map);
    }

    Ok(TransformOutput { code, source_map })
}

/// Render text as a JavaScript string literal.
pub(crate) fn js_string(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}
