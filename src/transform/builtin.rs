//! Built-in transforms: stylesheets, raw assets, and JSON.

use std::sync::Arc;

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};

use super::{js_string, Transform, TransformError, TransformInput, TransformOutput};

/// Names of the transforms constructible from configuration.
pub fn builtin_transform_names() -> &'static [&'static str] {
    &["css", "raw", "json"]
}

/// Look up a built-in transform by its configured name.
pub fn builtin_transform(name: &str) -> Option<Arc<dyn Transform>> {
    match name {
        "css" => Some(Arc::new(CssTransform)),
        "raw" => Some(Arc::new(RawTransform)),
        "json" => Some(Arc::new(JsonTransform)),
        _ => None,
    }
}

/// Stylesheet transform.
///
/// Parses the sheet with lightningcss (a malformed sheet is a fatal
/// transform error) and emits a JavaScript module default-exporting the
/// stylesheet text. The `minify` option controls output minification.
/// A `raw` query selector skips parsing entirely and default-exports the
/// untouched file contents.
pub struct CssTransform;

impl Transform for CssTransform {
    fn name(&self) -> &str {
        "css"
    }

    fn apply(&self, input: &TransformInput) -> Result<TransformOutput, TransformError> {
        if input.query == Some("raw") {
            return Ok(TransformOutput::code(format!(
                "export default {};",
                js_string(input.raw)
            )));
        }

        let sheet = StyleSheet::parse(input.source, ParserOptions::default())
            .map_err(|e| TransformError::new("css", input.path, e.to_string()))?;

        let minify = input.options.get("minify").map(|v| v == "true").unwrap_or(false);
        let css = sheet
            .to_css(PrinterOptions { minify, ..PrinterOptions::default() })
            .map_err(|e| TransformError::new("css", input.path, e.to_string()))?
            .code;

        Ok(TransformOutput::code(format!("export default {};", js_string(&css))))
    }
}

/// Raw asset transform (`asset/source`).
///
/// With a `raw` query selector the module body is the untransformed file
/// contents; otherwise the previous stage's output is exported as-is.
pub struct RawTransform;

impl Transform for RawTransform {
    fn name(&self) -> &str {
        "raw"
    }

    fn apply(&self, input: &TransformInput) -> Result<TransformOutput, TransformError> {
        let text = if input.query == Some("raw") { input.raw } else { input.source };
        Ok(TransformOutput::code(format!("export default {};", js_string(text))))
    }
}

/// JSON transform: validates the document and default-exports the value.
pub struct JsonTransform;

impl Transform for JsonTransform {
    fn name(&self) -> &str {
        "json"
    }

    fn apply(&self, input: &TransformInput) -> Result<TransformOutput, TransformError> {
        let value: serde_json::Value = serde_json::from_str(input.source)
            .map_err(|e| TransformError::new("json", input.path, e.to_string()))?;
        Ok(TransformOutput::code(format!("export default {};", value)))
    }
}
