//! Bundle Pipeline Test Suite
//!
//! End-to-end integration tests for the full bundling pipeline.
//! Tests cover:
//!
//! - Graph build + transform + emit over a realistic project tree
//! - Polyfill injection in the emitted bundle
//! - Cycle tolerance and the emit-time cycle warning
//! - Fatal resolution errors leaving previous output intact
//! - Deterministic output across repeated builds
//! - Output formats (ESM, CJS, UMD) and source map artifacts

use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;

use knapsack::build::{BuildContext, BuildPipeline};
use knapsack::config::{default_config, KnapConfig, ModuleFormat};

// ============================================================================
// Test Utilities
// ============================================================================

/// Create a test file with content, creating parent directories as needed.
fn create_test_file(dir: &std::path::Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut file = File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

/// Create a build context rooted at a fresh temp dir, with files written.
fn create_test_project(files: &[(&str, &str)]) -> (TempDir, BuildContext) {
    create_test_project_with(default_config(), files)
}

fn create_test_project_with(
    config: KnapConfig,
    files: &[(&str, &str)],
) -> (TempDir, BuildContext) {
    let temp = TempDir::new().unwrap();
    for (name, content) in files {
        create_test_file(temp.path(), name, content);
    }
    let ctx = BuildContext::new(config, temp.path().to_path_buf()).with_jobs(1);
    (temp, ctx)
}

fn read_bundle(temp: &TempDir) -> String {
    fs::read_to_string(temp.path().join("dist/bundle.js")).unwrap()
}

// ============================================================================
// End-to-End Pipeline Tests
// ============================================================================

#[test]
fn test_bundle_with_css_and_json_imports() {
    let (temp, ctx) = create_test_project(&[
        (
            "src/index.js",
            "import './style.css';\nimport settings from './settings.json';\nimport { greet } from './util.js';\nexport default greet(settings.name);\n",
        ),
        ("src/style.css", ".card{color:red}\n"),
        ("src/settings.json", "{\"name\": \"widget\"}\n"),
        ("src/util.js", "export function greet(name) { return name; }\n"),
    ]);

    let result = BuildPipeline::new(ctx).build().unwrap();
    assert_eq!(result.module_count, 4);
    assert!(result.warnings.is_empty());

    let bundle = read_bundle(&temp);
    // Every source module is registered under its project-relative name
    assert!(bundle.contains("__knap_define(\"src/index.js\""));
    assert!(bundle.contains("__knap_define(\"src/style.css\""));
    assert!(bundle.contains("__knap_define(\"src/settings.json\""));
    assert!(bundle.contains("__knap_define(\"src/util.js\""));
    // JSON is re-exported as a default export of the parsed document
    assert!(bundle.contains("\"widget\""));
    // ESM footer re-exports the entry's default
    assert!(bundle.contains("export default __knap_entry.default;"));
}

#[test]
fn test_source_map_artifact_written_alongside_bundle() {
    let (temp, ctx) = create_test_project(&[
        ("src/index.js", "import { x } from './util.js';\nexport default x;\n"),
        ("src/util.js", "export const x = 1;\n"),
    ]);

    BuildPipeline::new(ctx).build().unwrap();

    let map = fs::read_to_string(temp.path().join("dist/bundle.js.map")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&map).unwrap();
    assert_eq!(json["version"], 3);
    assert!(json["sections"].is_array());

    let bundle = read_bundle(&temp);
    assert!(bundle.contains("//# sourceMappingURL=bundle.js.map"));
}

#[test]
fn test_source_map_disabled_emits_bundle_only() {
    let mut config = default_config();
    config.output.source_map = false;
    let (temp, ctx) =
        create_test_project_with(config, &[("src/index.js", "export const a = 1;\n")]);

    BuildPipeline::new(ctx).build().unwrap();
    assert!(temp.path().join("dist/bundle.js").is_file());
    assert!(!temp.path().join("dist/bundle.js.map").exists());
    assert!(!read_bundle(&temp).contains("sourceMappingURL"));
}

#[test]
fn test_raw_query_bundles_untransformed_stylesheet() {
    let (temp, ctx) = create_test_project(&[
        (
            "src/index.js",
            "import css from './style.css?raw';\nexport default css;\n",
        ),
        ("src/style.css", ".card { color: red; }\n"),
    ]);

    BuildPipeline::new(ctx).build().unwrap();
    let bundle = read_bundle(&temp);
    // The raw selector exports the file text verbatim, not compiled CSS
    assert!(bundle.contains("__knap_define(\"src/style.css?raw\""));
    assert!(bundle.contains(".card { color: red; }"));
}

#[test]
fn test_multi_line_named_import_is_bundled() {
    let (temp, ctx) = create_test_project(&[
        (
            "src/index.js",
            "import {\n  greet,\n  farewell\n} from './util.js';\nexport default greet;\n",
        ),
        (
            "src/util.js",
            "export function greet(n) { return n; }\nexport function farewell(n) { return n; }\n",
        ),
    ]);

    let result = BuildPipeline::new(ctx).build().unwrap();
    assert_eq!(result.module_count, 2);

    let bundle = read_bundle(&temp);
    assert!(bundle.contains("__knap_define(\"src/util.js\""));
    assert!(bundle.contains("const { greet, farewell } = __knap_require(\"src/util.js\");"));
    // No raw import statement survives inside a factory
    assert!(!bundle.contains("import {"), "got: {bundle}");
}

#[test]
fn test_star_reexport_entry_exposes_dependency_names() {
    let (temp, ctx) = create_test_project(&[
        ("src/index.js", "export * from './util.js';\n"),
        (
            "src/util.js",
            "export function greet(n) { return n; }\nexport const version = '1.0';\n",
        ),
    ]);

    let result = BuildPipeline::new(ctx).build().unwrap();
    assert_eq!(result.module_count, 2);

    let bundle = read_bundle(&temp);
    assert!(bundle.contains("Object.assign(exports, __knap_require(\"src/util.js\"));"));
    // The ESM footer re-exports the flattened names
    assert!(bundle.contains("export var greet = __knap_entry.greet;"), "got: {bundle}");
    assert!(bundle.contains("export var version = __knap_entry.version;"));
}

#[test]
fn test_commented_out_import_is_not_a_dependency() {
    let (temp, ctx) = create_test_project(&[(
        "src/index.js",
        "// const legacy = require('./missing');\n/* import('./also-missing') */\nexport const a = 1;\n",
    )]);

    let result = BuildPipeline::new(ctx).build().unwrap();
    assert_eq!(result.module_count, 1);
    assert!(temp.path().join("dist/bundle.js").is_file());
}

// ============================================================================
// Polyfill Injection Tests
// ============================================================================

#[test]
fn test_polyfill_shim_emitted_for_process_reference() {
    let (temp, ctx) = create_test_project(&[(
        "src/index.js",
        "export const mode = process.env.NODE_ENV;\n",
    )]);

    let result = BuildPipeline::new(ctx).build().unwrap();
    // Entry plus the injected process shim
    assert_eq!(result.module_count, 2);
    let bundle = read_bundle(&temp);
    assert!(bundle.contains("globalThis.process"));
}

#[test]
fn test_no_polyfill_without_reference() {
    let (temp, ctx) = create_test_project(&[("src/index.js", "export const a = 1;\n")]);
    let result = BuildPipeline::new(ctx).build().unwrap();
    assert_eq!(result.module_count, 1);
    assert!(!read_bundle(&temp).contains("globalThis.process"));
}

#[test]
fn test_polyfills_can_be_disabled() {
    let mut config = default_config();
    config.polyfills.enabled = false;
    let (temp, ctx) = create_test_project_with(
        config,
        &[("src/index.js", "export const mode = process.env.NODE_ENV;\n")],
    );

    let result = BuildPipeline::new(ctx).build().unwrap();
    assert_eq!(result.module_count, 1);
    assert!(!read_bundle(&temp).contains("globalThis.process"));
}

// ============================================================================
// Cycle Handling
// ============================================================================

#[test]
fn test_import_cycle_builds_with_warning() {
    let (temp, ctx) = create_test_project(&[
        ("src/index.js", "import './a.js';\nexport default 1;\n"),
        ("src/a.js", "import { b } from './b.js';\nexport const a = 1;\n"),
        ("src/b.js", "import { a } from './a.js';\nexport const b = 2;\n"),
    ]);

    let result = BuildPipeline::new(ctx).build().unwrap();
    assert_eq!(result.module_count, 3);
    assert!(result.has_warnings());
    let warning = result.warnings[0].to_string();
    assert!(warning.contains("import cycle broken during emit"), "got: {warning}");
    assert!(warning.contains("src/a.js"), "got: {warning}");
    assert!(warning.contains("src/b.js"), "got: {warning}");

    // The bundle still contains every module exactly once
    let bundle = read_bundle(&temp);
    assert_eq!(bundle.matches("__knap_define(\"src/a.js\"").count(), 1);
    assert_eq!(bundle.matches("__knap_define(\"src/b.js\"").count(), 1);
}

// ============================================================================
// Failure Modes
// ============================================================================

#[test]
fn test_missing_import_names_specifier_and_importer() {
    let (temp, ctx) = create_test_project(&[
        ("src/index.js", "import './present.js';\n"),
        ("src/present.js", "import helper from './missing';\n"),
        ("dist/previous.js", "// earlier build\n"),
    ]);

    let err = BuildPipeline::new(ctx).build().unwrap_err();
    let message = err.to_string();
    assert!(message.contains("./missing"), "got: {message}");
    assert!(message.contains("src/present.js"), "got: {message}");

    // A failed build never disturbs existing output
    assert!(temp.path().join("dist/previous.js").is_file());
    assert!(!temp.path().join("dist/bundle.js").exists());
}

#[test]
fn test_unknown_polyfill_capability_is_a_config_error() {
    let mut config = default_config();
    config.polyfills.capabilities = vec!["teleport".to_string()];
    let (_temp, ctx) =
        create_test_project_with(config, &[("src/index.js", "export const a = 1;\n")]);

    let err = BuildPipeline::new(ctx).build().unwrap_err();
    assert!(err.to_string().contains("teleport"));
}

// ============================================================================
// Determinism and Formats
// ============================================================================

#[test]
fn test_repeated_builds_are_byte_identical() {
    let (temp, ctx) = create_test_project(&[
        (
            "src/index.js",
            "import './a.js';\nimport './b.js';\nexport default 0;\n",
        ),
        ("src/a.js", "import './shared.js';\nexport const a = 1;\n"),
        ("src/b.js", "import './shared.js';\nexport const b = 2;\n"),
        ("src/shared.js", "export const s = 3;\n"),
    ]);

    BuildPipeline::new(ctx.clone()).build().unwrap();
    let first = read_bundle(&temp);
    let first_map = fs::read_to_string(temp.path().join("dist/bundle.js.map")).unwrap();

    BuildPipeline::new(ctx).build().unwrap();
    assert_eq!(read_bundle(&temp), first);
    assert_eq!(
        fs::read_to_string(temp.path().join("dist/bundle.js.map")).unwrap(),
        first_map
    );
}

#[test]
fn test_cjs_format_assigns_module_exports() {
    let mut config = default_config();
    config.output.format = ModuleFormat::Cjs;
    let (temp, ctx) =
        create_test_project_with(config, &[("src/index.js", "export default 42;\n")]);

    BuildPipeline::new(ctx).build().unwrap();
    let bundle = read_bundle(&temp);
    assert!(bundle.contains("module.exports = __knap_require(\"src/index.js\");"));
    assert!(!bundle.contains("export default __knap_entry"));
}

#[test]
fn test_umd_format_wraps_bundle_under_project_name() {
    let mut config = default_config();
    config.output.format = ModuleFormat::Umd;
    config.project.name = "widgets".to_string();
    let (temp, ctx) =
        create_test_project_with(config, &[("src/index.js", "export default 42;\n")]);

    BuildPipeline::new(ctx).build().unwrap();
    let bundle = read_bundle(&temp);
    assert!(bundle.contains("widgets"));
    assert!(bundle.contains("return __knap_require(\"src/index.js\");"));
}
