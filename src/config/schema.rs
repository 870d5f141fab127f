//! Configuration schema types for `knap.toml`
//!
//! Defines the structure and defaults for knapsack project configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Output module format (`output.format`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModuleFormat {
    /// ES module output
    #[default]
    Esm,
    /// CommonJS output
    Cjs,
    /// Universal module definition
    Umd,
}

impl fmt::Display for ModuleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleFormat::Esm => write!(f, "esm"),
            ModuleFormat::Cjs => write!(f, "cjs"),
            ModuleFormat::Umd => write!(f, "umd"),
        }
    }
}

impl FromStr for ModuleFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "esm" => Ok(ModuleFormat::Esm),
            "cjs" => Ok(ModuleFormat::Cjs),
            "umd" => Ok(ModuleFormat::Umd),
            other => Err(format!("unknown module format '{other}' (expected esm, cjs, or umd)")),
        }
    }
}

/// Project metadata section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name (required); used as the UMD global name
    pub name: String,
    /// Project version
    #[serde(default = "default_version")]
    pub version: String,
    /// Entry point the graph traversal starts from
    #[serde(default = "default_entry")]
    pub entry: PathBuf,
    /// Build output directory (cleared and recreated on each build)
    #[serde(default = "default_out")]
    pub out: PathBuf,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_entry() -> PathBuf {
    PathBuf::from("src/index.js")
}

fn default_out() -> PathBuf {
    PathBuf::from("dist")
}

/// Output artifact settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Artifact filename inside the output directory
    #[serde(default = "default_filename")]
    pub filename: String,
    /// Output module format
    #[serde(default)]
    pub format: ModuleFormat,
    /// Write a combined source map next to the artifact
    #[serde(default = "default_true")]
    pub source_map: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { filename: default_filename(), format: ModuleFormat::default(), source_map: true }
    }
}

fn default_filename() -> String {
    "bundle.js".to_string()
}

fn default_true() -> bool {
    true
}

/// Specifier resolution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveConfig {
    /// Extensions tried, in priority order, when the literal path misses
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self { extensions: default_extensions() }
    }
}

fn default_extensions() -> Vec<String> {
    vec![".js".to_string(), ".json".to_string(), ".css".to_string()]
}

/// One loader rule (`[[rules]]`), tested in declaration order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Regex tested against the module path (query selector excluded)
    pub test: String,
    /// Ordered transform chain, by built-in transform name
    #[serde(rename = "use")]
    pub transforms: Vec<String>,
    /// Options handed to every stage of the chain
    #[serde(default)]
    pub options: HashMap<String, String>,
}

/// Polyfill injection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolyfillConfig {
    /// Whether the injection pass runs at all
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Capabilities to scan for
    #[serde(default = "default_capabilities")]
    pub capabilities: Vec<String>,
}

impl Default for PolyfillConfig {
    fn default() -> Self {
        Self { enabled: true, capabilities: default_capabilities() }
    }
}

fn default_capabilities() -> Vec<String> {
    vec![
        "process".to_string(),
        "buffer".to_string(),
        "global".to_string(),
        "setImmediate".to_string(),
    ]
}

/// Root configuration loaded from `knap.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnapConfig {
    /// Project metadata and paths
    pub project: ProjectConfig,
    /// Output artifact settings
    #[serde(default)]
    pub output: OutputConfig,
    /// Specifier resolution settings
    #[serde(default)]
    pub resolve: ResolveConfig,
    /// Loader rules, in declaration order
    #[serde(default = "default_rules")]
    pub rules: Vec<RuleConfig>,
    /// Polyfill injection settings
    #[serde(default)]
    pub polyfills: PolyfillConfig,
}

/// Default rule set: stylesheets and JSON documents.
pub(crate) fn default_rules() -> Vec<RuleConfig> {
    vec![
        RuleConfig {
            test: r"\.css$".to_string(),
            transforms: vec!["css".to_string()],
            options: HashMap::new(),
        },
        RuleConfig {
            test: r"\.json$".to_string(),
            transforms: vec!["json".to_string()],
            options: HashMap::new(),
        },
    ]
}
