//! Configuration loading and discovery for `knap.toml`
//!
//! Provides functions to find, load, validate, and merge configuration.

use super::schema::{default_rules, KnapConfig, ModuleFormat, OutputConfig, PolyfillConfig, ProjectConfig, ResolveConfig};
use regex::Regex;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse knap.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override entry point
    pub entry: Option<PathBuf>,
    /// Override output directory
    pub out: Option<PathBuf>,
    /// Override artifact filename
    pub filename: Option<String>,
    /// Override output module format
    pub format: Option<ModuleFormat>,
    /// Disable the source map
    pub no_source_map: bool,
}

/// Find knap.toml by walking up from the current working directory.
///
/// # Returns
/// - `Some(path)` if a knap.toml file is found
/// - `None` if no config file is found
pub fn find_config() -> Option<PathBuf> {
    let mut dir = env::current_dir().ok()?;
    loop {
        let candidate = dir.join("knap.toml");
        if candidate.is_file() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// Load configuration from a file, or fall back to defaults.
///
/// With `Some(path)` the file is read, parsed, and validated. With `None`,
/// config discovery runs; when nothing is found the defaults apply.
pub fn load_config(path: Option<&Path>) -> Result<KnapConfig, ConfigError> {
    let path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    let config = match path {
        Some(path) => {
            let text = fs::read_to_string(&path)?;
            toml::from_str(&text)?
        }
        None => default_config(),
    };

    validate_config(&config)?;
    Ok(config)
}

/// Default configuration used when no knap.toml exists.
pub fn default_config() -> KnapConfig {
    KnapConfig {
        project: ProjectConfig {
            name: "app".to_string(),
            version: "0.1.0".to_string(),
            entry: PathBuf::from("src/index.js"),
            out: PathBuf::from("dist"),
        },
        output: OutputConfig::default(),
        resolve: ResolveConfig::default(),
        rules: default_rules(),
        polyfills: PolyfillConfig::default(),
    }
}

/// Validate a loaded configuration, collecting every problem found.
pub fn validate_config(config: &KnapConfig) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.project.name.trim().is_empty() {
        errors.push("project.name must not be empty".to_string());
    }
    if config.output.filename.trim().is_empty() {
        errors.push("output.filename must not be empty".to_string());
    } else if config.output.filename.contains('/') || config.output.filename.contains('\\') {
        errors.push(format!(
            "output.filename '{}' must not contain path separators",
            config.output.filename
        ));
    }

    for ext in &config.resolve.extensions {
        if !ext.starts_with('.') {
            errors.push(format!("resolve.extensions entry '{ext}' must start with '.'"));
        }
    }

    for rule in &config.rules {
        if let Err(e) = Regex::new(&rule.test) {
            errors.push(format!("invalid rule pattern '{}': {}", rule.test, e));
        }
        if rule.transforms.is_empty() {
            errors.push(format!("rule '{}' has an empty transform chain", rule.test));
        }
        for name in &rule.transforms {
            if !crate::transform::builtin_transform_names().contains(&name.as_str()) {
                errors.push(format!(
                    "rule '{}' references unknown transform '{}'",
                    rule.test, name
                ));
            }
        }
    }

    let known = crate::polyfill::capability_names();
    for cap in &config.polyfills.capabilities {
        if !known.contains(&cap.as_str()) {
            errors.push(format!(
                "unknown polyfill capability '{}' (supported: {})",
                cap,
                known.join(", ")
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation(errors))
    }
}

/// Apply CLI overrides on top of a loaded configuration.
pub fn merge_cli_overrides(config: &mut KnapConfig, overrides: &CliOverrides) {
    if let Some(entry) = &overrides.entry {
        config.project.entry = entry.clone();
    }
    if let Some(out) = &overrides.out {
        config.project.out = out.clone();
    }
    if let Some(filename) = &overrides.filename {
        config.output.filename = filename.clone();
    }
    if let Some(format) = overrides.format {
        config.output.format = format;
    }
    if overrides.no_source_map {
        config.output.source_map = false;
    }
}
