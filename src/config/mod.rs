//! Configuration module for the knapsack build pipeline
//!
//! Provides types and parsing for `knap.toml` project configuration.

pub mod loader;
pub mod schema;

pub use loader::{default_config, find_config, load_config, merge_cli_overrides, CliOverrides, ConfigError};
pub use schema::*;
