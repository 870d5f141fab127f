//! knapsack - Library for bundling JavaScript module graphs
//!
//! This library provides functionality to:
//! - Build a module dependency graph from an entry point
//! - Run configurable transform chains over matched files
//! - Inject runtime polyfills for modules that need them
//! - Emit a single bundle (ESM, CJS, or UMD) with a source map

pub mod build;
pub mod cli;
pub mod config;
pub mod emit;
pub mod graph;
pub mod loader;
pub mod polyfill;
pub mod resolve;
pub mod transform;
