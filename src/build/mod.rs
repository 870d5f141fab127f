//! Build orchestration.
//!
//! Ties the pipeline together: loader registry and resolver from config,
//! module graph construction, polyfill injection, and artifact emission.

mod context;
mod pipeline;
mod result;

pub use context::BuildContext;
pub use pipeline::{BuildError, BuildPipeline};
pub use result::{BuildResult, BuildWarning};
