//! Graph command implementation

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use super::build::load_project;
use super::{EXIT_ERROR, EXIT_SUCCESS};
use crate::build::{BuildContext, BuildPipeline};

/// Run the graph command: resolve the module graph and print it.
pub fn run_graph(config_path: Option<&Path>, entry: Option<PathBuf>) -> ExitCode {
    let (mut config, project_root) = match load_project(config_path, false) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            return ExitCode::from(EXIT_ERROR);
        }
    };
    if let Some(entry) = entry {
        config.project.entry = entry;
    }

    let context = BuildContext::new(config, project_root);
    let pipeline = BuildPipeline::new(context);

    match pipeline.build_graph() {
        Ok(graph) => {
            println!("{} modules:", graph.len());
            for module in graph.modules() {
                let marker = if module.id == graph.entry_id() { " (entry)" } else { "" };
                println!("{}{marker}", module.name);
                for dep in &module.dependencies {
                    let dep_name =
                        graph.get(dep).map(|m| m.name.as_str()).unwrap_or(dep.as_str());
                    println!("  -> {dep_name}");
                }
            }
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}
