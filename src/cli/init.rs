//! Init command implementation (project scaffolding)

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use super::{EXIT_ERROR, EXIT_SUCCESS};

const STARTER_ENTRY: &str = "\
import './style.css';

export function greet(name) {
  return `Hello, ${name}!`;
}

export default greet;
";

const STARTER_STYLE: &str = "\
:host {
  display: block;
}
";

/// Run the init command: scaffold knap.toml and a starter entry point.
pub fn run_init(dir: Option<PathBuf>, name: Option<String>) -> ExitCode {
    let dir = dir.unwrap_or_else(|| PathBuf::from("."));
    let name = name.unwrap_or_else(|| {
        dir.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .or_else(|| {
                dir.canonicalize()
                    .ok()
                    .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            })
            .unwrap_or_else(|| "app".to_string())
    });

    let config_path = dir.join("knap.toml");
    if config_path.exists() {
        eprintln!("Error: {} already exists", config_path.display());
        return ExitCode::from(EXIT_ERROR);
    }

    let config = format!(
        "[project]\n\
         name = \"{name}\"\n\
         entry = \"src/index.js\"\n\
         out = \"dist\"\n\
         \n\
         [output]\n\
         filename = \"{name}.js\"\n\
         format = \"esm\"\n\
         \n\
         [[rules]]\n\
         test = \"\\\\.css$\"\n\
         use = [\"css\"]\n\
         \n\
         [[rules]]\n\
         test = \"\\\\.json$\"\n\
         use = [\"json\"]\n"
    );

    let write = |path: PathBuf, content: &str| -> Result<PathBuf, String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| format!("{}: {e}", parent.display()))?;
        }
        if path.exists() {
            return Err(format!("{} already exists", path.display()));
        }
        fs::write(&path, content).map_err(|e| format!("{}: {e}", path.display()))?;
        Ok(path)
    };

    let files = [
        (config_path, config.as_str()),
        (dir.join("src/index.js"), STARTER_ENTRY),
        (dir.join("src/style.css"), STARTER_STYLE),
    ];

    for (path, content) in files {
        match write(path, content) {
            Ok(path) => println!("Created {}", path.display()),
            Err(e) => {
                eprintln!("Error: {e}");
                return ExitCode::from(EXIT_ERROR);
            }
        }
    }

    println!("\nProject '{name}' initialized. Run `knap build` to bundle.");
    ExitCode::from(EXIT_SUCCESS)
}
