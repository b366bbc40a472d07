use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::Result;
use crate::plan::Plan;

#[derive(Serialize)]
struct Entry {
    directory: String,
    command: String,
    file: String,
}

/// Write `./compile_commands.json`, overwriting it each run, containing
/// exactly the compile-kind nodes of `plan`.
pub fn write_compile_db(plan: &Plan) -> Result<()> {
    write_compile_db_to(plan, Path::new("./compile_commands.json"))
}

pub fn write_compile_db_to(plan: &Plan, path: &Path) -> Result<()> {
    let entries: Vec<Entry> = plan
        .nodes()
        .iter()
        .filter(|n| n.is_compile)
        .map(|n| {
            let source = n.args.last().map(String::as_str).unwrap_or("");
            Entry {
                directory: ".".to_string(),
                command: n.command_line(),
                file: absolute_path(source),
            }
        })
        .collect();

    let json = serde_json::to_string_pretty(&entries)?;
    std::fs::write(path, json)?;
    Ok(())
}

fn absolute_path(file: &str) -> String {
    let path = Path::new(file);
    if path.is_absolute() {
        return path.to_string_lossy().into_owned();
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join(path))
        .to_string_lossy()
        .into_owned()
}
