//! Self-Rebuild Bootstrap — detects that the driver binary's own source is
//! newer than itself, recompiles, and replaces the running image.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::info;

use crate::error::{ForgeError, Result};

/// The marker argument inserted into argv when the bootstrap re-execs
/// after a rebuild, so the new image can tell a self-triggered restart
/// apart from a user-initiated run.
pub const MARKER_ARG: &str = "nob_rebuild";

fn mtime(path: &Path) -> Result<std::time::SystemTime> {
    Ok(std::fs::metadata(path)?.modified()?)
}

/// Run as the first action in the driver's `main`. If the binary is
/// stale relative to `src` or any of `extra_deps`, recompiles it and
/// replaces the current process image with the marker argument
/// `nob_rebuild` inserted after the program name. Returns normally
/// (without replacing the process) when no rebuild was needed.
pub fn ensure_fresh(src: &Path, bin: &Path, extra_deps: &[PathBuf], argv: &[String]) -> Result<()> {
    let mut needs_recompile = !bin.exists() || mtime(src)? > mtime(bin)?;
    for dep in extra_deps {
        needs_recompile |= !dep.exists() || mtime(dep)? > mtime(bin)?;
    }

    if !needs_recompile {
        info!("{}: nothing todo", bin.display());
        return Ok(());
    }

    let tmp_bin = bin.with_extension("new");
    let status = Command::new("c++")
        .args([
            "-std=c++20",
            "-Wall",
            "-Wextra",
            "-Wpedantic",
            "-O3",
            "-o",
        ])
        .arg(&tmp_bin)
        .arg(src)
        .status()?;

    if !status.success() {
        return Err(ForgeError::SelfRebuildCompile(status.code().unwrap_or(-1)));
    }
    std::fs::rename(&tmp_bin, bin)?;

    exec_with_marker(bin, argv)
}

#[cfg(unix)]
fn exec_with_marker(bin: &Path, argv: &[String]) -> Result<()> {
    use std::os::unix::process::CommandExt;

    let mut new_argv = Vec::with_capacity(argv.len() + 1);
    new_argv.push(argv.first().cloned().unwrap_or_else(|| bin.to_string_lossy().into_owned()));
    new_argv.push(MARKER_ARG.to_string());
    new_argv.extend(argv.iter().skip(1).cloned());

    let err = Command::new(bin).args(&new_argv[1..]).exec();
    Err(ForgeError::SelfRebuildExec(err))
}

#[cfg(not(unix))]
fn exec_with_marker(bin: &Path, argv: &[String]) -> Result<()> {
    let status = Command::new(bin).arg(MARKER_ARG).args(&argv[1..]).status()?;
    std::process::exit(status.code().unwrap_or(1));
}
