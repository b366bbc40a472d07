use std::io::Read;
use std::process::{Command, Stdio};

use crate::error::Result;

/// Compilers whose diagnostics get coloured even when output is piped.
const COLOR_DIAGNOSTIC_COMPILERS: &[&str] = &["gcc", "g++", "c++", "clang", "clang++"];

#[derive(Debug, Clone)]
pub struct RunResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Run `command` with `args`, inheriting only `PATH` from the environment.
pub fn run(command: &str, args: &[String]) -> Result<RunResult> {
    let mut cmd = Command::new(command);
    cmd.args(args);

    if COLOR_DIAGNOSTIC_COMPILERS.contains(&command) {
        cmd.arg("-fdiagnostics-color=always");
    }

    cmd.env_clear();
    if let Ok(path) = std::env::var("PATH") {
        cmd.env("PATH", path);
    }

    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(_) => {
            return Ok(RunResult { stdout: String::new(), stderr: String::new(), exit_code: -1 });
        }
    };

    let mut stdout = String::new();
    let mut stderr = String::new();
    if let Some(mut out) = child.stdout.take() {
        let _ = out.read_to_string(&mut stdout);
    }
    if let Some(mut err) = child.stderr.take() {
        let _ = err.read_to_string(&mut stderr);
    }

    let status = child.wait()?;
    let exit_code = status.code().unwrap_or(-1);

    Ok(RunResult { stdout, stderr, exit_code })
}
