use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use forge::cli;
use forge::config::BuildConfig;
use forge::unit::Unit;

/// A small sample build: writes a tiny two-file project under a scratch
/// directory and wires up a static-lib Unit tree for it, then runs the
/// requested sub-commands and/or profiles against it. The self-rebuild
/// bootstrap is a protocol for a build description binary recompiling
/// itself from a tracked C++ source, which this Rust demo isn't, so it
/// isn't wired in here — see `tests/bootstrap_test.rs` for that scenario.
#[derive(Parser)]
#[command(name = "forge-demo", about = "forge sample driver")]
struct Cli {
    /// Sub-commands and/or profile names, e.g. `build release` or `clean`.
    #[arg(default_value = "build")]
    args: Vec<String>,

    /// Path to an optional forge.toml.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Scratch directory the sample project is written into.
    #[arg(long, default_value = "forge-demo-workspace")]
    workspace: PathBuf,
}

fn write_sample_project(root: &Path) -> Result<()> {
    std::fs::create_dir_all(root.join("src"))?;
    std::fs::write(
        root.join("src/greet.cpp"),
        "#include \"greet.hpp\"\n#include <cstdio>\nvoid greet() { std::puts(\"hello from forge\"); }\n",
    )?;
    std::fs::write(root.join("src/greet.hpp"), "void greet();\n")?;
    std::fs::write(
        root.join("src/main.cpp"),
        "#include \"greet.hpp\"\nint main() { greet(); return 0; }\n",
    )?;
    Ok(())
}

fn build_sample_tree(root: &Path) -> Unit {
    let mut top = Unit::with_target(root.join("build/libgreet.a"));
    top.add_dep(Unit::with_source_and_target(
        root.join("src/greet.cpp"),
        root.join("build/greet.o"),
    ));
    top
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let config = BuildConfig::load(cli.config.as_deref()).context("failed to load config")?;

    write_sample_project(&cli.workspace).context("failed to write sample project")?;

    let mut top = build_sample_tree(&cli.workspace);
    top.set_compiler(config.compiler.clone());

    let profiles = config.profile_map();
    let (commands, active_profiles) = cli::dispatch_args(&cli.args, &mut top, &profiles);
    if !active_profiles.is_empty() {
        tracing::info!(profiles = ?active_profiles, "active profiles");
    }

    let build_root = cli.workspace.join("build");
    for command in &commands {
        cli::run_command(command, &top, &build_root, config.effective_jobs())?;
    }

    Ok(())
}
