use std::collections::HashMap;
use std::path::Path;

use tracing::warn;

use crate::bootstrap::MARKER_ARG;
use crate::compiledb;
use crate::error::Result;
use crate::process;
use crate::scheduler;
use crate::unit::Unit;

type ProfileMap = HashMap<String, (Vec<String>, Vec<String>)>;

/// Parse `args` (not including argv[0]) into an ordered list of
/// sub-commands, applying any recognized profile flags to `top` as a
/// side effect and recording which profiles were activated.
///
/// - `nob_rebuild` is consumed silently; if present and `rebuild` is not
///   already in the list, `rebuild` is prepended.
/// - `build`/`rebuild`/`clean`/`cleanall`/`run` are recognized commands.
/// - Anything else is looked up in `profiles`; a match appends its flags
///   to `top` and records the name active. No match logs a warning and
///   is otherwise ignored.
pub fn dispatch_args(args: &[String], top: &mut Unit, profiles: &ProfileMap) -> (Vec<String>, Vec<String>) {
    const COMMANDS: &[&str] = &["build", "rebuild", "clean", "cleanall", "run"];

    let mut commands = Vec::new();
    let mut active_profiles = Vec::new();
    let mut saw_marker = false;

    for arg in args {
        if arg == MARKER_ARG {
            saw_marker = true;
            continue;
        }
        if COMMANDS.contains(&arg.as_str()) {
            commands.push(arg.clone());
            continue;
        }
        match profiles.get(arg) {
            Some((compile_flags, link_flags)) => {
                top.add_compile_flags(compile_flags.clone());
                top.add_link_flags(link_flags.clone());
                active_profiles.push(arg.clone());
            }
            None => warn!("unknown sub-command or profile: {arg}"),
        }
    }

    if saw_marker && !commands.iter().any(|c| c == "rebuild") {
        commands.insert(0, "rebuild".to_string());
    }

    (commands, active_profiles)
}

/// Run one sub-command against `top`.
pub fn run_command(name: &str, top: &Unit, build_root: &Path, max_parallel: usize) -> Result<()> {
    match name {
        "build" => {
            let plan = top.compile(false)?;
            scheduler::execute(&plan, max_parallel)?;
            compiledb::write_compile_db(&plan)?;
        }
        "rebuild" => {
            let plan = top.compile(true)?;
            scheduler::execute(&plan, max_parallel)?;
            compiledb::write_compile_db(&plan)?;
        }
        "clean" => {
            let plan = top.clean(false, build_root);
            scheduler::execute(&plan, max_parallel)?;
        }
        "cleanall" => {
            let plan = top.clean(true, build_root);
            scheduler::execute(&plan, max_parallel)?;
        }
        "run" => {
            if let Some(target) = top.get_target() {
                let result = process::run(&target, &[])?;
                print!("{}", result.stdout);
                eprint!("{}", result.stderr);
            }
        }
        other => warn!("unrecognized command: {other}"),
    }
    Ok(())
}
