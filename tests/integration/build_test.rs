use std::fs;
use std::path::Path;

use forge::unit::Unit;
use forge::{cli, compiledb, scheduler};

fn write(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

fn has_compiler() -> bool {
    which("c++")
}

fn which(bin: &str) -> bool {
    std::env::var_os("PATH")
        .and_then(|paths| {
            std::env::split_paths(&paths).find(|dir| dir.join(bin).is_file()).map(|_| ())
        })
        .is_some()
}

#[test]
fn s4_dynamic_library_full_pipeline() {
    if !has_compiler() {
        eprintln!("skipping: no c++ compiler on PATH");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src/a.cpp");
    write(&src, "int forty_two() { return 42; }\n");

    let mut top = Unit::with_target(dir.path().join("build/liby.so"));
    top.add_dep(Unit::with_source_and_target(&src, dir.path().join("build/a.o")));

    let plan = top.compile(false).unwrap();
    assert!(plan.node(0).unwrap().args.contains(&"-fPIC".to_string()));
    let link = plan.node(1).unwrap();
    let shared_pos = link.args.iter().position(|a| a == "-shared").unwrap();
    let o_pos = link.args.iter().position(|a| a == "-o").unwrap();
    assert!(shared_pos < o_pos);

    scheduler::execute(&plan, 2).unwrap();
    assert!(dir.path().join("build/liby.so").exists());

    compiledb::write_compile_db_to(&plan, &dir.path().join("compile_commands.json")).unwrap();
    let entries: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("compile_commands.json")).unwrap())
            .unwrap();
    assert_eq!(entries.as_array().unwrap().len(), 1);
}

#[test]
fn s5_fail_fast_bounds_additional_starts() {
    let dir = tempfile::tempdir().unwrap();
    let started_dir = dir.path().join("started");
    fs::create_dir_all(&started_dir).unwrap();

    let mut plan = forge::Plan::new();
    for i in 0..10usize {
        let marker = started_dir.join(format!("{i}"));
        let script = if i == 2 {
            format!("touch {} && exit 2", marker.display())
        } else {
            format!("touch {} && sleep 0.2", marker.display())
        };
        plan.add_cmd(forge::CompileCommand::new("sh", vec!["-c".into(), script], true, false));
    }

    let err = scheduler::execute(&plan, 4).unwrap_err();
    match err {
        forge::ForgeError::CommandFailed { exit_code, .. } => assert_eq!(exit_code, 2),
        other => panic!("unexpected error: {other:?}"),
    }

    let started = fs::read_dir(&started_dir).unwrap().count();
    assert!(started <= 4 + 3, "too many units started before fail-fast stopped the scheduler: {started}");
}

#[test]
fn build_sub_command_emits_compile_db_and_artifact() {
    if !has_compiler() {
        eprintln!("skipping: no c++ compiler on PATH");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src/main.cpp");
    write(&src, "int main() { return 0; }\n");

    let mut top = Unit::with_target(dir.path().join("build/out"));
    top.add_dep(Unit::with_source_and_target(&src, dir.path().join("build/main.o")));

    let build_root = dir.path().join("build");
    cli::run_command("build", &top, &build_root, 2).unwrap();
    assert!(dir.path().join("build/out").exists());
    assert!(Path::new("./compile_commands.json").exists());

    cli::run_command("clean", &top, &build_root, 2).unwrap();
    assert!(!dir.path().join("build/out").exists());
    assert!(!dir.path().join("build/main.o").exists());
}
