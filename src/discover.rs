use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::depfile;
use crate::error::Result;
use crate::unit::Unit;

/// Maps `<root_dir>/<rel>/<name>.cpp` to `build/<rel>/<name>.o`.
pub fn object_for_source(root_dir: &Path, cpp_path: &Path) -> PathBuf {
    let rel = cpp_path.strip_prefix(root_dir).unwrap_or(cpp_path);
    PathBuf::from("build").join(rel).with_extension("o")
}

/// Recursively walk `root_dir`, building a link-unit with `target` as its
/// output and one compile-unit child per `.cpp` file found. If a sibling
/// `.d` file already exists for a source, it is parsed and each header
/// becomes a header-dep child of that compile unit.
pub fn build_tree_from_cpp_files(root_dir: &Path, target: impl Into<PathBuf>) -> Result<Unit> {
    let mut top = Unit::with_target(target);

    let mut sources: Vec<PathBuf> = WalkDir::new(root_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("cpp"))
        .map(|e| e.path().to_path_buf())
        .collect();
    sources.sort();

    for source in sources {
        let object = object_for_source(root_dir, &source);
        let mut compile_unit = Unit::with_source_and_target(source.clone(), object);

        let dep_file = source.with_extension("d");
        if dep_file.exists() {
            for header in depfile::parse_depfile(&dep_file)? {
                compile_unit.add_dep(Unit::with_source(header));
            }
        }

        top.add_dep(compile_unit);
    }

    Ok(top)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn maps_object_path() {
        let root = Path::new("src");
        let obj = object_for_source(root, Path::new("src/sub/a.cpp"));
        assert_eq!(obj, PathBuf::from("build/sub/a.o"));
    }

    #[test]
    fn discovers_cpp_files_and_attaches_headers() {
        let dir = tempdir().unwrap();
        let src_root = dir.path().join("src");
        std::fs::create_dir_all(src_root.join("sub")).unwrap();
        std::fs::write(src_root.join("main.cpp"), "int main(){}").unwrap();
        std::fs::write(src_root.join("sub/a.cpp"), "void a(){}").unwrap();
        std::fs::write(src_root.join("sub/a.hpp"), "// header").unwrap();
        std::fs::write(
            src_root.join("sub/a.d"),
            format!(
                "{}: {} {}\n",
                object_for_source(&src_root, &src_root.join("sub/a.cpp")).display(),
                src_root.join("sub/a.cpp").display(),
                src_root.join("sub/a.hpp").display(),
            ),
        )
        .unwrap();

        let top = build_tree_from_cpp_files(&src_root, dir.path().join("build/out")).unwrap();
        assert_eq!(top.children.len(), 2);
        let a_unit = top
            .children
            .iter()
            .find(|u| u.source.as_ref().unwrap().ends_with("a.cpp"))
            .unwrap();
        assert_eq!(a_unit.children.len(), 1);
    }
}
