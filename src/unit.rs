//! Unit Graph & Planner — the user-facing tree of build units, and the
//! walk that turns it into a [`Plan`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ForgeError, Result};
use crate::plan::{CompileCommand, Plan};

/// Target kind, chosen from a target path's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Object,
    StaticLib,
    DynamicLib,
    Executable,
    None_,
}

impl TargetKind {
    pub fn from_target(target: &Path) -> Self {
        match target.extension().and_then(|e| e.to_str()) {
            Some("o") => TargetKind::Object,
            Some("a") => TargetKind::StaticLib,
            Some("so") => TargetKind::DynamicLib,
            Some("exe") => TargetKind::Executable,
            None => TargetKind::Executable,
            Some(_) => TargetKind::None_,
        }
    }
}

/// A node in the user-described build tree.
///
/// Units form a strict ownership tree: each child has exactly one parent,
/// and the in-memory shape never shares a subtree. If the same source
/// appears under two parents it is represented by two distinct `Unit`s.
#[derive(Debug, Clone)]
pub struct Unit {
    pub source: Option<PathBuf>,
    pub target: Option<PathBuf>,
    pub children: Vec<Unit>,
    pub compile_flags: Vec<String>,
    pub link_flags: Vec<String>,
    pub compiler: String,
    pub profiles: HashSet<String>,
}

impl Default for Unit {
    fn default() -> Self {
        Self {
            source: None,
            target: None,
            children: Vec::new(),
            compile_flags: Vec::new(),
            link_flags: Vec::new(),
            compiler: "c++".to_string(),
            profiles: HashSet::new(),
        }
    }
}

impl Unit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(source: impl Into<PathBuf>) -> Self {
        Self { source: Some(source.into()), ..Self::default() }
    }

    pub fn with_target(target: impl Into<PathBuf>) -> Self {
        Self { target: Some(target.into()), ..Self::default() }
    }

    pub fn with_source_and_target(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self { source: Some(source.into()), target: Some(target.into()), ..Self::default() }
    }

    pub fn target_kind(&self) -> TargetKind {
        match &self.target {
            Some(t) => TargetKind::from_target(t),
            None => TargetKind::None_,
        }
    }

    /// Append `child`, transferring ownership, and return a handle to it.
    pub fn add_dep(&mut self, child: Unit) -> &mut Unit {
        self.children.push(child);
        self.children.last_mut().expect("just pushed")
    }

    pub fn add_compile_flag(&mut self, flag: impl Into<String>) -> &mut Self {
        self.compile_flags.push(flag.into());
        self
    }

    pub fn add_compile_flags<I, S>(&mut self, flags: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.compile_flags.extend(flags.into_iter().map(Into::into));
        self
    }

    pub fn add_link_flag(&mut self, flag: impl Into<String>) -> &mut Self {
        self.link_flags.push(flag.into());
        self
    }

    pub fn add_link_flags<I, S>(&mut self, flags: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.link_flags.extend(flags.into_iter().map(Into::into));
        self
    }

    /// Set the compiler on self and recursively on all descendants,
    /// overriding any previously set per-node compiler.
    pub fn set_compiler(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.compiler = name.clone();
        for child in &mut self.children {
            child.set_compiler(name.clone());
        }
    }

    /// The target path of this unit, for the "run" sub-command.
    pub fn get_target(&self) -> Option<String> {
        self.target.as_ref().map(|t| t.to_string_lossy().into_owned())
    }

    /// Post-order textual dump with indentation equal to depth.
    pub fn print_depth(&self, depth: usize, out: &mut String) {
        for child in &self.children {
            child.print_depth(depth + 1, out);
        }
        let indent = "  ".repeat(depth);
        let label = match (&self.source, &self.target) {
            (Some(_), Some(_)) => "Compilation unit",
            (Some(_), None) => "Header dep",
            (None, Some(_)) => "Target",
            (None, None) => "Group",
        };
        let path = self
            .target
            .as_ref()
            .or(self.source.as_ref())
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        out.push_str(&format!("{indent}{label}: {path}\n"));
    }

    /// Produce a [`Plan`] from this tree, with `full_rebuild` forcing every
    /// node `enabled = true`.
    pub fn compile(&self, full_rebuild: bool) -> Result<Plan> {
        let mut plan = Plan::new();
        self.compile_impl(&mut plan, &[], TargetKind::None_, full_rebuild)?;
        Ok(plan)
    }

    fn compile_impl(
        &self,
        plan: &mut Plan,
        inherited_compile_flags: &[String],
        ancestor_kind: TargetKind,
        full_rebuild: bool,
    ) -> Result<(bool, Option<usize>)> {
        let mut local_flags = inherited_compile_flags.to_vec();
        local_flags.extend(self.compile_flags.iter().cloned());

        let new_ancestor_kind = match self.target_kind() {
            k @ (TargetKind::Executable | TargetKind::StaticLib | TargetKind::DynamicLib) => k,
            _ => ancestor_kind,
        };

        let mut dep_object_paths = Vec::new();
        let mut header_deps = Vec::new();
        let mut child_rebuild = false;
        let mut child_node_ids = Vec::new();

        for child in &self.children {
            let (c_rebuild, c_node) =
                child.compile_impl(plan, &local_flags, new_ancestor_kind, full_rebuild)?;
            child_rebuild |= c_rebuild;
            if let Some(id) = c_node {
                child_node_ids.push(id);
            }
            if child.target.is_some() {
                dep_object_paths.push(child.target.clone().unwrap());
            } else if child.source.is_some() {
                header_deps.push(child.source.clone().unwrap());
            }
        }

        let Some(target) = self.target.clone() else {
            // Pure aggregator (no source, no target) or a header dep unit.
            return Ok((false, None));
        };

        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let target_exists = target.exists();
        let mut rebuild = child_rebuild || !target_exists;

        if target_exists {
            let target_mtime = mtime(&target)?;
            for header in &header_deps {
                rebuild |= match mtime(header) {
                    Ok(m) => m > target_mtime,
                    Err(_) => true, // missing header: must rebuild
                };
            }
            if let Some(source) = &self.source {
                rebuild |= mtime(source)? > target_mtime;
            } else {
                for obj in &dep_object_paths {
                    rebuild |= match mtime(obj) {
                        Ok(m) => m > target_mtime,
                        Err(_) => true, // missing dep object: must rebuild
                    };
                }
            }
        }

        let enabled = rebuild || full_rebuild;
        let is_compile = self.source.is_some();

        let cmd = if is_compile {
            let mut args = Vec::new();
            if ancestor_kind == TargetKind::DynamicLib {
                args.push("-fPIC".to_string());
            }
            args.extend(local_flags.iter().cloned());
            args.push("-MMD".to_string());
            args.push("-c".to_string());
            args.push("-o".to_string());
            args.push(target.to_string_lossy().into_owned());
            args.push(self.source.as_ref().unwrap().to_string_lossy().into_owned());
            CompileCommand::new(self.compiler.clone(), args, enabled, true)
        } else {
            match self.target_kind() {
                TargetKind::StaticLib => {
                    let mut args = vec!["rcs".to_string(), target.to_string_lossy().into_owned()];
                    args.extend(dep_object_paths.iter().map(|p| p.to_string_lossy().into_owned()));
                    CompileCommand::new("ar", args, enabled, false)
                }
                TargetKind::DynamicLib => {
                    let mut args = vec!["-shared".to_string()];
                    args.extend(self.link_flags.iter().cloned());
                    args.push("-o".to_string());
                    args.push(target.to_string_lossy().into_owned());
                    args.extend(dep_object_paths.iter().map(|p| p.to_string_lossy().into_owned()));
                    CompileCommand::new(self.compiler.clone(), args, enabled, false)
                }
                _ => {
                    // EXECUTABLE, and the unspecified-extension NONE case
                    // default to executable-style linking.
                    let mut args = self.link_flags.clone();
                    args.push("-o".to_string());
                    args.push(target.to_string_lossy().into_owned());
                    args.extend(dep_object_paths.iter().map(|p| p.to_string_lossy().into_owned()));
                    CompileCommand::new(self.compiler.clone(), args, enabled, false)
                }
            }
        };

        debug!(target = %target.display(), enabled, "planned node");
        let node_id = plan.add_cmd(cmd);
        for child_id in child_node_ids {
            plan.add_edge(child_id, node_id);
        }

        Ok((rebuild, Some(node_id)))
    }

    /// Produce a [`Plan`] that deletes every intermediate/final target
    /// (and matching `.d` files for OBJECT kind) in post-order, or a
    /// single `rm -r <build_root>` if `remove_dir` is true.
    pub fn clean(&self, remove_dir: bool, build_root: &Path) -> Plan {
        let mut plan = Plan::new();
        if remove_dir {
            plan.add_cmd(CompileCommand::new(
                "rm",
                vec!["-r".to_string(), build_root.to_string_lossy().into_owned()],
                true,
                false,
            ));
            return plan;
        }
        self.clean_impl(&mut plan);
        plan
    }

    fn clean_impl(&self, plan: &mut Plan) {
        for child in &self.children {
            child.clean_impl(plan);
        }
        if let Some(target) = &self.target {
            plan.add_cmd(CompileCommand::new(
                "rm",
                vec![target.to_string_lossy().into_owned()],
                true,
                false,
            ));
            if self.target_kind() == TargetKind::Object {
                let dep_file = target.with_extension("d").to_string_lossy().into_owned();
                plan.add_cmd(CompileCommand::new("rm", vec![dep_file], true, false));
            }
        }
    }
}

fn mtime(path: &Path) -> Result<std::time::SystemTime> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(ForgeError::Io)
}
