use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::Result;

/// Compile and link flags attached to a named profile (e.g. `release`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileFlags {
    #[serde(default)]
    pub compile_flags: Vec<String>,
    #[serde(default)]
    pub link_flags: Vec<String>,
}

pub type Profiles = HashMap<String, ProfileFlags>;

#[derive(Debug, Clone, Deserialize)]
pub struct BuildConfig {
    #[serde(default = "default_compiler")]
    pub compiler: String,
    /// 0 means "autodetect hardware concurrency" (see [`Self::effective_jobs`]).
    #[serde(default)]
    pub jobs: usize,
    #[serde(default = "default_build_root")]
    pub build_root: String,
    #[serde(default)]
    pub profiles: Profiles,
}

fn default_compiler() -> String {
    "c++".to_string()
}

fn default_build_root() -> String {
    "build".to_string()
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            compiler: default_compiler(),
            jobs: 0,
            build_root: default_build_root(),
            profiles: Profiles::new(),
        }
    }
}

impl BuildConfig {
    /// Load from `path` if given and it exists; otherwise fall back to
    /// defaults. Unlike a layered XDG lookup, a single explicit path keeps
    /// the demo and tests self-contained.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) if p.exists() => {
                let text = std::fs::read_to_string(p)?;
                Ok(toml::from_str(&text)?)
            }
            _ => Ok(Self::default()),
        }
    }

    /// `jobs`, or hardware concurrency (minimum 1) when unset.
    pub fn effective_jobs(&self) -> usize {
        if self.jobs > 0 {
            self.jobs
        } else {
            std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
        }
    }

    /// Named profile's flags as `(compile_flags, link_flags)` tuples, for
    /// easy lookup by the CLI dispatcher.
    pub fn profile_map(&self) -> HashMap<String, (Vec<String>, Vec<String>)> {
        self.profiles
            .iter()
            .map(|(name, flags)| (name.clone(), (flags.compile_flags.clone(), flags.link_flags.clone())))
            .collect()
    }
}
