use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ForgeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("plan error: {0}")]
    Plan(String),

    #[error("malformed dependency file {path}: {reason}")]
    DepFile { path: PathBuf, reason: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("command failed with exit code {exit_code}: {command}")]
    CommandFailed { command: String, exit_code: i32 },

    #[error("self-rebuild compile failed with exit code {0}")]
    SelfRebuildCompile(i32),

    #[error("self-rebuild exec failed: {0}")]
    SelfRebuildExec(std::io::Error),

    #[error("TOML deserialization error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ForgeError>;
