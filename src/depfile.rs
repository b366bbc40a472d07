use std::path::{Path, PathBuf};

use crate::error::{ForgeError, Result};

/// Parse a single-rule `.d` file: handle backslash line continuations,
/// skip tokens up to and including the first `:`, skip the first
/// following `.cpp` token (the rule's own input), and return the
/// remaining whitespace-separated tokens as header paths.
pub fn parse_depfile(path: &Path) -> Result<Vec<PathBuf>> {
    let content = std::fs::read_to_string(path).map_err(|e| ForgeError::DepFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let joined = content.replace("\\\r\n", " ").replace("\\\n", " ");
    let mut tokens = joined.split_whitespace();

    for token in tokens.by_ref() {
        if token.contains(':') {
            break;
        }
    }

    let mut headers = Vec::new();
    let mut skipped_input = false;
    for token in tokens {
        if !skipped_input && token.ends_with(".cpp") {
            skipped_input = true;
            continue;
        }
        headers.push(PathBuf::from(token));
    }

    Ok(headers)
}
