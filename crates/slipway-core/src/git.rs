//! Local repository interrogation for preflight checks.
//!
//! Synchronous helpers used before a pipeline run starts; the diff itself
//! goes through the command-executor seam in `slipway-deploy`.

use std::path::Path;
use std::process::Command;

use crate::domain::{Result, SlipwayError};

/// Resolve a ref to a full commit SHA via `git rev-parse`.
///
/// Errors if the directory is not a repository, git is unavailable, or the
/// ref does not exist.
pub fn rev_parse(repo_dir: &Path, reference: &str) -> Result<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--verify", reference])
        .current_dir(repo_dir)
        .output()
        .map_err(|e| SlipwayError::Git(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SlipwayError::Git(format!(
            "git rev-parse {reference} failed: {}",
            stderr.trim()
        )));
    }

    let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if sha.is_empty() {
        return Err(SlipwayError::Git(format!(
            "git rev-parse {reference} returned empty output"
        )));
    }

    Ok(sha)
}

/// Check whether a directory is inside a git work tree.
pub fn is_work_tree(dir: &Path) -> bool {
    Command::new("git")
        .args(["rev-parse", "--is-inside-work-tree"])
        .current_dir(dir)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
