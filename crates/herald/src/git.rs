use std::env;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};

use crate::types::GitContext;

/// Collect git context information for the repository at `repo_root`.
/// Returns None if not in a git repository.
pub fn collect_git_context(repo_root: &Path) -> Option<GitContext> {
    let git_dir_check = Command::new(git_program())
        .arg("rev-parse")
        .arg("--git-dir")
        .current_dir(repo_root)
        .output()
        .ok()?;

    if !git_dir_check.status.success() {
        return None;
    }

    Some(GitContext {
        commit: git_output(repo_root, &["rev-parse", "HEAD"]),
        // Detached HEAD has no branch.
        branch: git_output(repo_root, &["rev-parse", "--abbrev-ref", "HEAD"])
            .filter(|b| b != "HEAD"),
        tag: git_output(repo_root, &["describe", "--tags", "--exact-match"]),
        dirty: git_output_raw(repo_root, &["status", "--porcelain"])
            .map(|out| !out.trim().is_empty()),
    })
}

fn git_output(repo_root: &Path, args: &[&str]) -> Option<String> {
    git_output_raw(repo_root, args)
        .map(|out| out.trim().to_string())
        .filter(|out| !out.is_empty())
}

fn git_output_raw(repo_root: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new(git_program())
        .args(args)
        .current_dir(repo_root)
        .output()
        .ok()?;

    if output.status.success() {
        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        None
    }
}

pub fn tag_exists(repo_root: &Path, tag: &str) -> Result<bool> {
    let out = Command::new(git_program())
        .arg("tag")
        .arg("--list")
        .arg(tag)
        .current_dir(repo_root)
        .output()
        .context("failed to execute git tag; is git installed?")?;

    if !out.status.success() {
        bail!(
            "git tag --list failed: {}",
            String::from_utf8_lossy(&out.stderr).trim()
        );
    }

    Ok(String::from_utf8_lossy(&out.stdout)
        .lines()
        .any(|line| line.trim() == tag))
}

/// Create an annotated tag at HEAD.
pub fn create_tag(repo_root: &Path, tag: &str, message: &str) -> Result<()> {
    if tag_exists(repo_root, tag)? {
        bail!("git tag {tag} already exists");
    }

    let out = Command::new(git_program())
        .arg("tag")
        .arg("-a")
        .arg(tag)
        .arg("-m")
        .arg(message)
        .current_dir(repo_root)
        .output()
        .context("failed to execute git tag; is git installed?")?;

    if !out.status.success() {
        bail!(
            "git tag failed: {}",
            String::from_utf8_lossy(&out.stderr).trim()
        );
    }
    Ok(())
}

fn git_program() -> String {
    env::var("HERALD_GIT_BIN").unwrap_or_else(|_| "git".to_string())
}
