//! Version control state of the local project

use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};
use log::info;

pub trait VersionControl {
    fn has_uncommitted_changes(&self, root: &Path) -> Result<bool>;
    fn active_branch(&self, root: &Path) -> Result<String>;
}

/// Asks the `git` binary
pub struct Git;

impl Git {
    fn run(&self, root: &Path, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .arg("-C")
            .arg(root)
            .args(args)
            .env_remove("GIT_DIR")
            .env_remove("GIT_WORK_TREE")
            .output()
            .context("Can't run git")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("git {} failed: {}", args.join(" "), stderr.trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl VersionControl for Git {
    fn has_uncommitted_changes(&self, root: &Path) -> Result<bool> {
        let status = self.run(root, &["status", "--porcelain"])?;
        Ok(has_changes(&status))
    }

    fn active_branch(&self, root: &Path) -> Result<String> {
        let branch = self.run(root, &["rev-parse", "--abbrev-ref", "HEAD"])?;
        let branch = branch.trim().to_string();
        info!("Active branch is {branch}");
        Ok(branch)
    }
}

fn has_changes(porcelain: &str) -> bool {
    porcelain.lines().any(|line| !line.trim().is_empty())
}
