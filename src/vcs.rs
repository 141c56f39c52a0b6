//! Git operations on the environment-config working copy.
//!
//! The working copy must already be cloned; nothing here clones or
//! configures it. All commands run with the working copy as cwd.
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

pub const MAIN_BRANCH: &str = "main";
pub const REMOTE: &str = "origin";
pub const COMMIT_MESSAGE: &str = "Update environment with new tag";

/// Version-control operations the deployment flow needs.
pub trait WorkingCopy {
    /// Check out the main line and pull it from the remote.
    fn pull_latest(&self) -> Result<()>;

    /// Unstaged changes as a diff, empty when clean.
    fn diff(&self) -> Result<String>;

    /// Throw away unstaged changes to tracked files.
    fn discard_changes(&self) -> Result<()>;

    /// True when the index or tracked files differ from HEAD.
    fn has_changes(&self) -> Result<bool>;

    /// Stage everything, commit and push to the main line.
    ///
    /// Returns false, without committing, when staging leaves nothing to
    /// commit.
    fn commit_and_push(&self, message: &str) -> Result<bool>;
}

#[derive(Debug, Clone)]
pub struct GitWorkingCopy {
    root: PathBuf,
    git: PathBuf,
    color: bool,
}

impl GitWorkingCopy {
    /// Open an existing clone at `root`, using the `git` found on `PATH`.
    pub fn open(root: &Path) -> Result<Self> {
        let git = which::which("git").context("locate git on PATH")?;
        Self::open_with(root, git)
    }

    pub fn open_with(root: &Path, git: PathBuf) -> Result<Self> {
        if !root.is_dir() {
            return Err(anyhow!("working copy not found: {}", root.display()));
        }
        let copy = Self {
            root: root.to_path_buf(),
            git,
            color: true,
        };
        copy.run(&["rev-parse", "--is-inside-work-tree"])
            .with_context(|| format!("{} is not a git working copy", root.display()))?;
        Ok(copy)
    }

    /// Colored diffs are meant for a terminal; tests and logs want plain text.
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let output = Command::new(&self.git)
            .args(args)
            .current_dir(&self.root)
            .output()
            .with_context(|| format!("run git {}", args.join(" ")))?;
        tracing::debug!(args = %args.join(" "), status = %output.status, "git");
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "git {} failed with status {}: {}",
                args.join(" "),
                output.status,
                stderr.trim()
            ));
        }
        String::from_utf8(output.stdout).context("decode git output as UTF-8")
    }
}

impl WorkingCopy for GitWorkingCopy {
    fn pull_latest(&self) -> Result<()> {
        self.run(&["checkout", MAIN_BRANCH])?;
        self.run(&["pull", REMOTE, MAIN_BRANCH])?;
        tracing::info!(branch = MAIN_BRANCH, "pulled latest changes");
        Ok(())
    }

    fn diff(&self) -> Result<String> {
        let color = if self.color {
            "--color=always"
        } else {
            "--no-color"
        };
        self.run(&["diff", color])
    }

    fn discard_changes(&self) -> Result<()> {
        self.run(&["checkout", "--", "."])?;
        tracing::info!("all changes have been reset");
        Ok(())
    }

    fn has_changes(&self) -> Result<bool> {
        let status = self.run(&["status", "--porcelain", "--untracked-files=no"])?;
        Ok(!status.trim().is_empty())
    }

    fn commit_and_push(&self, message: &str) -> Result<bool> {
        self.run(&["add", "."])?;
        if !self.has_changes()? {
            tracing::info!("no changes to commit");
            return Ok(false);
        }
        self.run(&["commit", "-m", message])?;
        self.run(&["push", REMOTE, MAIN_BRANCH])?;
        tracing::info!(remote = REMOTE, branch = MAIN_BRANCH, "pushed changes");
        Ok(true)
    }
}
