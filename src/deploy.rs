//! One deployment attempt, end to end.
//!
//! pull config repo -> wait for the branch build and take its tag -> edit the
//! environment document -> confirm, commit and push -> wait for provisioning.
//! Nothing is rolled back on failure; the working copy is left for the
//! operator to inspect.
use crate::envfile::EnvironmentEditor;
use crate::github::GithubClient;
use crate::prompt::Confirm;
use crate::vcs::{WorkingCopy, COMMIT_MESSAGE};
use anyhow::Result;

pub const PUSH_QUESTION: &str = "Do you want to commit and push these changes?";
pub const DISCARD_QUESTION: &str = "Do you want to discard the changes?";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    /// Provisioning finished. `changed` is false when the tag was already
    /// current and nothing was pushed.
    Deployed { tag: String, changed: bool },
    /// The operator declined to push; provisioning was not awaited.
    Cancelled { tag: String, discarded: bool },
}

pub struct Deployer<'a> {
    github: &'a GithubClient,
    editor: &'a EnvironmentEditor,
    working_copy: &'a dyn WorkingCopy,
    prompt: &'a dyn Confirm,
}

impl<'a> Deployer<'a> {
    pub fn new(
        github: &'a GithubClient,
        editor: &'a EnvironmentEditor,
        working_copy: &'a dyn WorkingCopy,
        prompt: &'a dyn Confirm,
    ) -> Self {
        Self {
            github,
            editor,
            working_copy,
            prompt,
        }
    }

    pub fn run(&self, branch: &str, env: &str) -> Result<DeployOutcome> {
        tracing::info!(branch, env, "starting QA deployment");

        if let Err(err) = self.working_copy.pull_latest() {
            tracing::warn!(error = %format!("{err:#}"), "could not pull latest changes");
        }

        let tag = self.github.monitor_qa_build(branch)?.into_string();
        tracing::info!(%tag, "build completed");

        let update = self.editor.update_tag(env, &tag)?;
        if !update.changed {
            tracing::info!("tag is already up to date, skipping to provisioning");
        } else {
            tracing::info!(old_tag = %update.old_tag, new_tag = %tag, "environment file updated");
            self.show_diff();
            if !self.prompt.confirm(PUSH_QUESTION)? {
                tracing::info!("deployment cancelled by operator");
                let discarded = self.offer_discard()?;
                return Ok(DeployOutcome::Cancelled { tag, discarded });
            }
            self.working_copy.commit_and_push(COMMIT_MESSAGE)?;
        }

        self.github.monitor_provisioning()?;
        tracing::info!(env, %tag, "deployment completed");
        Ok(DeployOutcome::Deployed {
            tag,
            changed: update.changed,
        })
    }

    fn show_diff(&self) {
        match self.working_copy.diff() {
            Ok(diff) if diff.trim().is_empty() => println!("No changes detected"),
            Ok(diff) => println!("\nChanges made:\n{}", diff.trim_end()),
            Err(err) => tracing::warn!(error = %format!("{err:#}"), "could not show diff"),
        }
    }

    fn offer_discard(&self) -> Result<bool> {
        if !self.prompt.confirm(DISCARD_QUESTION)? {
            return Ok(false);
        }
        match self.working_copy.discard_changes() {
            Ok(()) => Ok(true),
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "could not reset changes");
                Ok(false)
            }
        }
    }
}
