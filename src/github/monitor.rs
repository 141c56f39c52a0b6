//! Locate, wait on and optionally mine a workflow run.
use super::logs::TagToken;
use super::types::WorkflowRun;
use super::GithubClient;
use crate::error::{DeployError, DeployResult};

pub const BUILD_REPO: &str = "Grexit/hot-api-mono";
pub const BUILD_WORKFLOW: &str = "qa build";
pub const ENV_REPO: &str = "Grexit/qa-env";
pub const ENV_BRANCH: &str = "main";
pub const PROVISION_WORKFLOW: &str = "spawn changed/new areas";

impl GithubClient {
    /// Wait for the latest `workflow_name` run on `branch` and, when
    /// `extract_tag` is set, return the tag found in its job logs.
    ///
    /// The run's conclusion is logged but does not stop the flow; a failed
    /// build may still have pushed its image.
    pub fn monitor(
        &self,
        repo: &str,
        branch: &str,
        workflow_name: &str,
        extract_tag: bool,
    ) -> DeployResult<Option<TagToken>> {
        let run = self.monitor_run(repo, branch, workflow_name)?;
        if !extract_tag {
            return Ok(None);
        }
        self.extract_tag(repo, run.id).map(Some)
    }

    /// Wait for the feature branch build and return the tag it produced.
    pub fn monitor_qa_build(&self, branch: &str) -> DeployResult<TagToken> {
        tracing::info!(
            repo = BUILD_REPO,
            branch,
            "looking for '{BUILD_WORKFLOW}' workflow"
        );
        let run = self.monitor_run(BUILD_REPO, branch, BUILD_WORKFLOW)?;
        self.extract_tag(BUILD_REPO, run.id)
    }

    /// Wait for the environment provisioning workflow on the config repo.
    pub fn monitor_provisioning(&self) -> DeployResult<()> {
        tracing::info!(
            repo = ENV_REPO,
            branch = ENV_BRANCH,
            "looking for '{PROVISION_WORKFLOW}' workflow"
        );
        self.monitor(ENV_REPO, ENV_BRANCH, PROVISION_WORKFLOW, false)
            .map(|_| ())
    }

    fn monitor_run(
        &self,
        repo: &str,
        branch: &str,
        workflow_name: &str,
    ) -> DeployResult<WorkflowRun> {
        let run = self
            .find_latest_run(repo, branch, workflow_name)?
            .ok_or_else(|| DeployError::WorkflowNotFound {
                repo: repo.to_string(),
                branch: branch.to_string(),
                workflow: workflow_name.to_string(),
            })?;

        tracing::info!(
            run_id = run.id,
            status = %run.status_label(),
            created_at = ?run.created_at,
            updated_at = ?run.updated_at,
            url = run.html_url.as_deref().unwrap_or(""),
            "found workflow run"
        );

        let finished = self.wait_for_run(repo, run.id)?;
        if !finished.succeeded() {
            tracing::warn!(
                run_id = finished.id,
                conclusion = %finished.conclusion_label(),
                "continuing after unsuccessful workflow run"
            );
        }
        Ok(finished)
    }
}
