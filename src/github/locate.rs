use super::types::{WorkflowRun, WorkflowRunList};
use super::GithubClient;
use crate::error::DeployResult;

/// Only the first page of runs is inspected.
pub const RUNS_PER_PAGE: usize = 10;

impl GithubClient {
    /// Most recent run of `workflow_name` on `branch`, if it is among the
    /// latest [`RUNS_PER_PAGE`] runs for that branch.
    pub fn find_latest_run(
        &self,
        repo: &str,
        branch: &str,
        workflow_name: &str,
    ) -> DeployResult<Option<WorkflowRun>> {
        let url = self.repo_url(repo, "actions/runs");
        let params = [
            ("branch", branch.to_string()),
            ("per_page", RUNS_PER_PAGE.to_string()),
        ];
        let list: WorkflowRunList = self.get_json(&url, &params)?;
        tracing::debug!(
            repo,
            branch,
            runs = list.workflow_runs.len(),
            "listed workflow runs"
        );
        Ok(select_latest(list.workflow_runs, workflow_name))
    }
}

fn select_latest(runs: Vec<WorkflowRun>, workflow_name: &str) -> Option<WorkflowRun> {
    runs.into_iter()
        .take(RUNS_PER_PAGE)
        .find(|run| run.name_matches(workflow_name))
}
