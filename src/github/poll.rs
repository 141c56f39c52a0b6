//! Completion polling for a single workflow run.
//!
//! The wait is a loop of fetch-then-sleep. Fetch errors never end the wait;
//! only a terminal run or the configured timeout does.
use super::types::WorkflowRun;
use super::GithubClient;
use crate::error::{DeployError, DeployResult};
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    /// `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: Some(DEFAULT_POLL_TIMEOUT),
        }
    }
}

/// Progress of one wait. Lives only for the duration of the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollState {
    pub run_id: u64,
    /// Sum of the poll intervals slept so far.
    pub elapsed: Duration,
    pub polls: u32,
}

impl PollState {
    fn new(run_id: u64) -> Self {
        Self {
            run_id,
            elapsed: Duration::ZERO,
            polls: 0,
        }
    }
}

impl GithubClient {
    /// Block until the run completes; true when it concluded with success.
    pub fn wait_for_completion(&self, repo: &str, run_id: u64) -> DeployResult<bool> {
        Ok(self.wait_for_run(repo, run_id)?.succeeded())
    }

    /// Block until the run completes and return its final snapshot.
    pub fn wait_for_run(&self, repo: &str, run_id: u64) -> DeployResult<WorkflowRun> {
        let url = self.repo_url(repo, &format!("actions/runs/{run_id}"));
        let mut state = PollState::new(run_id);
        loop {
            state.polls += 1;
            match self.get_json::<WorkflowRun>(&url, &[]) {
                Ok(run) if run.is_completed() => {
                    if run.succeeded() {
                        tracing::info!(
                            run_id,
                            polls = state.polls,
                            "workflow completed successfully"
                        );
                    } else {
                        tracing::warn!(
                            run_id,
                            conclusion = %run.conclusion_label(),
                            "workflow failed"
                        );
                    }
                    return Ok(run);
                }
                Ok(run) => {
                    tracing::info!(
                        run_id,
                        status = %run.status_label(),
                        elapsed_secs = state.elapsed.as_secs(),
                        "workflow still running, checking again in {}s",
                        self.poll.interval.as_secs()
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        run_id,
                        error = %err,
                        "error checking workflow status, retrying in {}s",
                        self.poll.interval.as_secs()
                    );
                }
            }
            self.pause(&mut state)?;
        }
    }

    fn pause(&self, state: &mut PollState) -> DeployResult<()> {
        let interval = self.poll.interval;
        if let Some(timeout) = self.poll.timeout {
            if state.elapsed + interval > timeout {
                return Err(DeployError::PollTimedOut {
                    run_id: state.run_id,
                    waited: state.elapsed,
                });
            }
        }
        self.sleeper.sleep(interval);
        state.elapsed += interval;
        Ok(())
    }
}
