//! Tag extraction from job logs of a finished run.
use super::types::WorkflowJobList;
use super::GithubClient;
use crate::error::{DeployError, DeployResult};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

const TAG_PATTERN: &str = r"v-qa-[a-f0-9]{4,}";

/// Artifact tag mined from build logs. Treated as opaque once found.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagToken(String);

impl TagToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for TagToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TagToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn tag_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(TAG_PATTERN).expect("regex for tag token"))
}

/// First tag token in `text`, if any.
pub fn find_tag(text: &str) -> Option<TagToken> {
    tag_regex()
        .find(text)
        .map(|found| TagToken(found.as_str().to_string()))
}

impl GithubClient {
    /// Scan the logs of every job of `run_id`, in provider order, and return
    /// the first tag token found.
    ///
    /// A job whose logs cannot be fetched is skipped.
    pub fn extract_tag(&self, repo: &str, run_id: u64) -> DeployResult<TagToken> {
        let url = self.repo_url(repo, &format!("actions/runs/{run_id}/jobs"));
        let jobs: WorkflowJobList = self.get_json(&url, &[])?;
        tracing::debug!(run_id, jobs = jobs.jobs.len(), "scanning job logs for tag");

        for job in &jobs.jobs {
            let logs_url = self.repo_url(repo, &format!("actions/jobs/{}/logs", job.id));
            let response = match self.get(&logs_url, &[]) {
                Ok(response) => response,
                Err(err) => {
                    tracing::warn!(job_id = job.id, error = %err, "skipping job logs");
                    continue;
                }
            };
            if response.status != 200 {
                tracing::warn!(job_id = job.id, status = response.status, "skipping job logs");
                continue;
            }
            if let Some(tag) = find_tag(&response.body) {
                tracing::info!(
                    run_id,
                    job_id = job.id,
                    job = job.name.as_deref().unwrap_or(""),
                    %tag,
                    "found tag in job logs"
                );
                return Ok(tag);
            }
        }

        Err(DeployError::TagNotFound { run_id })
    }
}
