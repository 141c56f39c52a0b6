//! CI provider client: run lookup, completion polling and tag extraction.
//!
//! All calls go through one [`http::RequestExecutor`], so every request gets
//! the same retry policy. The poller shares the executor's [`http::Sleeper`].
pub mod http;
pub mod locate;
pub mod logs;
pub mod monitor;
pub mod poll;
pub mod types;

use crate::config::DeployConfig;
use crate::error::DeployResult;
use http::{
    ApiResponse, Method, RequestExecutor, RetryPolicy, Sleeper, ThreadSleeper, UreqTransport,
};
use poll::PollSettings;
use serde::de::DeserializeOwned;
use std::rc::Rc;

pub use logs::TagToken;
pub use types::{RunConclusion, RunStatus, WorkflowJob, WorkflowRun};

pub struct GithubClient {
    api_url: String,
    executor: RequestExecutor,
    sleeper: Rc<dyn Sleeper>,
    poll: PollSettings,
}

impl GithubClient {
    pub fn new(
        api_url: &str,
        executor: RequestExecutor,
        sleeper: Rc<dyn Sleeper>,
        poll: PollSettings,
    ) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            executor,
            sleeper,
            poll,
        }
    }

    /// Client talking to the configured provider over HTTPS.
    pub fn from_config(config: &DeployConfig) -> Self {
        let sleeper: Rc<dyn Sleeper> = Rc::new(ThreadSleeper);
        let executor = RequestExecutor::new(
            Box::new(UreqTransport::new(&config.github.token)),
            sleeper.clone(),
            RetryPolicy::default(),
        );
        Self::new(&config.github.api_url, executor, sleeper, config.polling)
    }

    fn repo_url(&self, repo: &str, path: &str) -> String {
        format!("{}/repos/{}/{}", self.api_url, repo, path)
    }

    fn get(&self, url: &str, params: &[(&str, String)]) -> DeployResult<ApiResponse> {
        self.executor.execute(&Method::GET, url, params)
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> DeployResult<T> {
        self.get(url, params)?.json(url)
    }
}
