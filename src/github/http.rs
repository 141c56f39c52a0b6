//! Authenticated provider calls with bounded retry.
//!
//! The executor is split from the wire so the retry policy can be exercised
//! without a network: [`Transport`] performs exactly one attempt and
//! [`Sleeper`] owns the waiting between attempts.
use crate::error::{DeployError, DeployResult, TransportError};
use serde::de::DeserializeOwned;
use std::rc::Rc;
use std::time::Duration;

pub use ureq::http::Method;

/// Job logs are plain text and can run to tens of megabytes.
const MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const ACCEPT: &str = "application/vnd.github.v3+json";

/// One logical request handed to a transport.
#[derive(Debug)]
pub struct ApiRequest<'a> {
    pub method: &'a Method,
    pub url: &'a str,
    pub params: &'a [(&'a str, String)],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self, url: &str) -> DeployResult<T> {
        serde_json::from_str(&self.body).map_err(|source| DeployError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

/// Performs a single attempt of a request. Non-2xx answers are errors.
pub trait Transport {
    fn send(&self, request: &ApiRequest<'_>) -> Result<ApiResponse, TransportError>;
}

pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Blocks the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// How many times a request is attempted and how long to wait in between.
#[derive(Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Wait before the next attempt, keyed by the zero-based index of the
    /// attempt that just failed.
    pub backoff: fn(u32) -> Duration,
    pub is_retryable: fn(&TransportError) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: linear_backoff,
            is_retryable: retry_all,
        }
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    /// Only retry failures below the HTTP layer, plus 5xx and 429.
    ///
    /// A 404 or 401 is permanent and is surfaced on the first attempt.
    pub fn transport_only() -> Self {
        Self {
            is_retryable: TransportError::is_transport_level,
            ..Self::default()
        }
    }

    pub fn backoff_for(&self, failed_index: u32) -> Duration {
        (self.backoff)(failed_index)
    }
}

/// 2s, 4s, 6s, ...
pub fn linear_backoff(failed_index: u32) -> Duration {
    Duration::from_secs(u64::from(failed_index + 1) * 2)
}

fn retry_all(_: &TransportError) -> bool {
    true
}

pub struct RequestExecutor {
    transport: Box<dyn Transport>,
    sleeper: Rc<dyn Sleeper>,
    policy: RetryPolicy,
}

impl RequestExecutor {
    pub fn new(
        transport: Box<dyn Transport>,
        sleeper: Rc<dyn Sleeper>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            sleeper,
            policy,
        }
    }

    /// Send a request, retrying per the policy.
    ///
    /// The last transport error is returned once attempts are exhausted or the
    /// policy declines to retry it. No sleep follows the final attempt.
    pub fn execute(
        &self,
        method: &Method,
        url: &str,
        params: &[(&str, String)],
    ) -> DeployResult<ApiResponse> {
        let request = ApiRequest {
            method,
            url,
            params,
        };
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            let err = match self.transport.send(&request) {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };
            attempt += 1;
            if attempt >= max_attempts || !(self.policy.is_retryable)(&err) {
                return Err(DeployError::Request {
                    url: url.to_string(),
                    attempts: attempt,
                    source: err,
                });
            }
            let wait = self.policy.backoff_for(attempt - 1);
            tracing::warn!(
                attempt,
                max_attempts,
                wait_secs = wait.as_secs(),
                error = %err,
                url,
                "request failed, retrying"
            );
            self.sleeper.sleep(wait);
        }
    }
}

/// Blocking transport backed by a shared `ureq` agent.
pub struct UreqTransport {
    agent: ureq::Agent,
    authorization: String,
    user_agent: String,
}

impl UreqTransport {
    pub fn new(token: &str) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build()
            .into();
        Self {
            agent,
            authorization: format!("token {token}"),
            user_agent: format!("forge-deploy/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &ApiRequest<'_>) -> Result<ApiResponse, TransportError> {
        if *request.method != Method::GET {
            return Err(TransportError::UnsupportedMethod(
                request.method.to_string(),
            ));
        }
        let mut builder = self
            .agent
            .get(request.url)
            .header("Authorization", self.authorization.as_str())
            .header("Accept", ACCEPT)
            .header("User-Agent", self.user_agent.as_str());
        for (key, value) in request.params {
            builder = builder.query(key, value);
        }

        let mut response = builder.call().map_err(|err| match err {
            ureq::Error::StatusCode(status) => TransportError::Status {
                status,
                url: request.url.to_string(),
            },
            other => TransportError::Connection(other.to_string()),
        })?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_string()
            .map_err(|err| TransportError::Body(err.to_string()))?;
        tracing::debug!(url = request.url, status, bytes = body.len(), "response");
        Ok(ApiResponse { status, body })
    }
}
