//! Error taxonomy for a deployment attempt.
//!
//! Transient transport failures are retried inside the request executor and
//! only surface here once the retry policy is exhausted. Everything else is a
//! misconfiguration, a missing run or a polling timeout and is reported as-is.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by a [`crate::github::http::Transport`] for one attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The provider answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// No usable response (DNS, TLS, connection reset, timeout).
    #[error("connection error: {0}")]
    Connection(String),

    /// The response arrived but its body could not be read.
    #[error("read response body: {0}")]
    Body(String),

    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),
}

impl TransportError {
    /// True for failures that happened below the HTTP layer.
    pub fn is_transport_level(&self) -> bool {
        match self {
            TransportError::Connection(_) | TransportError::Body(_) => true,
            TransportError::Status { status, .. } => *status >= 500 || *status == 429,
            TransportError::UnsupportedMethod(_) => false,
        }
    }
}

/// Shape problems found while validating an environment document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    #[error("'modules' section not found in {}", .0.display())]
    MissingModules(PathBuf),

    #[error("'hot' module not found in {}", .0.display())]
    MissingHotModule(PathBuf),

    #[error("'services' section not found in hot module of {}", .0.display())]
    MissingServices(PathBuf),

    #[error("'hot-api-mono' service not found in hot module of {}", .0.display())]
    MissingService(PathBuf),
}

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("request to {url} failed after {attempts} attempt(s): {source}")]
    Request {
        url: String,
        attempts: u32,
        #[source]
        source: TransportError,
    },

    #[error("decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no '{workflow}' workflow found for branch {branch} in {repo}")]
    WorkflowNotFound {
        repo: String,
        branch: String,
        workflow: String,
    },

    #[error("workflow run {run_id} did not complete within {}s", .waited.as_secs())]
    PollTimedOut { run_id: u64, waited: Duration },

    #[error("could not extract tag from logs of workflow run {run_id}")]
    TagNotFound { run_id: u64 },

    #[error("invalid environment name '{0}'")]
    InvalidEnvironment(String),

    #[error("environment file not found: {}", .0.display())]
    EnvFileNotFound(PathBuf),

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error("could not find hot-api-mono tag to update in {}", .0.display())]
    TagNotLocated(PathBuf),

    #[error("parse {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type DeployResult<T> = std::result::Result<T, DeployError>;
