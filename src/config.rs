//! Operator configuration, loaded once at start and passed by reference.
//!
//! The file lives at `~/.config/forge-deploy.yml` unless `--config` or
//! `FORGE_DEPLOY_CONFIG` points elsewhere.
use crate::github::poll::{PollSettings, DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT};
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const CONFIG_FILE_NAME: &str = "forge-deploy.yml";
const SAMPLE_CONFIG: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.yml.example"));

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    github: RawGithub,
    #[serde(default)]
    local: RawLocal,
    #[serde(default)]
    polling: RawPolling,
}

#[derive(Debug, Default, Deserialize)]
struct RawGithub {
    token: Option<String>,
    api_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLocal {
    qa_env_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPolling {
    interval_secs: Option<u64>,
    timeout_secs: Option<u64>,
}

#[derive(Clone)]
pub struct GithubSettings {
    pub token: String,
    pub api_url: String,
}

impl fmt::Debug for GithubSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubSettings")
            .field("token", &"<redacted>")
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct LocalSettings {
    /// Working copy of the environment-config repository.
    pub qa_env_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub path: PathBuf,
    pub github: GithubSettings,
    pub local: LocalSettings,
    pub polling: PollSettings,
}

impl DeployConfig {
    /// Load and validate the config file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(anyhow!(
                "config file not found: {}\n\nCreate it with the following structure:\n{}\n{}\n{}",
                path.display(),
                "=".repeat(60),
                sample_config(),
                "=".repeat(60)
            ));
        }
        let text =
            fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
        Self::from_yaml(&text, path)
    }

    pub fn from_yaml(text: &str, path: &Path) -> Result<Self> {
        let raw: Option<RawConfig> = serde_yaml::from_str(text)
            .with_context(|| format!("parse config {}", path.display()))?;
        let raw = raw.unwrap_or_default();

        let token = required(raw.github.token, "github.token")?;
        let qa_env_path = required(raw.local.qa_env_path, "local.qa_env_path")?;
        let api_url = raw
            .github
            .api_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let interval = raw
            .polling
            .interval_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL);
        if interval.is_zero() {
            return Err(anyhow!("polling.interval_secs must be greater than zero"));
        }
        let timeout = match raw.polling.timeout_secs {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => Some(DEFAULT_POLL_TIMEOUT),
        };

        Ok(Self {
            path: path.to_path_buf(),
            github: GithubSettings { token, api_url },
            local: LocalSettings {
                qa_env_path: expand_home(&qa_env_path),
            },
            polling: PollSettings { interval, timeout },
        })
    }
}

/// Explicit path if given, otherwise `~/.config/forge-deploy.yml`.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(home.join(".config").join(CONFIG_FILE_NAME))
}

pub fn sample_config() -> &'static str {
    SAMPLE_CONFIG.trim()
}

fn required(value: Option<String>, key: &str) -> Result<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| anyhow!("Missing required config key: {key}"))
}

fn expand_home(raw: &str) -> PathBuf {
    if raw == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}
