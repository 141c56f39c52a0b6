//! Shared test infrastructure for integration tests.
#![allow(dead_code)]

use forge_deploy::error::TransportError;
use forge_deploy::github::http::{
    ApiRequest, ApiResponse, RequestExecutor, RetryPolicy, Sleeper, Transport,
};
use forge_deploy::github::monitor::{BUILD_REPO, ENV_REPO};
use forge_deploy::github::poll::PollSettings;
use forge_deploy::github::GithubClient;
use forge_deploy::prompt::Confirm;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::rc::Rc;
use std::time::Duration;
use tempfile::TempDir;

pub const API: &str = "https://api.test";

pub const HOT_1: &str = "\
# QA area hot-1
modules:
  - name: core
    services:
      - name: hot-api-mono
        tag: v-qa-11111111   # core copy, never touched
  - name: hot
    services:
      - name: hot-api-mono
        tag: v-qa-00000000
      - name: hot-web
        tag: v-qa-22222222
";

/// Provider double: scripted responses per URL, the last one repeating.
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    scripts: Rc<RefCell<HashMap<String, VecDeque<ApiResponse>>>>,
    requests: Rc<RefCell<Vec<String>>>,
}

impl ScriptedProvider {
    pub fn respond(&self, path: &str, body: impl Into<String>) {
        self.scripts
            .borrow_mut()
            .entry(format!("{API}/repos/{path}"))
            .or_default()
            .push_back(ApiResponse {
                status: 200,
                body: body.into(),
            });
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    pub fn requested(&self, path: &str) -> usize {
        let url = format!("{API}/repos/{path}");
        self.requests
            .borrow()
            .iter()
            .filter(|seen| **seen == url)
            .count()
    }

    /// A "qa build" run on `branch` that finishes on the second poll and
    /// logs `tag` in its only job.
    pub fn qa_build(&self, branch: &str, tag: &str) {
        self.respond(
            &format!("{BUILD_REPO}/actions/runs"),
            runs(&[run(42, "qa build", "in_progress", None, branch)]),
        );
        self.respond(
            &format!("{BUILD_REPO}/actions/runs/42"),
            run(42, "qa build", "in_progress", None, branch),
        );
        self.respond(
            &format!("{BUILD_REPO}/actions/runs/42"),
            run(42, "qa build", "completed", Some("success"), branch),
        );
        self.respond(
            &format!("{BUILD_REPO}/actions/runs/42/jobs"),
            r#"{"jobs": [{"id": 900, "name": "build"}]}"#,
        );
        self.respond(
            &format!("{BUILD_REPO}/actions/jobs/900/logs"),
            format!("Step 4/9 : docker push\nSuccessfully tagged hot-api-mono:{tag}\n"),
        );
    }

    pub fn provisioning(&self, conclusion: &str) {
        self.respond(
            &format!("{ENV_REPO}/actions/runs"),
            runs(&[run(77, "spawn changed/new areas", "queued", None, "main")]),
        );
        self.respond(
            &format!("{ENV_REPO}/actions/runs/77"),
            run(77, "spawn changed/new areas", "completed", Some(conclusion), "main"),
        );
    }
}

impl Transport for ScriptedProvider {
    fn send(&self, request: &ApiRequest<'_>) -> Result<ApiResponse, TransportError> {
        self.requests.borrow_mut().push(request.url.to_string());
        let mut scripts = self.scripts.borrow_mut();
        match scripts.get_mut(request.url) {
            Some(queue) if queue.len() > 1 => Ok(queue.pop_front().unwrap()),
            Some(queue) if !queue.is_empty() => Ok(queue[0].clone()),
            _ => Err(TransportError::Status {
                status: 404,
                url: request.url.to_string(),
            }),
        }
    }
}

pub fn run(id: u64, name: &str, status: &str, conclusion: Option<&str>, branch: &str) -> String {
    serde_json::json!({
        "id": id,
        "name": name,
        "status": status,
        "conclusion": conclusion,
        "head_branch": branch,
        "created_at": "2024-05-01T10:00:00Z",
        "html_url": format!("https://github.test/runs/{id}"),
    })
    .to_string()
}

pub fn runs(items: &[String]) -> String {
    format!(
        r#"{{"total_count": {}, "workflow_runs": [{}]}}"#,
        items.len(),
        items.join(",")
    )
}

/// Clock double: records requested sleeps instead of blocking.
#[derive(Default)]
pub struct VirtualClock {
    slept: RefCell<Vec<Duration>>,
}

impl VirtualClock {
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.borrow().clone()
    }
}

impl Sleeper for VirtualClock {
    fn sleep(&self, duration: Duration) {
        self.slept.borrow_mut().push(duration);
    }
}

pub fn github_client(provider: &ScriptedProvider, clock: &Rc<VirtualClock>) -> GithubClient {
    let sleeper: Rc<dyn Sleeper> = clock.clone();
    let executor = RequestExecutor::new(
        Box::new(provider.clone()),
        sleeper.clone(),
        RetryPolicy::default(),
    );
    let poll = PollSettings {
        interval: Duration::from_secs(30),
        timeout: Some(Duration::from_secs(1800)),
    };
    GithubClient::new(API, executor, sleeper, poll)
}

/// Operator double answering from a fixed list; unanswered questions are "no".
pub struct Answers {
    answers: RefCell<VecDeque<bool>>,
    asked: RefCell<Vec<String>>,
}

impl Answers {
    pub fn new(answers: &[bool]) -> Self {
        Self {
            answers: RefCell::new(answers.iter().copied().collect()),
            asked: RefCell::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.borrow().clone()
    }
}

impl Confirm for Answers {
    fn confirm(&self, question: &str) -> anyhow::Result<bool> {
        self.asked.borrow_mut().push(question.to_string());
        Ok(self.answers.borrow_mut().pop_front().unwrap_or(false))
    }
}

/// A qa-env clone with a bare `origin`, both under one temp dir.
pub struct QaEnvRepo {
    _dir: TempDir,
    pub work: PathBuf,
    pub remote: PathBuf,
}

impl QaEnvRepo {
    /// None when git is not installed.
    pub fn create() -> Option<Self> {
        if which::which("git").is_err() {
            eprintln!("Skipping: git not found");
            return None;
        }
        let dir = TempDir::new().unwrap();
        let work = dir.path().join("qa-env");
        let remote = dir.path().join("qa-env.git");
        fs::create_dir_all(work.join("areas")).unwrap();
        git(dir.path(), &["init", "--bare", remote.to_str().unwrap()]);
        git(&work, &["init"]);
        git(&work, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        git(&work, &["config", "user.name", "Forge Test"]);
        git(&work, &["config", "user.email", "forge@example.com"]);
        git(&work, &["config", "commit.gpgsign", "false"]);
        fs::write(work.join("areas/hot-1.yaml"), HOT_1).unwrap();
        git(&work, &["add", "."]);
        git(&work, &["commit", "-m", "initial areas"]);
        git(&work, &["remote", "add", "origin", remote.to_str().unwrap()]);
        git(&work, &["push", "origin", "main"]);
        Some(Self {
            _dir: dir,
            work,
            remote,
        })
    }

    pub fn area(&self, env: &str) -> String {
        fs::read_to_string(self.work.join("areas").join(format!("{env}.yaml"))).unwrap()
    }

    pub fn remote_subjects(&self) -> Vec<String> {
        git(&self.remote, &["log", "--format=%s", "main"])
            .lines()
            .map(str::to_string)
            .collect()
    }
}

pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}
