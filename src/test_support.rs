//! In-memory stand-ins for the network, the clock and the terminal.
use crate::error::TransportError;
use crate::github::http::{ApiRequest, ApiResponse, Sleeper, Transport};
use crate::prompt::Confirm;
use crate::vcs::WorkingCopy;
use anyhow::anyhow;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

type Scripted = Result<ApiResponse, TransportError>;

#[derive(Default)]
struct TransportState {
    scripts: HashMap<String, VecDeque<Scripted>>,
    calls: HashMap<String, usize>,
    params: HashMap<String, Vec<(String, String)>>,
}

/// Replays scripted responses per URL. The last response for a URL repeats.
#[derive(Clone, Default)]
pub(crate) struct FakeTransport {
    state: Rc<RefCell<TransportState>>,
}

impl FakeTransport {
    pub(crate) fn push_ok(&self, url: &str, body: &str) {
        self.push(
            url,
            Ok(ApiResponse {
                status: 200,
                body: body.to_string(),
            }),
        );
    }

    pub(crate) fn push_error(&self, url: &str, err: TransportError) {
        self.push(url, Err(err));
    }

    fn push(&self, url: &str, scripted: Scripted) {
        self.state
            .borrow_mut()
            .scripts
            .entry(url.to_string())
            .or_default()
            .push_back(scripted);
    }

    pub(crate) fn calls(&self, url: &str) -> usize {
        self.state.borrow().calls.get(url).copied().unwrap_or(0)
    }

    pub(crate) fn params(&self, url: &str) -> Vec<(String, String)> {
        self.state
            .borrow()
            .params
            .get(url)
            .cloned()
            .unwrap_or_default()
    }
}

impl Transport for FakeTransport {
    fn send(&self, request: &ApiRequest<'_>) -> Result<ApiResponse, TransportError> {
        let mut state = self.state.borrow_mut();
        *state.calls.entry(request.url.to_string()).or_default() += 1;
        state.params.insert(
            request.url.to_string(),
            request
                .params
                .iter()
                .map(|(key, value)| (key.to_string(), value.clone()))
                .collect(),
        );
        let queue = state.scripts.get_mut(request.url);
        match queue {
            Some(queue) if queue.len() > 1 => queue.pop_front().expect("non-empty queue"),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => Err(TransportError::Connection(format!(
                "no scripted response for {}",
                request.url
            ))),
        }
    }
}

#[derive(Default)]
pub(crate) struct RecordingSleeper {
    sleeps: RefCell<Vec<Duration>>,
}

impl RecordingSleeper {
    pub(crate) fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }

    pub(crate) fn total(&self) -> Duration {
        self.sleeps.borrow().iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
    }
}

/// Answers confirmations from a fixed script and records the questions.
#[derive(Default)]
pub(crate) struct ScriptedConfirm {
    answers: RefCell<VecDeque<bool>>,
    questions: RefCell<Vec<String>>,
}

impl ScriptedConfirm {
    pub(crate) fn new(answers: &[bool]) -> Self {
        Self {
            answers: RefCell::new(answers.iter().copied().collect()),
            questions: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn questions(&self) -> Vec<String> {
        self.questions.borrow().clone()
    }
}

impl Confirm for ScriptedConfirm {
    fn confirm(&self, question: &str) -> anyhow::Result<bool> {
        self.questions.borrow_mut().push(question.to_string());
        Ok(self.answers.borrow_mut().pop_front().unwrap_or(false))
    }
}

/// Working copy that records which operations ran instead of calling git.
pub(crate) struct RecordingWorkingCopy {
    operations: RefCell<Vec<String>>,
    fail_pull: bool,
    dirty: Cell<bool>,
}

impl Default for RecordingWorkingCopy {
    /// Starts dirty, as after a successful tag edit.
    fn default() -> Self {
        Self {
            operations: RefCell::new(Vec::new()),
            fail_pull: false,
            dirty: Cell::new(true),
        }
    }
}

impl RecordingWorkingCopy {
    pub(crate) fn failing_pull(mut self) -> Self {
        self.fail_pull = true;
        self
    }

    pub(crate) fn operations(&self) -> Vec<String> {
        self.operations.borrow().clone()
    }

    fn record(&self, operation: &str) {
        self.operations.borrow_mut().push(operation.to_string());
    }
}

impl WorkingCopy for RecordingWorkingCopy {
    fn pull_latest(&self) -> anyhow::Result<()> {
        self.record("pull");
        if self.fail_pull {
            return Err(anyhow!("could not resolve host: github.com"));
        }
        Ok(())
    }

    fn diff(&self) -> anyhow::Result<String> {
        self.record("diff");
        Ok("-        tag: v-qa-00000000\n+        tag: v-qa-ab12cd34\n".to_string())
    }

    fn discard_changes(&self) -> anyhow::Result<()> {
        self.record("discard");
        self.dirty.set(false);
        Ok(())
    }

    fn has_changes(&self) -> anyhow::Result<bool> {
        Ok(self.dirty.get())
    }

    fn commit_and_push(&self, _message: &str) -> anyhow::Result<bool> {
        self.record("commit_and_push");
        let pushed = self.dirty.get();
        self.dirty.set(false);
        Ok(pushed)
    }
}
