use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::io::IoValue;
use crate::scratch::Scratch;
use crate::verdict::Verdict;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestCaseId(Uuid);

impl TestCaseId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TestCaseId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TestCaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub verdict: Verdict,
    pub elapsed_ms: Option<u64>,
    pub stdout: IoValue,
    pub stderr: IoValue,
    pub messages: Vec<String>,
}

impl RunResult {
    pub fn new(verdict: Verdict) -> Self {
        Self {
            verdict,
            elapsed_ms: None,
            stdout: IoValue::default(),
            stderr: IoValue::default(),
            messages: Vec::new(),
        }
    }

    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.messages.push(msg.into());
        self
    }

    pub fn message(&self) -> String {
        self.messages.join("\n")
    }

    pub fn release(&self, scratch: &Scratch) {
        self.stdout.release(scratch);
        self.stderr.release(scratch);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TestCase {
    pub stdin: IoValue,
    pub answer: IoValue,
    pub result: Option<RunResult>,
    pub disabled: bool,
    pub expanded: bool,
}

impl TestCase {
    pub fn new(stdin: impl Into<IoValue>, answer: impl Into<IoValue>) -> Self {
        Self {
            stdin: stdin.into(),
            answer: answer.into(),
            ..Default::default()
        }
    }

    pub fn verdict(&self) -> Option<Verdict> {
        self.result.as_ref().map(|r| r.verdict)
    }

    pub fn is_running(&self) -> bool {
        self.verdict().map_or(false, Verdict::is_running)
    }

    /// Replaces the result, releasing scratch files held by the previous one.
    pub fn set_result(&mut self, result: RunResult, scratch: &Scratch) {
        if let Some(old) = self.result.replace(result) {
            Self::release_unshared(&old, self.result.as_ref(), scratch);
        }
    }

    pub fn clear_result(&mut self, scratch: &Scratch) {
        if let Some(old) = self.result.take() {
            old.release(scratch);
        }
    }

    /// Only the verdict changes; outputs stay as they are.
    pub fn set_verdict(&mut self, verdict: Verdict) {
        match &mut self.result {
            Some(r) => r.verdict = verdict,
            None => self.result = Some(RunResult::new(verdict)),
        }
    }

    pub fn release(&self, scratch: &Scratch) {
        if let Some(r) = &self.result {
            r.release(scratch);
        }
        self.stdin.release(scratch);
        self.answer.release(scratch);
    }

    fn release_unshared(old: &RunResult, new: Option<&RunResult>, scratch: &Scratch) {
        for v in [&old.stdout, &old.stderr] {
            let still_used = new.map_or(false, |n| &n.stdout == v || &n.stderr == v);
            if !still_used {
                v.release(scratch);
            }
        }
    }
}
