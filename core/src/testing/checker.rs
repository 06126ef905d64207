use std::time::Duration;

use super::runner::{ExecTarget, ProcessRunner};
use crate::cancel::CancelToken;
use crate::error::*;
use crate::problem::{IoValue, Materialized};
use crate::scratch::Scratch;
use crate::verdict::Verdict;

/// Result of a testlib-style checker run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckerVerdict {
    pub verdict: Verdict,
    pub messages: Vec<String>,
}

/// Maps a testlib exit code to a verdict and the note attached to it.
pub fn verdict_from_exit_code(code: i32) -> (Verdict, Option<String>) {
    match code {
        0 => (Verdict::AC, None),
        1 => (Verdict::WA, None),
        2 => (Verdict::PE, None),
        3 => (Verdict::SE, Some("Checker run failed".into())),
        4 => (Verdict::WA, Some("Unexpected EOF".into())),
        5 => (Verdict::PC, None),
        code => (Verdict::SE, Some(format!("Unknown checker exit code: {}", code))),
    }
}

/// Runs checker executables as `checker <input> <output> <answer>`.
#[derive(Debug, Clone)]
pub struct Checker {
    runner: ProcessRunner,
    time_limit: Duration,
}

impl Checker {
    pub fn new(time_limit: Duration) -> Self {
        Self {
            runner: ProcessRunner::new(Duration::ZERO).ignore_exit_code(true),
            time_limit,
        }
    }

    /// Inline values are written to scratch files named after `key` and the role of the value,
    /// so the same `key` (a problem and test case) always maps to the same files.
    pub async fn check(
        &self,
        key: &str,
        checker: &ExecTarget,
        input: &IoValue,
        output: &IoValue,
        answer: &IoValue,
        scratch: &Scratch,
        cancel: &CancelToken,
    ) -> CheckerVerdict {
        let mut files: Vec<Materialized> = Vec::with_capacity(3);
        let prepared = async {
            for (label, v) in [("input", input), ("output", output), ("answer", answer)] {
                files.push(v.to_path(scratch, &format!("checker/{}/{}", key, label)).await?);
            }
            Ok::<_, Error>(())
        }
        .await;

        let res = match prepared {
            Ok(()) => self.run(checker, &files, cancel).await,
            Err(e) => CheckerVerdict {
                verdict: Verdict::SE,
                messages: vec![format!("Cannot prepare checker input: {:#}", e)],
            },
        };
        files.into_iter().for_each(|f| f.release(scratch));
        res
    }

    async fn run(
        &self,
        checker: &ExecTarget,
        files: &[Materialized],
        cancel: &CancelToken,
    ) -> CheckerVerdict {
        let mut target = checker.clone();
        target
            .args
            .extend(files.iter().map(|f| f.path.to_string_lossy().into_owned()));

        let outcome = match self
            .runner
            .run(&target, &IoValue::default(), self.time_limit, cancel)
            .await
        {
            Ok(o) => o,
            Err(e) => {
                return CheckerVerdict {
                    verdict: Verdict::SE,
                    messages: vec![format!("Failed to run checker: {:#}", e)],
                }
            }
        };
        log::debug!("Checker finished: {:?}", outcome);

        let text = if outcome.stderr.is_empty() {
            outcome.stdout
        } else {
            outcome.stderr
        };
        let mut messages: Vec<String> = Some(text).filter(|s| !s.is_empty()).into_iter().collect();

        let verdict = match (outcome.verdict, outcome.exit_code) {
            (Verdict::RJ, _) => {
                messages.extend(outcome.messages);
                Verdict::RJ
            }
            (Verdict::UKE, Some(code)) => {
                let (verdict, note) = verdict_from_exit_code(code);
                messages.extend(note);
                verdict
            }
            (_, _) => {
                messages.extend(outcome.messages.into_iter().map(|m| format!("Checker: {}", m)));
                Verdict::SE
            }
        };
        CheckerVerdict { verdict, messages }
    }
}
