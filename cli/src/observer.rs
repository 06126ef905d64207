use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use colored::Colorize as _;
use cpjudge_core::{Observer, Problem, TestCaseId};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::Level;

use crate::style::{self, ColorTheme as _};

/// Prints notifications, and with [`TerminalObserver::with_progress`] shows a spinner per running case.
pub struct TerminalObserver {
    progress: Option<Mutex<Progress>>,
}

struct Progress {
    container: MultiProgress,
    style: ProgressStyle,
    bars: HashMap<TestCaseId, ProgressBar>,
}

impl TerminalObserver {
    pub fn new() -> Self {
        Self { progress: None }
    }

    pub fn with_progress() -> Self {
        let style = ProgressStyle::default_spinner()
            .template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        Self {
            progress: Some(Mutex::new(Progress {
                container: MultiProgress::new(),
                style,
                bars: HashMap::new(),
            })),
        }
    }

    fn print(&self, msg: String) {
        match &self.progress {
            Some(p) => {
                let p = p.lock().unwrap_or_else(PoisonError::into_inner);
                if p.container.println(&msg).is_err() {
                    eprintln!("{}", msg);
                }
            }
            None => eprintln!("{}", msg),
        }
    }
}

impl Default for TerminalObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress {
    fn update(&mut self, problem: &Problem) {
        for (index, (id, tc)) in problem.iter_ordered().enumerate() {
            let Some(res) = &tc.result else {
                continue;
            };
            let label = format!("Test case #{} ...", index + 1);

            if res.verdict.is_running() {
                let bar = self.bars.entry(id).or_insert_with(|| {
                    let bar = self
                        .container
                        .add(ProgressBar::new_spinner())
                        .with_style(self.style.clone());
                    bar.enable_steady_tick(Duration::from_millis(50));
                    bar
                });
                bar.set_message(format!("{} {}", label, res.verdict.name()));
                continue;
            }

            // cases outside the current run have no bar
            let Some(bar) = self.bars.get(&id).filter(|b| !b.is_finished()) else {
                continue;
            };
            let elapsed = res
                .elapsed_ms
                .map(|ms| format!(" [{}ms]", ms))
                .unwrap_or_default();
            bar.finish_with_message(
                format!(
                    "{} {}{}",
                    label,
                    style::padded_judge_icon(res.verdict),
                    elapsed
                )
                .cyan()
                .to_string(),
            );
        }
    }
}

impl Observer for TerminalObserver {
    fn on_problem_change(&self, problem: Option<&Problem>) {
        let (Some(progress), Some(problem)) = (&self.progress, problem) else {
            return;
        };
        progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .update(problem);
    }

    fn on_compile_output(&self, output: &str) {
        self.print(format!("{}\n{}", "[compiler]".yellow().bold(), output));
    }

    fn notify(&self, level: Level, msg: &str) {
        log::debug!("notify({}): {}", level, msg);
        if level > Level::Info {
            return;
        }
        let tag = format!("[{}]", level).color(level.color()).bold();
        self.print(format!("{} {}", tag, msg));
    }
}
