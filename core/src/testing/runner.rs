use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use serde::Deserialize;
use tokio::io::AsyncReadExt as _;
use tokio::process::{Child, Command};
use tokio::time::Instant;

use crate::cancel::CancelToken;
use crate::error::*;
use crate::problem::IoValue;
use crate::verdict::Verdict;

/// Something that can be launched: a compiled binary or an interpreter with its script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecTarget {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl ExecTarget {
    /// A compiled executable: no arguments, run from its own directory.
    pub fn executable(path: impl Into<PathBuf>) -> Self {
        let program: PathBuf = path.into();
        let cwd = program.parent().map(|p| p.to_owned());
        Self {
            program,
            args: Vec::new(),
            cwd,
        }
    }

    /// Starts the process with all three standard streams piped.
    pub(crate) fn spawn_piped(&self) -> Result<Child> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        let proc = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn '{}'", self.display()))?;
        log::debug!("Spawned '{}' (pid={:?})", self.display(), proc.id());
        Ok(proc)
    }

    pub fn display(&self) -> String {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// UKE when the process ended normally; the caller decides the final verdict.
    pub verdict: Verdict,
    pub messages: Vec<String>,
    /// None when killed, cancelled or terminated by a signal.
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutcome {
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed.as_millis() as u64
    }
}

#[derive(Debug, Clone)]
pub struct ProcessRunner {
    time_addition: Duration,
    ignore_exit_code: bool,
}

enum Ended {
    Exited(std::io::Result<ExitStatus>, Duration),
    TimedOut,
    Cancelled,
}

#[derive(Debug, Deserialize)]
struct TimingData {
    /// milliseconds
    time: f64,
}

pub(crate) const DRAIN_AFTER_KILL: Duration = Duration::from_millis(200);

impl ProcessRunner {
    pub fn new(time_addition: Duration) -> Self {
        Self {
            time_addition,
            ignore_exit_code: false,
        }
    }

    /// Non-zero exit codes are then reported as a normal end (UKE).
    pub fn ignore_exit_code(mut self, yes: bool) -> Self {
        self.ignore_exit_code = yes;
        self
    }

    pub fn time_addition(&self) -> Duration {
        self.time_addition
    }

    /// Runs `target` feeding it `stdin`. The process is killed once `time_limit` plus the
    /// grace period passes or `cancel` fires.
    ///
    /// An `Err` means the process could not be started or talked to.
    pub async fn run(
        &self,
        target: &ExecTarget,
        stdin: &IoValue,
        time_limit: Duration,
        cancel: &CancelToken,
    ) -> Result<RunOutcome> {
        let mut input_reader = stdin.new_reader().await?;

        let start_at = Instant::now();
        let mut proc = target.spawn_piped()?;

        let mut child_stdin = proc.stdin.take().context("Failed to open stdin")?;
        let mut stdout = proc.stdout.take().context("Failed to open stdout")?;
        let mut stderr = proc.stderr.take().context("Failed to open stderr")?;

        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();

        let feed = async move {
            let res = tokio::io::copy(&mut input_reader, &mut child_stdin).await;
            drop(child_stdin); // closes the pipe so the program sees EOF
            match res {
                Ok(_) => Ok(()),
                // the program exited without reading all of its input
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
                Err(e) => Err(e),
            }
        };

        let ended = {
            let exec = async {
                let wait = async {
                    let status = proc.wait().await;
                    (status, start_at.elapsed())
                };
                let (fed, out, err, (status, elapsed)) = tokio::join!(
                    feed,
                    stdout.read_to_end(&mut stdout_buf),
                    stderr.read_to_end(&mut stderr_buf),
                    wait,
                );
                fed.context("Failed to pass input-data to stdin")?;
                out.context("Failed to read stdout")?;
                err.context("Failed to read stderr")?;
                Ok::<_, Error>(Ended::Exited(status, elapsed))
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => Ended::Cancelled,
                res = exec => res?,
                _ = tokio::time::sleep(time_limit + self.time_addition) => Ended::TimedOut,
            }
        };

        let (verdict, messages, exit_code, elapsed) = match ended {
            Ended::Exited(status, elapsed) => {
                let status = status.context("Failed to wait for the process")?;
                let (verdict, messages, code) = self.classify(status);
                (verdict, messages, code, elapsed)
            }
            Ended::TimedOut => {
                let elapsed = start_at.elapsed();
                Self::kill(&mut proc).await;
                Self::drain(&mut stdout, &mut stdout_buf, &mut stderr, &mut stderr_buf).await;
                (Verdict::TLE, vec!["Killed due to timeout".to_owned()], None, elapsed)
            }
            Ended::Cancelled => {
                let elapsed = start_at.elapsed();
                Self::kill(&mut proc).await;
                Self::drain(&mut stdout, &mut stdout_buf, &mut stderr, &mut stderr_buf).await;
                (Verdict::RJ, vec!["Aborted by user".to_owned()], None, elapsed)
            }
        };

        let stdout = String::from_utf8_lossy(&stdout_buf).trim().to_owned();
        let (stderr, marked_time) = extract_timing_marker(&String::from_utf8_lossy(&stderr_buf));

        Ok(RunOutcome {
            verdict,
            messages,
            exit_code,
            elapsed: marked_time.unwrap_or(elapsed),
            stdout,
            stderr,
        })
    }

    pub(crate) fn classify(&self, status: ExitStatus) -> (Verdict, Vec<String>, Option<i32>) {
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt as _;
            if let Some(sig) = status.signal() {
                let msg = format!("Process terminated by signal {}", sig);
                return (Verdict::RE, vec![msg], None);
            }
        }
        match status.code() {
            Some(code) if code != 0 && !self.ignore_exit_code => {
                let msg = format!("Process exited with code {}", code);
                (Verdict::RE, vec![msg], Some(code))
            }
            code => (Verdict::UKE, vec![], code),
        }
    }

    pub(crate) async fn kill(proc: &mut Child) {
        proc.kill()
            .await
            .unwrap_or_else(|e| log::warn!("Failed to kill process: {:#}", e));
    }

    /// Collects what is left in the pipes after a kill. Bounded, since a grandchild
    /// may still hold them open.
    async fn drain(
        stdout: &mut tokio::process::ChildStdout,
        stdout_buf: &mut Vec<u8>,
        stderr: &mut tokio::process::ChildStderr,
        stderr_buf: &mut Vec<u8>,
    ) {
        let _ = tokio::time::timeout(DRAIN_AFTER_KILL, async {
            let _ = tokio::join!(stdout.read_to_end(stdout_buf), stderr.read_to_end(stderr_buf));
        })
        .await;
    }
}

/// Strips `-----RUN DATA STARTS-----{"time": <ms>}-----` from stderr.
/// Returns the cleaned, trimmed stderr and the reported time, if any.
pub fn extract_timing_marker(stderr: &str) -> (String, Option<Duration>) {
    let re = lazy_regex::regex!(r"(?s)-----RUN DATA STARTS-----(\{.*?\})-----");

    let time = re.captures(stderr).and_then(|caps| {
        match serde_json::from_str::<TimingData>(&caps[1]) {
            Ok(data) if data.time.is_finite() && data.time >= 0.0 => {
                Some(Duration::from_micros((data.time * 1000.0).round() as u64))
            }
            Ok(data) => {
                log::warn!("Ignoring invalid reported time: {}", data.time);
                None
            }
            Err(e) => {
                log::warn!("Failed to parse timing data: {}", e);
                None
            }
        }
    });
    let cleaned = re.replace_all(stderr, "").trim().to_owned();
    (cleaned, time)
}
