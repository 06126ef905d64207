use std::io;
use std::path::Path;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt as _, AsyncWrite, AsyncWriteExt as _};
use tokio::process::{Child, ChildStderr};
use tokio::time::Instant;

use super::checker::{verdict_from_exit_code, CheckerVerdict};
use super::runner::{extract_timing_marker, ExecTarget, ProcessRunner, RunOutcome, DRAIN_AFTER_KILL};
use crate::cancel::CancelToken;
use crate::error::*;
use crate::problem::IoValue;
use crate::scratch::Scratch;
use crate::verdict::Verdict;

/// A program run against an interactor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractiveOutcome {
    /// How the program ended. `stdout` holds what the interactor wrote to its output file.
    pub program: RunOutcome,
    /// The interactor's verdict. None unless both processes exited on their own.
    pub judged: Option<CheckerVerdict>,
}

/// Runs a program with its stdin and stdout cross-connected to an interactor
/// invoked as `interactor <input> <output>`. The interactor's exit code follows
/// the checker table.
#[derive(Debug, Clone)]
pub struct Interactor {
    runner: ProcessRunner,
}

enum Ended {
    Exited {
        program: io::Result<ExitStatus>,
        interactor: io::Result<ExitStatus>,
        elapsed: Duration,
    },
    TimedOut,
    Cancelled,
}

/// Copies until EOF, then closes `to`. A reader that went away is not an error.
async fn forward<R, W>(mut from: R, mut to: W) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let res = tokio::io::copy(&mut from, &mut to).await;
    let _ = to.shutdown().await;
    match res {
        Err(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(e),
        _ => Ok(()),
    }
}

impl Interactor {
    pub fn new(time_addition: Duration) -> Self {
        Self {
            runner: ProcessRunner::new(time_addition),
        }
    }

    /// Both processes share `time_limit` plus the grace period and are killed together
    /// on timeout or cancellation. `key` names the scratch files of this run.
    #[allow(clippy::too_many_arguments)]
    pub async fn run(
        &self,
        key: &str,
        program: &ExecTarget,
        interactor: &ExecTarget,
        input: &IoValue,
        scratch: &Scratch,
        time_limit: Duration,
        cancel: &CancelToken,
    ) -> Result<InteractiveOutcome> {
        let input = input.to_path(scratch, &format!("interactor/{}/input", key)).await?;
        let output = scratch.io_path_for(&format!("interactor/{}/output", key));
        let res = async {
            scratch.write_io(&output, b"").await?;
            let mut target = interactor.clone();
            target.args.extend(
                [&input.path, &output]
                    .iter()
                    .map(|p| p.to_string_lossy().into_owned()),
            );
            self.interact(program, &target, &output, time_limit, cancel).await
        }
        .await;
        input.release(scratch);
        scratch.release(&output);
        res
    }

    async fn interact(
        &self,
        program: &ExecTarget,
        interactor: &ExecTarget,
        output: &Path,
        time_limit: Duration,
        cancel: &CancelToken,
    ) -> Result<InteractiveOutcome> {
        let start_at = Instant::now();
        let mut prog = program.spawn_piped()?;
        let mut inter = interactor.spawn_piped()?;

        let prog_in = prog.stdin.take().context("Failed to open stdin")?;
        let prog_out = prog.stdout.take().context("Failed to open stdout")?;
        let mut prog_err = prog.stderr.take().context("Failed to open stderr")?;
        let inter_in = inter.stdin.take().context("Failed to open interactor stdin")?;
        let inter_out = inter.stdout.take().context("Failed to open interactor stdout")?;
        let mut inter_err = inter.stderr.take().context("Failed to open interactor stderr")?;

        let mut prog_err_buf = Vec::new();
        let mut inter_err_buf = Vec::new();

        let ended = {
            let exec = async {
                let wait_program = async {
                    let status = prog.wait().await;
                    (status, start_at.elapsed())
                };
                let (to_inter, to_prog, err, inter_err_res, (program, elapsed), interactor) = tokio::join!(
                    forward(prog_out, inter_in),
                    forward(inter_out, prog_in),
                    prog_err.read_to_end(&mut prog_err_buf),
                    inter_err.read_to_end(&mut inter_err_buf),
                    wait_program,
                    inter.wait(),
                );
                to_inter.context("Failed to pass program output to the interactor")?;
                to_prog.context("Failed to pass interactor output to the program")?;
                err.context("Failed to read stderr")?;
                inter_err_res.context("Failed to read interactor stderr")?;
                Ok::<_, Error>(Ended::Exited {
                    program,
                    interactor,
                    elapsed,
                })
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => Ended::Cancelled,
                res = exec => res?,
                _ = tokio::time::sleep(time_limit + self.runner.time_addition()) => Ended::TimedOut,
            }
        };

        let (verdict, messages, exit_code, elapsed, judged) = match ended {
            Ended::Exited {
                program,
                interactor,
                elapsed,
            } => {
                let status = program.context("Failed to wait for the process")?;
                let (verdict, messages, code) = self.runner.classify(status);
                let status = interactor.context("Failed to wait for the interactor")?;
                let judged = Self::judge(status, &inter_err_buf);
                (verdict, messages, code, elapsed, Some(judged))
            }
            Ended::TimedOut => {
                let elapsed = start_at.elapsed();
                Self::stop(&mut prog, &mut inter, &mut prog_err, &mut prog_err_buf).await;
                (Verdict::TLE, vec!["Killed due to timeout".to_owned()], None, elapsed, None)
            }
            Ended::Cancelled => {
                let elapsed = start_at.elapsed();
                Self::stop(&mut prog, &mut inter, &mut prog_err, &mut prog_err_buf).await;
                (Verdict::RJ, vec!["Aborted by user".to_owned()], None, elapsed, None)
            }
        };

        let stdout = tokio::fs::read(output)
            .await
            .with_context(|| format!("Failed to read interactor output {}", output.display()))?;
        let stdout = String::from_utf8_lossy(&stdout).trim().to_owned();
        let (stderr, marked_time) = extract_timing_marker(&String::from_utf8_lossy(&prog_err_buf));

        Ok(InteractiveOutcome {
            program: RunOutcome {
                verdict,
                messages,
                exit_code,
                elapsed: marked_time.unwrap_or(elapsed),
                stdout,
                stderr,
            },
            judged,
        })
    }

    async fn stop(prog: &mut Child, inter: &mut Child, prog_err: &mut ChildStderr, prog_err_buf: &mut Vec<u8>) {
        ProcessRunner::kill(prog).await;
        ProcessRunner::kill(inter).await;
        let _ = tokio::time::timeout(DRAIN_AFTER_KILL, prog_err.read_to_end(prog_err_buf)).await;
    }

    fn judge(status: ExitStatus, stderr: &[u8]) -> CheckerVerdict {
        let text = String::from_utf8_lossy(stderr).trim().to_owned();
        let mut messages: Vec<String> = Some(text).filter(|s| !s.is_empty()).into_iter().collect();
        let verdict = match status.code() {
            Some(code) => {
                let (verdict, note) = verdict_from_exit_code(code);
                messages.extend(note);
                verdict
            }
            None => {
                messages.push("Interactor terminated by a signal".to_owned());
                Verdict::SE
            }
        };
        CheckerVerdict { verdict, messages }
    }
}
