use std::path::{Path, PathBuf};
use std::process::Stdio;

use sha2::{Digest, Sha256};
use tokio::process::Command;

use super::runner::ExecTarget;
use crate::cancel::CancelToken;
use crate::config::{CompileConfig, LangConfig};
use crate::problem::{CompilationSettings, FileWithHash};
use crate::scratch::{sha256_hex, Scratch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Recompile {
    /// Rebuild only when the source or the build command changed.
    #[default]
    Auto,
    Always,
    /// Reuse any existing binary.
    Never,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    Compiled {
        target: ExecTarget,
        /// None for interpreted languages.
        hash: Option<String>,
        diagnostics: String,
        skipped: bool,
    },
    Failed {
        message: String,
        cancelled: bool,
    },
}

impl CompileOutcome {
    fn failed(message: impl Into<String>) -> Self {
        CompileOutcome::Failed {
            message: message.into(),
            cancelled: false,
        }
    }
}

/// The build command of one source file after per-problem overrides are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Toolchain {
    lang: String,
    compiler: Option<String>,
    args: Vec<String>,
    runner: Option<String>,
    run_args: Vec<String>,
}

impl Toolchain {
    fn resolve(lang: &LangConfig, overrides: Option<&CompilationSettings>) -> Self {
        let o = overrides.cloned().unwrap_or_default();
        Self {
            lang: lang.name.clone(),
            compiler: o.compiler.or_else(|| lang.compiler.clone()),
            args: o.compiler_args.unwrap_or_else(|| lang.args.clone()),
            runner: o.runner.or_else(|| lang.runner.clone()),
            run_args: o.runner_args.unwrap_or_else(|| lang.run_args.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Compiler {
    cfg: CompileConfig,
    bin_dir: PathBuf,
}

impl Compiler {
    pub fn new(cfg: CompileConfig, scratch: &Scratch) -> Self {
        Self {
            cfg,
            bin_dir: scratch.bin_dir(),
        }
    }

    /// `<bin dir>/<stem>-<first 12 hex digits of sha256(source path)>`
    pub fn output_path(&self, src: &Path) -> PathBuf {
        let stem = src
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "main".to_owned());
        let hash = sha256_hex(src.to_string_lossy().as_bytes());
        self.bin_dir.join(format!("{}-{}", stem, &hash[..12]))
    }

    pub fn cache_key(content: &[u8], compiler: &str, args: &[String]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content);
        hasher.update(compiler.as_bytes());
        for arg in args {
            hasher.update(b"\0");
            hasher.update(arg.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    pub async fn compile(
        &self,
        src: &FileWithHash,
        overrides: Option<&CompilationSettings>,
        recompile: Recompile,
        cancel: &CancelToken,
    ) -> CompileOutcome {
        let Some(lang) = self.cfg.find_lang_for(&src.path) else {
            return CompileOutcome::failed(format!(
                "Unsupported file type: {}",
                src.path.display()
            ));
        };
        let tc = Toolchain::resolve(lang, overrides);

        let src_path = match tokio::fs::canonicalize(&src.path).await {
            Ok(p) => p,
            Err(e) => {
                return CompileOutcome::failed(format!(
                    "Cannot find source file {}: {}",
                    src.path.display(),
                    e
                ))
            }
        };

        let Some(compiler) = &tc.compiler else {
            return Self::interpreted(&tc, src_path);
        };

        let content = match tokio::fs::read(&src_path).await {
            Ok(c) => c,
            Err(e) => {
                return CompileOutcome::failed(format!(
                    "Cannot read source file {}: {}",
                    src_path.display(),
                    e
                ))
            }
        };
        let hash = Self::cache_key(&content, compiler, &tc.args);
        let output = self.output_path(&src_path);

        let reusable = fsutil::is_executable_file(&output)
            && match recompile {
                Recompile::Never => true,
                Recompile::Auto => src.hash.as_deref() == Some(hash.as_str()),
                Recompile::Always => false,
            };
        if reusable {
            log::info!("Skip compiling {} (up to date)", src_path.display());
            return CompileOutcome::Compiled {
                target: ExecTarget::executable(output),
                hash: Some(hash),
                diagnostics: String::new(),
                skipped: true,
            };
        }

        if let Err(e) = fsutil::remove_file_if_exists(&output) {
            return CompileOutcome::failed(format!("Cannot remove stale binary: {}", e));
        }
        if let Err(e) = fsutil::mkdir_all(&self.bin_dir) {
            return CompileOutcome::failed(e.to_string());
        }

        self.build(compiler, &tc, &src_path, output, hash, cancel)
            .await
    }

    fn interpreted(tc: &Toolchain, src_path: PathBuf) -> CompileOutcome {
        let Some(runner) = &tc.runner else {
            return CompileOutcome::failed(format!(
                "Neither compiler nor runner is configured for {}",
                tc.lang
            ));
        };
        let cwd = src_path.parent().map(|p| p.to_owned());
        let mut args = tc.run_args.clone();
        args.push(src_path.to_string_lossy().into_owned());
        CompileOutcome::Compiled {
            target: ExecTarget {
                program: runner.into(),
                args,
                cwd,
            },
            hash: None,
            diagnostics: String::new(),
            skipped: true,
        }
    }

    /// A failed build never leaves a file at `output`, so a later cache hit cannot pick it up.
    async fn build(
        &self,
        compiler: &str,
        tc: &Toolchain,
        src_path: &Path,
        output: PathBuf,
        hash: String,
        cancel: &CancelToken,
    ) -> CompileOutcome {
        let res = self
            .run_compiler(compiler, tc, src_path, &output, hash, cancel)
            .await;
        if let CompileOutcome::Failed { .. } = &res {
            match fsutil::remove_file_if_exists(&output) {
                Ok(true) => log::debug!("Removed output of failed build: {}", output.display()),
                Ok(false) => {}
                Err(e) => log::warn!("{}", e),
            }
        }
        res
    }

    async fn run_compiler(
        &self,
        compiler: &str,
        tc: &Toolchain,
        src_path: &Path,
        output: &Path,
        hash: String,
        cancel: &CancelToken,
    ) -> CompileOutcome {
        let mut cmd = Command::new(compiler);
        cmd.args(&tc.args)
            .arg(src_path)
            .arg("-o")
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = src_path.parent() {
            cmd.current_dir(dir);
        }

        log::info!(
            "Compiling: {} {} {} -o {}",
            compiler,
            tc.args.join(" "),
            src_path.display(),
            output.display()
        );

        let timeout = self.cfg.timeout();
        let res = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return CompileOutcome::Failed {
                    message: "Compilation aborted by user".to_owned(),
                    cancelled: true,
                };
            }
            res = cmd.output() => res,
            _ = tokio::time::sleep(timeout) => {
                return CompileOutcome::failed(format!(
                    "Compilation timed out after {}ms",
                    timeout.as_millis()
                ));
            }
        };

        let out = match res {
            Ok(out) => out,
            Err(e) => {
                return CompileOutcome::failed(format!(
                    "Failed to run compiler '{}': {}",
                    compiler, e
                ))
            }
        };

        let diagnostics = [&out.stderr, &out.stdout]
            .iter()
            .map(|b| String::from_utf8_lossy(b).trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        if !out.status.success() {
            let status = match out.status.code() {
                Some(code) => format!("Compiler exited with code {}", code),
                None => "Compiler terminated by signal".to_owned(),
            };
            let message = if diagnostics.is_empty() {
                status
            } else {
                format!("{}\n{}", diagnostics, status)
            };
            return CompileOutcome::failed(message);
        }

        if !output.is_file() {
            return CompileOutcome::failed(format!(
                "Compiler finished but produced no output file: {}",
                output.display()
            ));
        }

        CompileOutcome::Compiled {
            target: ExecTarget::executable(output.to_owned()),
            hash: Some(hash),
            diagnostics,
            skipped: false,
        }
    }
}
