use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::Level;
use url::Url;

use super::{ExpandBehavior, Observer, StopMode};
use crate::cancel::{CancelSource, CancelToken};
use crate::config::Config;
use crate::error::*;
use crate::problem::{
    BruteForce, CompilationSettings, FileWithHash, IoValue, Problem, RunResult, TestCase,
    TestCaseId,
};
use crate::scratch::Scratch;
use crate::storage::ProblemStore;
use crate::testing::{
    compare, Checker, CompileOutcome, Compiler, ExecTarget, Interactor, ProcessRunner, Recompile,
    RunOutcome,
};
use crate::verdict::Verdict;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BruteForceOutcome {
    /// The program disagreed with the brute-force solution; the input is saved as case `id`.
    Found {
        round: u64,
        id: TestCaseId,
        verdict: Verdict,
    },
    /// Stopped, or `max_rounds` reached, with every round accepted.
    NoDifference { rounds: u64 },
    Failed { message: String },
}

/// User-editable fields of a problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemDetails {
    pub name: String,
    pub url: Option<Url>,
    pub time_limit_ms: u64,
    pub memory_limit_mb: u64,
    pub compilation_settings: Option<CompilationSettings>,
}

impl ProblemDetails {
    pub fn of(p: &Problem) -> Self {
        Self {
            name: p.name.clone(),
            url: p.url.clone(),
            time_limit_ms: p.time_limit_ms,
            memory_limit_mb: p.memory_limit_mb,
            compilation_settings: p.compilation_settings.clone(),
        }
    }
}

/// New data for a test case; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseEdit {
    pub stdin: Option<IoValue>,
    pub answer: Option<IoValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseField {
    Stdin,
    Answer,
}

impl CaseField {
    fn of(self, tc: &TestCase) -> &IoValue {
        match self {
            CaseField::Stdin => &tc.stdin,
            CaseField::Answer => &tc.answer,
        }
    }

    fn of_mut(self, tc: &mut TestCase) -> &mut IoValue {
        match self {
            CaseField::Stdin => &mut tc.stdin,
            CaseField::Answer => &mut tc.answer,
        }
    }

    fn extension(self) -> &'static str {
        match self {
            CaseField::Stdin => "in",
            CaseField::Answer => "ans",
        }
    }
}

/// The judging context: configuration, toolchain, persistence and the current problem.
///
/// Cloning gives another handle to the same session, e.g. to call [`Session::stop`]
/// from a signal handler while [`Session::run_all`] is in flight.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

struct Inner {
    cfg: Config,
    scratch: Scratch,
    compiler: Compiler,
    runner: ProcessRunner,
    checker: Checker,
    interactor: Interactor,
    store: Box<dyn ProblemStore>,
    observer: Arc<dyn Observer>,
    problem: Mutex<Option<Problem>>,
    batch: Mutex<Option<Arc<Batch>>>,
}

/// Cancellation state of the run in flight.
struct Batch {
    all: CancelSource,
    current: Mutex<CancelSource>,
}

/// What a run works on, captured when it starts.
struct Plan {
    src_path: PathBuf,
    src: FileWithHash,
    checker: Option<FileWithHash>,
    interactor: Option<FileWithHash>,
    brute_force: Option<BruteForce>,
    settings: Option<CompilationSettings>,
    time_limit: Duration,
    ids: Vec<TestCaseId>,
}

impl Plan {
    fn of(p: &Problem, ids: Vec<TestCaseId>) -> Self {
        Self {
            src_path: p.src_path().to_owned(),
            src: p.src.clone(),
            checker: p.checker.clone(),
            interactor: p.interactor.clone(),
            brute_force: p.brute_force.clone(),
            settings: p.compilation_settings.clone(),
            time_limit: Duration::from_millis(p.time_limit_ms),
            ids,
        }
    }
}

/// Executables of one run.
struct Targets {
    program: ExecTarget,
    checker: Option<ExecTarget>,
    interactor: Option<ExecTarget>,
}

/// Helper programs built next to the program under test.
#[derive(Debug, Clone, Copy)]
enum Tool {
    Checker,
    Interactor,
    Generator,
    Reference,
}

impl Tool {
    fn name(self) -> &'static str {
        match self {
            Tool::Checker => "checker",
            Tool::Interactor => "interactor",
            Tool::Generator => "generator",
            Tool::Reference => "brute-force solution",
        }
    }

    fn of_plan(self, plan: &Plan) -> Option<&FileWithHash> {
        match self {
            Tool::Checker => plan.checker.as_ref(),
            Tool::Interactor => plan.interactor.as_ref(),
            Tool::Generator => plan.brute_force.as_ref().map(|b| &b.generator),
            Tool::Reference => plan.brute_force.as_ref().map(|b| &b.reference),
        }
    }

    fn of_problem(self, p: &mut Problem) -> Option<&mut FileWithHash> {
        match self {
            Tool::Checker => p.checker.as_mut(),
            Tool::Interactor => p.interactor.as_mut(),
            Tool::Generator => p.brute_force.as_mut().map(|b| &mut b.generator),
            Tool::Reference => p.brute_force.as_mut().map(|b| &mut b.reference),
        }
    }
}

/// What one brute-force round ended with.
enum Round {
    Same,
    Stopped,
    Differs(TestCase),
}

/// Clears the batch slot when the run ends, however it ends.
struct BatchGuard<'a> {
    slot: &'a Mutex<Option<Arc<Batch>>>,
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        *lock(self.slot) = None;
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Batch {
    fn new() -> Self {
        Self {
            all: CancelSource::new(),
            current: Mutex::new(CancelSource::new()),
        }
    }

    /// A fresh token for the next step. Already cancelled if the whole batch is.
    fn next_token(&self) -> CancelToken {
        let mut cur = lock(&self.current);
        *cur = CancelSource::new();
        if self.all.is_cancelled() {
            cur.cancel();
        }
        cur.token()
    }

    fn stop(&self, mode: StopMode) {
        if mode == StopMode::All {
            self.all.cancel();
        }
        lock(&self.current).cancel();
    }
}

impl Session {
    pub fn new(cfg: Config, store: Box<dyn ProblemStore>, observer: Arc<dyn Observer>) -> Self {
        let scratch = Scratch::new(cfg.cache_dir());
        let compiler = Compiler::new(cfg.compile.clone(), &scratch);
        let runner = ProcessRunner::new(cfg.run.time_addition());
        let checker = Checker::new(cfg.run.checker_time_limit());
        let interactor = Interactor::new(cfg.run.time_addition());
        Self {
            inner: Arc::new(Inner {
                cfg,
                scratch,
                compiler,
                runner,
                checker,
                interactor,
                store,
                observer,
                problem: Mutex::new(None),
                batch: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.cfg
    }

    pub fn scratch(&self) -> &Scratch {
        &self.inner.scratch
    }

    /// A snapshot of the current problem.
    pub fn problem(&self) -> Option<Problem> {
        lock(&self.inner.problem).clone()
    }

    pub fn is_running(&self) -> bool {
        lock(&self.inner.batch).is_some()
    }

    /// Compiles, then judges every enabled case in order.
    pub async fn run_all(&self, recompile: Recompile) {
        self.inner.run_batch(None, recompile).await
    }

    /// Same pipeline as [`Self::run_all`] for a single case (even a disabled one).
    pub async fn run_one(&self, id: TestCaseId, recompile: Recompile) {
        self.inner.run_batch(Some(id), recompile).await
    }

    /// Feeds generated inputs to the program and to the brute-force solution until the
    /// program's verdict is not AC, `max_rounds` rounds pass or the run is stopped.
    /// The input that told them apart is added as a new case.
    pub async fn run_brute_force(&self, recompile: Recompile, max_rounds: Option<u64>) -> BruteForceOutcome {
        let outcome = self.inner.brute_force(recompile, max_rounds).await;
        match &outcome {
            BruteForceOutcome::Found { round, .. } => self
                .inner
                .notify(Level::Info, &format!("Found a difference in round {}", round)),
            BruteForceOutcome::NoDifference { rounds } => self
                .inner
                .notify(Level::Info, &format!("No difference in {} round(s)", rounds)),
            BruteForceOutcome::Failed { message } => self.inner.warn(message),
        }
        outcome
    }

    pub fn set_brute_force(&self, generator: PathBuf, reference: PathBuf) -> bool {
        self.inner
            .edit(|p, _| {
                p.brute_force = Some(BruteForce {
                    generator: FileWithHash::new(generator),
                    reference: FileWithHash::new(reference),
                });
                Ok(())
            })
            .is_some()
    }

    pub fn clear_brute_force(&self) -> bool {
        self.inner
            .edit(|p, _| {
                p.brute_force = None;
                Ok(())
            })
            .is_some()
    }

    /// Aborts the run in flight. With nothing running, cases stuck in a transient
    /// verdict are rejected.
    pub fn stop(&self, mode: StopMode) {
        let batch = lock(&self.inner.batch).clone();
        match batch {
            Some(b) => {
                log::info!("Stopping ({:?})", mode);
                b.stop(mode);
            }
            None => self.inner.reject_stuck_cases(),
        }
    }

    /// Creates a problem for `src`, or loads it if one is already saved.
    pub fn create_problem(&self, src: impl Into<PathBuf>) -> Result<()> {
        let src = src.into();
        if self.load_problem(&src)? {
            self.inner.notify(
                Level::Info,
                &format!("Loaded existing problem for {}", src.display()),
            );
            return Ok(());
        }
        let problem = Problem::new(src, &self.inner.cfg.problem);
        log::info!("Created problem '{}'", problem.name);
        self.inner.replace_problem(Some(problem), true);
        Ok(())
    }

    /// Returns false if nothing is saved for `src`.
    pub fn load_problem(&self, src: impl AsRef<Path>) -> Result<bool> {
        let src = src.as_ref();
        let Some(mut problem) = self
            .inner
            .store
            .load(src)
            .with_context(|| format!("Failed to load problem for {}", src.display()))?
        else {
            return Ok(false);
        };
        let max_inline = self.inner.cfg.problem.max_inline_len;
        for tc in problem.cases_mut() {
            // left over from an interrupted run
            if tc.is_running() {
                tc.set_verdict(Verdict::RJ);
            }
            let Some(res) = tc.result.as_mut() else {
                continue;
            };
            for v in [&mut res.stdout, &mut res.stderr] {
                if let Err(e) = v.inline_small(&self.inner.scratch, max_inline) {
                    log::warn!("Keeping saved output as is: {:#}", e);
                }
            }
        }
        self.inner.replace_problem(Some(problem), false);
        Ok(true)
    }

    pub fn close_problem(&self) {
        self.stop(StopMode::All);
        self.inner.replace_problem(None, false);
    }

    /// Deletes the saved data of the current problem and closes it.
    pub fn delete_problem(&self) -> Result<bool> {
        self.stop(StopMode::All);
        let Some(problem) = lock(&self.inner.problem).take() else {
            self.inner.warn("No problem is loaded");
            return Ok(false);
        };
        for (_, tc) in problem.iter_ordered() {
            tc.release(&self.inner.scratch);
        }
        self.inner.observer.on_problem_change(None);
        self.inner
            .store
            .delete(problem.src_path())
            .with_context(|| format!("Failed to delete problem '{}'", problem.name))
    }

    pub fn edit_details(&self, details: ProblemDetails) -> bool {
        self.inner
            .edit(|p, _| {
                if details.time_limit_ms == 0 {
                    return Err("Time limit must be positive".to_owned());
                }
                p.name = details.name;
                p.url = details.url;
                p.time_limit_ms = details.time_limit_ms;
                p.memory_limit_mb = details.memory_limit_mb;
                p.compilation_settings = details.compilation_settings;
                Ok(())
            })
            .is_some()
    }

    pub fn set_checker(&self, checker: Option<PathBuf>) -> bool {
        self.inner
            .edit(|p, _| {
                p.checker = checker.map(FileWithHash::new);
                Ok(())
            })
            .is_some()
    }

    pub fn set_interactor(&self, interactor: Option<PathBuf>) -> bool {
        self.inner
            .edit(|p, _| {
                p.interactor = interactor.map(FileWithHash::new);
                Ok(())
            })
            .is_some()
    }

    pub fn add_case(&self, tc: TestCase) -> Option<TestCaseId> {
        self.inner.edit(|p, _| Ok(p.add_case(tc)))
    }

    /// Adds a batch of cases, replacing the existing ones if `problem.clear_before_load` is set.
    pub fn add_cases(&self, cases: Vec<TestCase>) -> Option<Vec<TestCaseId>> {
        let clear = self.inner.cfg.problem.clear_before_load;
        self.inner.edit(|p, scratch| {
            if clear {
                p.clear_cases().iter().for_each(|tc| tc.release(scratch));
            }
            Ok(p.add_cases(cases, false))
        })
    }

    pub fn update_case(&self, id: TestCaseId, edit: CaseEdit) -> bool {
        self.inner
            .edit_case(id, |tc, scratch| {
                if let Some(stdin) = edit.stdin {
                    std::mem::replace(&mut tc.stdin, stdin).release(scratch);
                }
                if let Some(answer) = edit.answer {
                    std::mem::replace(&mut tc.answer, answer).release(scratch);
                }
            })
            .is_some()
    }

    pub fn toggle_disable(&self, id: TestCaseId) -> bool {
        self.inner
            .edit_case(id, |tc, _| tc.disabled = !tc.disabled)
            .is_some()
    }

    pub fn toggle_expand(&self, id: TestCaseId) -> bool {
        self.inner
            .edit_case(id, |tc, _| tc.expanded = !tc.expanded)
            .is_some()
    }

    pub fn delete_case(&self, id: TestCaseId) -> bool {
        self.inner
            .edit(|p, scratch| match p.remove_case(id) {
                Some(tc) => {
                    tc.release(scratch);
                    Ok(())
                }
                None => Err(format!("Unknown test case: {}", id)),
            })
            .is_some()
    }

    pub fn move_case(&self, from: usize, to: usize) -> bool {
        self.inner
            .edit(|p, _| {
                if p.move_case(from, to) {
                    Ok(())
                } else {
                    Err(format!("Cannot move test case #{} to #{}", from + 1, to + 1))
                }
            })
            .is_some()
    }

    pub fn clear_result(&self, id: TestCaseId) -> bool {
        self.inner
            .edit_case(id, |tc, scratch| tc.clear_result(scratch))
            .is_some()
    }

    pub fn clear_all_results(&self) -> bool {
        self.inner
            .edit(|p, scratch| {
                p.cases_mut().for_each(|tc| tc.clear_result(scratch));
                Ok(())
            })
            .is_some()
    }

    /// Moves inline data of the case into a file next to the source, or reads a
    /// file-backed value back inline.
    pub async fn toggle_case_storage(&self, id: TestCaseId, field: CaseField) -> Result<bool> {
        let Some((src, index, mut value)) = self.inner.read(|p| {
            let tc = p.case(id).ok_or_else(|| format!("Unknown test case: {}", id))?;
            let index = p.index_of(id).unwrap_or_default();
            Ok((p.src_path().to_owned(), index, field.of(tc).clone()))
        }) else {
            return Ok(false);
        };

        match &value {
            IoValue::Inline(_) => {
                let path = Self::case_file_path(&src, index, field);
                value.to_file(&path).await?;
            }
            IoValue::File(_) => value.to_inline(&self.inner.scratch).await?,
        }

        Ok(self
            .inner
            .update_case_of(&src, id, |tc, _| *field.of_mut(tc) = value))
    }

    /// `<source dir>/<source stem>-<n>.in` (or `.ans`)
    fn case_file_path(src: &Path, index: usize, field: CaseField) -> PathBuf {
        let stem = src
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = format!("{}-{}.{}", stem, index + 1, field.extension());
        src.with_file_name(name)
    }
}

impl Inner {
    fn notify(&self, level: Level, msg: &str) {
        self.observer.notify(level, msg);
    }

    fn warn(&self, msg: &str) {
        self.notify(Level::Warn, msg);
    }

    /// Publishes and persists `p`. Persistence failures are reported, not returned.
    fn commit(&self, p: &Problem) {
        self.observer.on_problem_change(Some(p));
        if let Err(e) = self.store.save(p) {
            self.warn(&format!("Failed to save problem: {:#}", e));
        }
    }

    fn replace_problem(&self, problem: Option<Problem>, persist: bool) {
        let mut guard = lock(&self.problem);
        *guard = problem;
        match guard.as_ref() {
            Some(p) if persist => self.commit(p),
            p => self.observer.on_problem_change(p),
        }
    }

    /// Mutates the current problem and commits. `Err` is a warning and means nothing changed.
    fn edit<R>(
        &self,
        f: impl FnOnce(&mut Problem, &Scratch) -> std::result::Result<R, String>,
    ) -> Option<R> {
        let mut guard = lock(&self.problem);
        let Some(p) = guard.as_mut() else {
            self.warn("No problem is loaded");
            return None;
        };
        match f(p, &self.scratch) {
            Ok(r) => {
                self.commit(p);
                Some(r)
            }
            Err(msg) => {
                self.warn(&msg);
                None
            }
        }
    }

    fn edit_case<R>(&self, id: TestCaseId, f: impl FnOnce(&mut TestCase, &Scratch) -> R) -> Option<R> {
        self.edit(|p, scratch| match p.case_mut(id) {
            Some(tc) => Ok(f(tc, scratch)),
            None => Err(format!("Unknown test case: {}", id)),
        })
    }

    fn read<R>(&self, f: impl FnOnce(&Problem) -> std::result::Result<R, String>) -> Option<R> {
        let guard = lock(&self.problem);
        let Some(p) = guard.as_ref() else {
            self.warn("No problem is loaded");
            return None;
        };
        f(p).map_err(|msg| self.warn(&msg)).ok()
    }

    /// Applies `f` if `src` is still the current problem. Updates for a problem that
    /// was closed or replaced in the meantime are dropped.
    fn update_problem_of(&self, src: &Path, f: impl FnOnce(&mut Problem, &Scratch)) -> bool {
        let mut guard = lock(&self.problem);
        match guard.as_mut() {
            Some(p) if p.src_path() == src => {
                f(p, &self.scratch);
                self.commit(p);
                true
            }
            _ => {
                log::debug!("Problem {} is gone; dropping update", src.display());
                false
            }
        }
    }

    fn update_case_of(
        &self,
        src: &Path,
        id: TestCaseId,
        f: impl FnOnce(&mut TestCase, &Scratch),
    ) -> bool {
        let mut guard = lock(&self.problem);
        let Some(p) = guard.as_mut().filter(|p| p.src_path() == src) else {
            log::debug!("Problem {} is gone; dropping update", src.display());
            return false;
        };
        let Some(tc) = p.case_mut(id) else {
            return false;
        };
        f(tc, &self.scratch);
        self.commit(p);
        true
    }

    fn set_all(&self, plan: &Plan, ids: &[TestCaseId], make: impl Fn() -> RunResult) {
        self.update_problem_of(&plan.src_path, |p, scratch| {
            for &id in ids {
                if let Some(tc) = p.case_mut(id) {
                    tc.set_result(make(), scratch);
                }
            }
        });
    }

    fn begin_batch(&self) -> Option<(Arc<Batch>, BatchGuard<'_>)> {
        let mut slot = lock(&self.batch);
        if slot.is_some() {
            return None;
        }
        let batch = Arc::new(Batch::new());
        *slot = Some(batch.clone());
        Some((batch, BatchGuard { slot: &self.batch }))
    }

    fn make_plan(&self, only: Option<TestCaseId>) -> Option<Plan> {
        let behavior = self.cfg.problem.expand_behavior;
        self.edit(|p, scratch| {
            let ids: Vec<_> = match only {
                Some(id) if p.case(id).is_some() => vec![id],
                Some(id) => return Err(format!("Unknown test case: {}", id)),
                None => p
                    .iter_ordered()
                    .filter(|(_, tc)| !tc.disabled)
                    .map(|(id, _)| id)
                    .collect(),
            };
            if ids.is_empty() {
                return Err("No test cases to run".to_owned());
            }
            for &id in &ids {
                if let Some(tc) = p.case_mut(id) {
                    tc.set_result(RunResult::new(Verdict::CP), scratch);
                    if behavior != ExpandBehavior::Same {
                        tc.expanded = false;
                    }
                }
            }
            Ok(Plan::of(p, ids))
        })
    }

    async fn run_batch(&self, only: Option<TestCaseId>, recompile: Recompile) {
        let Some((batch, _guard)) = self.begin_batch() else {
            self.warn("A run is already in progress");
            return;
        };
        let Some(plan) = self.make_plan(only) else {
            return;
        };

        let token = batch.next_token();
        match self.build(&plan, recompile, &token).await {
            Ok(targets) => {
                self.set_all(&plan, &plan.ids, || RunResult::new(Verdict::CPD));
                self.judge_all(&plan, &batch, &targets).await;
            }
            Err((verdict, msg)) => {
                self.set_all(&plan, &plan.ids, || RunResult::new(verdict).with_message(&msg));
            }
        }

        // nothing may stay transient once the run is over
        self.update_problem_of(&plan.src_path, |p, _| {
            for &id in &plan.ids {
                if let Some(tc) = p.case_mut(id).filter(|tc| tc.is_running()) {
                    tc.set_verdict(Verdict::RJ);
                }
            }
        });
    }

    /// Builds the program, the checker and the interactor.
    /// `Err` holds CE (RJ if cancelled) and the compiler message.
    async fn build(
        &self,
        plan: &Plan,
        recompile: Recompile,
        token: &CancelToken,
    ) -> std::result::Result<Targets, (Verdict, String)> {
        let (program, hash) = self
            .compile(&plan.src, plan.settings.as_ref(), recompile, token)
            .await?;
        self.update_problem_of(&plan.src_path, |p, _| p.src.hash = hash);

        Ok(Targets {
            program,
            checker: self.build_tool(plan, Tool::Checker, recompile, token).await?,
            interactor: self.build_tool(plan, Tool::Interactor, recompile, token).await?,
        })
    }

    /// `Ok(None)` when the problem has no such tool.
    async fn build_tool(
        &self,
        plan: &Plan,
        tool: Tool,
        recompile: Recompile,
        token: &CancelToken,
    ) -> std::result::Result<Option<ExecTarget>, (Verdict, String)> {
        let Some(file) = tool.of_plan(plan) else {
            return Ok(None);
        };
        let (target, hash) = self
            .compile(file, None, recompile, token)
            .await
            .map_err(|(verdict, msg)| (verdict, format!("Failed to compile {}: {}", tool.name(), msg)))?;
        self.update_problem_of(&plan.src_path, |p, _| {
            if let Some(f) = tool.of_problem(p).filter(|f| f.path == file.path) {
                f.hash = hash;
            }
        });
        Ok(Some(target))
    }

    async fn compile(
        &self,
        src: &FileWithHash,
        settings: Option<&CompilationSettings>,
        recompile: Recompile,
        token: &CancelToken,
    ) -> std::result::Result<(ExecTarget, Option<String>), (Verdict, String)> {
        match self.compiler.compile(src, settings, recompile, token).await {
            CompileOutcome::Compiled {
                target,
                hash,
                diagnostics,
                ..
            } => {
                if !diagnostics.is_empty() {
                    self.observer.on_compile_output(&diagnostics);
                }
                Ok((target, hash))
            }
            CompileOutcome::Failed { message, cancelled } => {
                self.observer.on_compile_output(&message);
                let verdict = if cancelled { Verdict::RJ } else { Verdict::CE };
                Err((verdict, message))
            }
        }
    }

    async fn judge_all(&self, plan: &Plan, batch: &Batch, targets: &Targets) {
        let behavior = self.cfg.problem.expand_behavior;
        let mut expanded_before = false;

        for (index, &id) in plan.ids.iter().enumerate() {
            if batch.all.is_cancelled() {
                self.set_all(plan, &plan.ids[index..], || RunResult::new(Verdict::SK));
                break;
            }
            let token = batch.next_token();

            let mut inputs = None;
            self.update_case_of(&plan.src_path, id, |tc, _| {
                inputs = Some((tc.stdin.clone(), tc.answer.clone()));
                tc.set_verdict(Verdict::JG);
            });
            let Some((stdin, answer)) = inputs else {
                log::debug!("Test case {} was removed during the run", id);
                continue;
            };

            let result = self
                .judge_case(plan, id, targets, &stdin, &answer, &token)
                .await
                .unwrap_or_else(|e| RunResult::new(Verdict::SE).with_message(format!("{:#}", e)));
            log::info!("Test case #{}: {}", index + 1, result.verdict);

            let expand = behavior.decide(result.verdict, index == 0, expanded_before);
            expanded_before |= expand == Some(true);
            self.update_case_of(&plan.src_path, id, |tc, scratch| {
                tc.set_result(result, scratch);
                if let Some(expand) = expand {
                    tc.expanded = expand;
                }
            });
        }
    }

    async fn judge_case(
        &self,
        plan: &Plan,
        id: TestCaseId,
        targets: &Targets,
        stdin: &IoValue,
        answer: &IoValue,
        token: &CancelToken,
    ) -> Result<RunResult> {
        let key = format!("{}/{}", plan.src_path.display(), id);
        let (outcome, judged) = match &targets.interactor {
            Some(interactor) => {
                let res = self
                    .interactor
                    .run(&key, &targets.program, interactor, stdin, &self.scratch, plan.time_limit, token)
                    .await?;
                (res.program, res.judged)
            }
            None => {
                let outcome = self
                    .runner
                    .run(&targets.program, stdin, plan.time_limit, token)
                    .await?;
                (outcome, None)
            }
        };

        let max_inline = self.cfg.problem.max_inline_len;
        let mut result = RunResult {
            verdict: outcome.verdict,
            elapsed_ms: Some(outcome.elapsed_ms()),
            stdout: IoValue::store(outcome.stdout.clone(), &self.scratch, max_inline, "stdout").await?,
            stderr: IoValue::store(outcome.stderr.clone(), &self.scratch, max_inline, "stderr").await?,
            messages: outcome.messages.clone(),
        };
        if outcome.verdict == Verdict::RJ {
            return Ok(result);
        }

        result.verdict = Verdict::JGD;
        self.update_case_of(&plan.src_path, id, |tc, scratch| {
            tc.set_result(result.clone(), scratch)
        });
        if outcome.verdict != Verdict::UKE {
            result.verdict = outcome.verdict;
            return Ok(result);
        }

        if outcome.elapsed > plan.time_limit {
            result.verdict = Verdict::TLE;
            return Ok(result);
        }

        self.update_case_of(&plan.src_path, id, |tc, _| tc.set_verdict(Verdict::CMP));

        result.verdict = match (judged, &targets.checker) {
            (Some(judged), _) => {
                result.messages.extend(judged.messages);
                judged.verdict
            }
            (None, Some(checker)) => {
                let v = self
                    .checker
                    .check(&key, checker, stdin, &result.stdout, answer, &self.scratch, token)
                    .await;
                result.messages.extend(v.messages);
                v.verdict
            }
            (None, None) => {
                let answer = answer.read_to_string().await?;
                compare(&outcome.stdout, &answer, &outcome.stderr, &self.cfg.compare)
            }
        };
        Ok(result)
    }

    async fn brute_force(&self, recompile: Recompile, max_rounds: Option<u64>) -> BruteForceOutcome {
        let failed = |message: String| BruteForceOutcome::Failed { message };
        let Some((batch, _guard)) = self.begin_batch() else {
            return failed("A run is already in progress".to_owned());
        };
        let plan = {
            let guard = lock(&self.problem);
            guard.as_ref().map(|p| Plan::of(p, Vec::new()))
        };
        let Some(plan) = plan else {
            return failed("No problem is loaded".to_owned());
        };
        if plan.brute_force.is_none() {
            return failed("Choose a generator and a brute-force solution first".to_owned());
        }

        let token = batch.next_token();
        let built = async {
            let targets = self.build(&plan, recompile, &token).await?;
            let generator = self.build_tool(&plan, Tool::Generator, recompile, &token).await?;
            let reference = self.build_tool(&plan, Tool::Reference, recompile, &token).await?;
            Ok::<_, (Verdict, String)>((targets, generator, reference))
        }
        .await;
        let (targets, generator, reference) = match built {
            Ok((targets, Some(generator), Some(reference))) => (targets, generator, reference),
            Ok(_) => return failed("Brute-force sources were removed".to_owned()),
            Err((_, msg)) => return failed(msg),
        };

        let mut rounds = 0;
        loop {
            if batch.all.is_cancelled() || max_rounds.map_or(false, |max| rounds >= max) {
                return BruteForceOutcome::NoDifference { rounds };
            }
            let token = batch.next_token();
            let round = match self
                .brute_force_round(&plan, &targets, &generator, &reference, &token)
                .await
            {
                Ok(round) => round,
                Err(e) => return failed(format!("{:#}", e)),
            };
            match round {
                Round::Same => rounds += 1,
                Round::Stopped => return BruteForceOutcome::NoDifference { rounds },
                Round::Differs(tc) => {
                    let verdict = tc.verdict().unwrap_or(Verdict::UKE);
                    let mut id = None;
                    self.update_problem_of(&plan.src_path, |p, _| id = Some(p.add_case(tc)));
                    return match id {
                        Some(id) => BruteForceOutcome::Found {
                            round: rounds + 1,
                            id,
                            verdict,
                        },
                        None => failed("Problem was closed during the run".to_owned()),
                    };
                }
            }
            log::debug!("Brute-force round {} passed", rounds);
        }
    }

    async fn brute_force_round(
        &self,
        plan: &Plan,
        targets: &Targets,
        generator: &ExecTarget,
        reference: &ExecTarget,
        token: &CancelToken,
    ) -> Result<Round> {
        let max_inline = self.cfg.problem.max_inline_len;

        let generated = self
            .runner
            .run(generator, &IoValue::default(), self.cfg.run.generator_time_limit(), token)
            .await?;
        if let Some(round) = Self::helper_failed("Generator", &generated)? {
            return Ok(round);
        }
        let stdin = IoValue::store(format!("{}\n", generated.stdout), &self.scratch, max_inline, "input").await?;

        let mut tc = TestCase::new(stdin, "");
        let res = async {
            let expected = self
                .runner
                .run(reference, &tc.stdin, self.cfg.run.brute_force_time_limit(), token)
                .await?;
            if let Some(round) = Self::helper_failed("Brute-force solution", &expected)? {
                return Ok(Some(round));
            }
            tc.answer = IoValue::store(format!("{}\n", expected.stdout), &self.scratch, max_inline, "answer").await?;
            tc.result = Some(
                self.judge_case(plan, TestCaseId::new(), targets, &tc.stdin, &tc.answer, token)
                    .await?,
            );
            Ok::<_, Error>(None)
        }
        .await;

        let verdict = match res {
            Ok(None) => tc.verdict(),
            Ok(Some(round)) => {
                tc.release(&self.scratch);
                return Ok(round);
            }
            Err(e) => {
                tc.release(&self.scratch);
                return Err(e);
            }
        };
        match verdict {
            Some(Verdict::AC) => {
                tc.release(&self.scratch);
                Ok(Round::Same)
            }
            Some(Verdict::RJ) => {
                tc.release(&self.scratch);
                Ok(Round::Stopped)
            }
            _ => {
                tc.expanded = true;
                Ok(Round::Differs(tc))
            }
        }
    }

    /// `Some(Stopped)` when the helper was cancelled; any other abnormal end is an error.
    fn helper_failed(name: &str, outcome: &RunOutcome) -> Result<Option<Round>> {
        match outcome.verdict {
            Verdict::UKE => Ok(None),
            Verdict::RJ => Ok(Some(Round::Stopped)),
            verdict => bail!("{} failed ({}): {}", name, verdict, outcome.messages.join("\n")),
        }
    }

    fn reject_stuck_cases(&self) {
        let mut guard = lock(&self.problem);
        let Some(p) = guard.as_mut() else {
            return;
        };
        let mut changed = false;
        for tc in p.cases_mut().filter(|tc| tc.is_running()) {
            tc.set_verdict(Verdict::RJ);
            changed = true;
        }
        if changed {
            self.commit(p);
        }
    }
}
