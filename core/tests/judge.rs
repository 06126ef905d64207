use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpjudge_core::config::{Config, LangConfig};
use cpjudge_core::judge::{BruteForceOutcome, CaseEdit, CaseField, ProblemDetails};
use cpjudge_core::problem::{RunResult, TestCase};
use cpjudge_core::storage::{FileStore, MemoryStore, ProblemStore};
use cpjudge_core::testing::Recompile;
use cpjudge_core::{IoValue, Observer, Problem, Session, StopMode, TestCaseId, Verdict};
use log::Level;
use tempfile::TempDir;

/// Copies `<src>` to `<out>` and logs each call next to itself.
const FAKE_CC: &str = r#"
echo "$@" >> "$(dirname "$0")/calls.log"
cp "$1" "$3" && chmod +x "$3"
"#;

/// Like `FAKE_CC`, but a source mentioning `bad` fails after writing a stale binary.
const HALF_CC: &str = r#"
echo "$@" >> "$(dirname "$0")/calls.log"
if grep -q bad "$1"; then
  printf '#!/bin/sh\necho stale\n' > "$3"
  chmod +x "$3"
  echo "main.sh: bad token" >&2
  exit 1
fi
cp "$1" "$3" && chmod +x "$3"
"#;

#[derive(Default)]
struct Recorder {
    snapshots: Mutex<Vec<Option<Problem>>>,
    compile_output: Mutex<Vec<String>>,
    notes: Mutex<Vec<(Level, String)>>,
}

impl Observer for Recorder {
    fn on_problem_change(&self, problem: Option<&Problem>) {
        self.snapshots.lock().unwrap().push(problem.cloned());
    }

    fn on_compile_output(&self, output: &str) {
        self.compile_output.lock().unwrap().push(output.to_owned());
    }

    fn notify(&self, level: Level, msg: &str) {
        self.notes.lock().unwrap().push((level, msg.to_owned()));
    }
}

impl Recorder {
    /// Verdicts the case went through, consecutive duplicates removed.
    fn history(&self, id: TestCaseId) -> Vec<Verdict> {
        let mut res: Vec<Verdict> = self
            .snapshots
            .lock()
            .unwrap()
            .iter()
            .filter_map(|p| p.as_ref()?.case(id)?.verdict())
            .collect();
        res.dedup();
        res
    }

    fn warnings(&self) -> Vec<String> {
        self.notes
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == Level::Warn)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

struct Env {
    dir: TempDir,
    session: Session,
    recorder: Arc<Recorder>,
    src: PathBuf,
}

fn config(dir: &Path) -> Config {
    let cc = dir.join("tools/fakecc");
    fsutil::write_with_mkdir(&cc, FAKE_CC).unwrap();

    let mut cfg = Config::default();
    cfg.cache.directory = Some(dir.join("cache"));
    cfg.compile.lang = vec![LangConfig {
        name: "Shell".into(),
        extensions: vec!["sh".into()],
        compiler: Some("/bin/sh".into()),
        args: vec![cc.to_string_lossy().into_owned()],
        runner: None,
        run_args: vec![],
    }];
    cfg.run.time_addition_ms = 100;
    cfg.problem.default_time_limit_ms = 2000;
    cfg
}

fn env_with(program: &str, tweak: impl FnOnce(&mut Config), store: Box<dyn ProblemStore>) -> Env {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path());
    tweak(&mut cfg);

    let src = dir.path().join("work/main.sh");
    fsutil::write_with_mkdir(&src, format!("#!/bin/sh\n{}\n", program)).unwrap();

    let recorder = Arc::new(Recorder::default());
    let session = Session::new(cfg, store, recorder.clone());
    session.create_problem(&src).unwrap();
    Env {
        dir,
        session,
        recorder,
        src,
    }
}

fn env(program: &str) -> Env {
    env_with(program, |_| {}, Box::new(MemoryStore::new()))
}

impl Env {
    fn add(&self, input: &str, answer: &str) -> TestCaseId {
        self.session.add_case(TestCase::new(input, answer)).unwrap()
    }

    fn problem(&self) -> Problem {
        self.session.problem().unwrap()
    }

    fn result(&self, id: TestCaseId) -> RunResult {
        self.problem().case(id).unwrap().result.clone().unwrap()
    }

    fn verdicts(&self) -> Vec<Verdict> {
        self.problem()
            .iter_ordered()
            .map(|(_, tc)| tc.verdict().unwrap_or(Verdict::UKE))
            .collect()
    }

    fn compile_calls(&self) -> usize {
        fsutil::read_to_string(self.dir.path().join("tools/calls.log"))
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }

    fn set_time_limit(&self, ms: u64) {
        let mut details = ProblemDetails::of(&self.problem());
        details.time_limit_ms = ms;
        assert!(self.session.edit_details(details));
    }

    fn assert_nothing_transient(&self) {
        for (id, tc) in self.problem().iter_ordered() {
            assert!(!tc.is_running(), "case {} is still {:?}", id, tc.verdict());
        }
    }

    async fn wait_for(&self, id: TestCaseId, verdict: Verdict) {
        let found = async {
            while self.session.problem().and_then(|p| p.case(id)?.verdict()) != Some(verdict) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), found)
            .await
            .unwrap_or_else(|_| panic!("case never reached {}", verdict));
    }
}

#[tokio::test]
async fn accepted_cases_go_through_every_state() {
    let e = env(r#"read a b; echo $((a + b))"#);
    let a = e.add("1 2\n", "3\n");
    let b = e.add("5 5\n", "10\n");

    e.session.run_all(Recompile::Auto).await;

    assert_eq!(e.verdicts(), vec![Verdict::AC, Verdict::AC]);
    use Verdict::*;
    assert_eq!(e.recorder.history(a), vec![CP, CPD, JG, JGD, CMP, AC]);
    assert_eq!(e.recorder.history(b), vec![CP, CPD, JG, JGD, CMP, AC]);

    let r = e.result(a);
    assert_eq!(r.stdout, IoValue::from("3"));
    assert!(r.elapsed_ms.is_some());
    e.assert_nothing_transient();
    assert!(!e.session.is_running());
}

#[tokio::test]
async fn second_run_reuses_the_binary() {
    let e = env("echo 1");
    e.add("", "1");

    e.session.run_all(Recompile::Auto).await;
    e.session.run_all(Recompile::Auto).await;
    assert_eq!(e.compile_calls(), 1);
    assert!(e.problem().src.hash.is_some());

    e.session.run_all(Recompile::Always).await;
    assert_eq!(e.compile_calls(), 2);

    // editing the source invalidates the cache
    fsutil::write(&e.src, "#!/bin/sh\necho 2\n").unwrap();
    e.session.run_all(Recompile::Auto).await;
    assert_eq!(e.compile_calls(), 3);
    assert_eq!(e.verdicts(), vec![Verdict::WA]);
}

#[tokio::test]
async fn compile_error_marks_every_case() {
    let e = env_with(
        "echo 1",
        |cfg| cfg.compile.lang[0].args = vec!["-c".into(), "echo 'main.sh:1: syntax error' >&2; exit 1".into()],
        Box::new(MemoryStore::new()),
    );
    let a = e.add("", "1");
    e.add("", "1");

    e.session.run_all(Recompile::Auto).await;

    assert_eq!(e.verdicts(), vec![Verdict::CE, Verdict::CE]);
    assert!(e.result(a).message().contains("main.sh:1: syntax error"));
    let out = e.recorder.compile_output.lock().unwrap().clone();
    assert_eq!(out.len(), 1);
    assert!(out[0].contains("syntax error"));
    assert_eq!(e.recorder.history(a), vec![Verdict::CP, Verdict::CE]);
}

#[tokio::test]
async fn failed_build_is_not_reused_after_revert() {
    let e = env_with(
        "echo 1",
        |cfg| fsutil::write(&cfg.compile.lang[0].args[0], HALF_CC).unwrap(),
        Box::new(MemoryStore::new()),
    );
    e.add("", "1");

    e.session.run_all(Recompile::Auto).await;
    assert_eq!(e.verdicts(), vec![Verdict::AC]);

    fsutil::write(&e.src, "#!/bin/sh\necho bad\n").unwrap();
    e.session.run_all(Recompile::Auto).await;
    assert_eq!(e.verdicts(), vec![Verdict::CE]);

    fsutil::write(&e.src, "#!/bin/sh\necho 1\n").unwrap();
    e.session.run_all(Recompile::Auto).await;
    assert_eq!(e.compile_calls(), 3);
    assert_eq!(e.verdicts(), vec![Verdict::AC]);
    assert_eq!(e.result(e.problem().id_at(0).unwrap()).stdout, IoValue::from("1"));
}

#[tokio::test]
async fn one_bad_case_does_not_affect_the_others() {
    let e = env(
        r#"read x
case "$x" in
  ok) echo 42 ;;
  wrong) echo 41 ;;
  crash) echo 42; exit 3 ;;
  slow) exec sleep 5 ;;
  spaces) printf '4  2\n' ;;
  stderr) echo 42; echo debug >&2 ;;
esac"#,
    );
    e.set_time_limit(300);
    let ids: Vec<_> = ["ok", "wrong", "crash", "slow", "spaces", "stderr"]
        .iter()
        .map(|x| e.add(&format!("{}\n", x), if *x == "spaces" { "4 2\n" } else { "42\n" }))
        .collect();

    e.session.run_all(Recompile::Auto).await;

    use Verdict::*;
    assert_eq!(e.verdicts(), vec![AC, WA, RE, TLE, PE, AC]);
    assert_eq!(e.result(ids[2]).message(), "Process exited with code 3");
    assert_eq!(e.result(ids[3]).message(), "Killed due to timeout");
    assert_eq!(e.result(ids[5]).stderr, IoValue::from("debug"));
    assert_eq!(e.recorder.history(ids[2]), vec![CP, CPD, JG, JGD, RE]);
    assert_eq!(e.recorder.history(ids[3]), vec![CP, CPD, JG, JGD, TLE]);
    e.assert_nothing_transient();
}

#[tokio::test]
async fn only_first_failure_is_expanded() {
    let e = env(r#"read x; echo "$x""#);
    let ids = [e.add("1", "1"), e.add("2", "0"), e.add("3", "0"), e.add("4", "4")];

    e.session.run_all(Recompile::Auto).await;

    let p = e.problem();
    let expanded: Vec<_> = ids.iter().map(|&id| p.case(id).unwrap().expanded).collect();
    assert_eq!(expanded, vec![false, true, false, false]);
}

#[tokio::test]
async fn reported_time_over_the_limit_is_tle() {
    let e = env(r#"echo 1; printf '%s' '-----RUN DATA STARTS-----{"time": 5000}-----' >&2"#);
    e.set_time_limit(1000);
    let id = e.add("", "1");

    e.session.run_all(Recompile::Auto).await;

    let r = e.result(id);
    assert_eq!(r.verdict, Verdict::TLE);
    assert_eq!(r.elapsed_ms, Some(5000));
    assert_eq!(r.stderr, IoValue::from(""));
}

#[tokio::test]
async fn checker_exit_codes() {
    let e = env("cat");
    let checker = e.dir.path().join("work/chk.sh");
    fsutil::write(&checker, "#!/bin/sh\necho \"checked $1\" >&2\nexit $(cat \"$2\")\n").unwrap();
    assert!(e.session.set_checker(Some(checker)));

    let ids: Vec<_> = (0..=6).map(|code| e.add(&code.to_string(), "")).collect();
    e.session.run_all(Recompile::Auto).await;

    use Verdict::*;
    assert_eq!(e.verdicts(), vec![AC, WA, PE, SE, WA, PC, SE]);
    assert!(e.result(ids[4]).messages.contains(&"Unexpected EOF".to_owned()));
    assert!(e.result(ids[0]).message().starts_with("checked "));
    assert!(e.problem().checker.unwrap().hash.is_some());
    // program + checker
    assert_eq!(e.compile_calls(), 2);
}

#[tokio::test]
async fn interactor_decides_the_verdict() {
    let e = env(r#"read x; [ "$x" = 5 ] && echo 11 || echo $((x * 2))"#);
    let interactor = e.dir.path().join("work/inter.sh");
    fsutil::write(
        &interactor,
        "#!/bin/sh\nread n < \"$1\"\necho \"$n\"\nread got\necho \"$got\" > \"$2\"\n[ \"$got\" = \"$((n * 2))\" ] || { echo \"wanted $((n * 2))\" >&2; exit 1; }\n",
    )
    .unwrap();
    assert!(e.session.set_interactor(Some(interactor)));

    let ok = e.add("21\n", "");
    let wrong = e.add("5\n", "ignored");
    e.session.run_all(Recompile::Auto).await;

    use Verdict::*;
    assert_eq!(e.verdicts(), vec![AC, WA]);
    assert_eq!(e.result(ok).stdout, IoValue::from("42"));
    assert_eq!(e.result(wrong).message(), "wanted 10");
    assert_eq!(e.recorder.history(ok), vec![CP, CPD, JG, JGD, CMP, AC]);
    assert!(e.problem().interactor.unwrap().hash.is_some());
    // program + interactor
    assert_eq!(e.compile_calls(), 2);

    assert!(e.session.set_interactor(None));
    e.session.run_all(Recompile::Auto).await;
    assert_eq!(e.verdicts(), vec![WA, WA]);
}

/// Generator printing 1, 2, 3, ... on successive runs, and a reference doubling its input.
fn with_brute_force(e: &Env) {
    let counter = e.dir.path().join("round");
    let generator = e.dir.path().join("work/gen.sh");
    fsutil::write(
        &generator,
        format!(
            "#!/bin/sh\nn=$(( $(cat '{0}' 2>/dev/null || echo 0) + 1 ))\necho $n > '{0}'\necho $n\n",
            counter.display()
        ),
    )
    .unwrap();
    let reference = e.dir.path().join("work/slow.sh");
    fsutil::write(&reference, "#!/bin/sh\nread x\necho $((x * 2))\n").unwrap();
    assert!(e.session.set_brute_force(generator, reference));
}

#[tokio::test]
async fn brute_force_saves_the_first_differing_input() {
    let e = env(r#"read x; [ "$x" = 3 ] && echo 5 || echo $((x * 2))"#);
    e.add("1\n", "2\n");
    with_brute_force(&e);

    let outcome = e.session.run_brute_force(Recompile::Auto, None).await;
    let BruteForceOutcome::Found { round, id, verdict } = outcome else {
        panic!("unexpected outcome: {:?}", outcome)
    };
    assert_eq!((round, verdict), (3, Verdict::WA));

    let p = e.problem();
    assert_eq!(p.len(), 2);
    assert_eq!(p.index_of(id), Some(1));
    let tc = p.case(id).unwrap();
    assert_eq!(tc.stdin, IoValue::from("3\n"));
    assert_eq!(tc.answer, IoValue::from("6\n"));
    assert_eq!(tc.result.as_ref().unwrap().stdout, IoValue::from("5"));
    assert!(tc.expanded);
    // program + generator + brute-force solution
    assert_eq!(e.compile_calls(), 3);
    assert!(p.brute_force.unwrap().generator.hash.is_some());
    assert!(!e.session.is_running());
}

#[tokio::test]
async fn brute_force_without_difference_adds_nothing() {
    let e = env_with("read x; echo $((x * 2))", |cfg| cfg.problem.max_inline_len = 0, Box::new(MemoryStore::new()));
    with_brute_force(&e);

    let outcome = e.session.run_brute_force(Recompile::Auto, Some(4)).await;
    assert_eq!(outcome, BruteForceOutcome::NoDifference { rounds: 4 });
    assert!(e.problem().is_empty());
    let leftovers = std::fs::read_dir(e.session.scratch().io_dir()).unwrap().count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn brute_force_reports_setup_problems() {
    let e = env("cat");
    let outcome = e.session.run_brute_force(Recompile::Auto, Some(1)).await;
    assert!(matches!(outcome, BruteForceOutcome::Failed { .. }));
    assert!(e.recorder.warnings()[0].contains("brute-force solution"));

    with_brute_force(&e);
    fsutil::write(e.dir.path().join("work/gen.sh"), "#!/bin/sh\necho oops >&2\nexit 2\n").unwrap();
    let outcome = e.session.run_brute_force(Recompile::Auto, Some(1)).await;
    let BruteForceOutcome::Failed { message } = outcome else {
        panic!("unexpected outcome: {:?}", outcome)
    };
    assert!(message.starts_with("Generator failed (RE)"), "{}", message);
    assert!(e.problem().is_empty());
}

#[tokio::test]
async fn brute_force_can_be_stopped() {
    let e = env("read x; echo $((x * 2))");
    with_brute_force(&e);

    let session = e.session.clone();
    let run = tokio::spawn(async move { session.run_brute_force(Recompile::Auto, None).await });
    while !e.dir.path().join("round").exists() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    e.session.stop(StopMode::All);

    let outcome = tokio::time::timeout(Duration::from_secs(5), run).await.unwrap().unwrap();
    assert!(matches!(outcome, BruteForceOutcome::NoDifference { .. }), "{:?}", outcome);
    assert!(e.problem().is_empty());
    assert!(!e.session.is_running());
}

#[tokio::test]
async fn stop_all_rejects_current_and_skips_the_rest() {
    let e = env("exec sleep 5");
    e.set_time_limit(10_000);
    let ids: Vec<_> = (0..5).map(|_| e.add("", "")).collect();

    let session = e.session.clone();
    let run = tokio::spawn(async move { session.run_all(Recompile::Auto).await });

    e.wait_for(ids[0], Verdict::JG).await;
    let stopped_at = std::time::Instant::now();
    e.session.stop(StopMode::All);
    run.await.unwrap();

    assert!(stopped_at.elapsed() < Duration::from_secs(3));
    use Verdict::*;
    assert_eq!(e.verdicts(), vec![RJ, SK, SK, SK, SK]);
    assert_eq!(e.result(ids[0]).message(), "Aborted by user");
    e.assert_nothing_transient();
    assert!(!e.session.is_running());
}

#[tokio::test]
async fn stop_during_the_second_case_keeps_the_first() {
    let e = env(r#"read x; [ "$x" = fast ] && { echo fast; exit 0; }; exec sleep 5"#);
    e.set_time_limit(10_000);
    let mut ids = vec![e.add("fast\n", "fast\n")];
    ids.extend((0..4).map(|_| e.add("slow\n", "")));

    let session = e.session.clone();
    let run = tokio::spawn(async move { session.run_all(Recompile::Auto).await });

    e.wait_for(ids[1], Verdict::JG).await;
    e.session.stop(StopMode::All);
    run.await.unwrap();

    use Verdict::*;
    assert_eq!(e.verdicts(), vec![AC, RJ, SK, SK, SK]);
    assert_eq!(e.result(ids[0]).stdout, IoValue::from("fast"));
    assert_eq!(e.result(ids[1]).message(), "Aborted by user");
    assert_eq!(e.recorder.history(ids[0]).last(), Some(&AC));
    e.assert_nothing_transient();
}

#[tokio::test]
async fn stop_current_only_continues_the_batch() {
    let e = env(r#"read x; [ "$x" = slow ] && exec sleep 5; echo "$x""#);
    e.set_time_limit(10_000);
    let slow = e.add("slow\n", "slow\n");
    e.add("fast\n", "fast\n");

    let session = e.session.clone();
    let run = tokio::spawn(async move { session.run_all(Recompile::Auto).await });

    e.wait_for(slow, Verdict::JG).await;
    e.session.stop(StopMode::CurrentOnly);
    run.await.unwrap();

    assert_eq!(e.verdicts(), vec![Verdict::RJ, Verdict::AC]);
}

#[tokio::test]
async fn concurrent_run_is_rejected() {
    let e = env("exec sleep 5");
    e.set_time_limit(10_000);
    let id = e.add("", "");

    let session = e.session.clone();
    let run = tokio::spawn(async move { session.run_all(Recompile::Auto).await });
    e.wait_for(id, Verdict::JG).await;

    e.session.run_all(Recompile::Auto).await;
    assert!(e
        .recorder
        .warnings()
        .contains(&"A run is already in progress".to_owned()));
    assert_eq!(e.problem().case(id).unwrap().verdict(), Some(Verdict::JG));

    e.session.stop(StopMode::All);
    run.await.unwrap();
    assert_eq!(e.verdicts(), vec![Verdict::RJ]);
}

#[tokio::test]
async fn stop_without_a_run_rejects_stuck_cases() {
    let e = env("echo 1");
    let mut tc = TestCase::new("", "1");
    tc.result = Some(RunResult::new(Verdict::JG));
    let stuck = e.session.add_case(tc).unwrap();
    let done = e.add("", "1");
    e.session.run_one(done, Recompile::Auto).await;

    e.session.stop(StopMode::All);
    assert_eq!(e.problem().case(stuck).unwrap().verdict(), Some(Verdict::RJ));
    assert_eq!(e.problem().case(done).unwrap().verdict(), Some(Verdict::AC));
}

#[tokio::test]
async fn run_one_touches_a_single_case() {
    let e = env("echo 1");
    let a = e.add("", "1");
    let b = e.add("", "1");

    e.session.run_one(b, Recompile::Auto).await;
    assert_eq!(e.problem().case(a).unwrap().result, None);
    assert_eq!(e.problem().case(b).unwrap().verdict(), Some(Verdict::AC));

    e.session.run_one(TestCaseId::new(), Recompile::Auto).await;
    assert!(e.recorder.warnings().iter().any(|w| w.starts_with("Unknown test case")));
}

#[tokio::test]
async fn disabled_cases_are_not_run() {
    let e = env("echo 1");
    let a = e.add("", "1");
    let b = e.add("", "1");
    assert!(e.session.toggle_disable(a));

    e.session.run_all(Recompile::Auto).await;
    assert_eq!(e.problem().case(a).unwrap().result, None);
    assert_eq!(e.problem().case(b).unwrap().verdict(), Some(Verdict::AC));
}

#[tokio::test]
async fn large_output_is_kept_in_scratch_and_released_on_rerun() {
    let e = env_with("echo 0123456789", |cfg| cfg.problem.max_inline_len = 4, Box::new(MemoryStore::new()));
    let id = e.add("", "0123456789");

    e.session.run_all(Recompile::Auto).await;
    let r = e.result(id);
    assert_eq!(r.verdict, Verdict::AC);
    let IoValue::File(path) = r.stdout.clone() else {
        panic!("expected file-backed stdout: {:?}", r.stdout)
    };
    assert!(e.session.scratch().owns(&path));
    assert_eq!(fsutil::read_to_string(&path).unwrap(), "0123456789");

    e.session.run_all(Recompile::Auto).await;
    assert!(!path.exists());

    assert!(e.session.clear_all_results());
    assert_eq!(std::fs::read_dir(e.session.scratch().io_dir()).unwrap().count(), 0);
}

#[tokio::test]
async fn problem_survives_a_new_session() {
    let dir = tempfile::tempdir().unwrap();
    let e = env_with("echo 1", |_| {}, Box::new(FileStore::new(".cpjudge")));
    e.add("", "1");
    e.add("", "2");
    e.session.run_all(Recompile::Auto).await;
    let before = e.problem();

    let again = Session::new(
        config(dir.path()),
        Box::new(FileStore::new(".cpjudge")),
        Arc::new(Recorder::default()),
    );
    assert!(again.load_problem(&e.src).unwrap());
    assert_eq!(again.problem(), Some(before));
}

#[tokio::test]
async fn small_saved_output_is_inlined_on_load() {
    let e = env_with(
        "echo 0123456789",
        |cfg| cfg.problem.max_inline_len = 4,
        Box::new(FileStore::new(".cpjudge")),
    );
    let id = e.add("", "0123456789");
    e.session.run_all(Recompile::Auto).await;
    let IoValue::File(path) = e.result(id).stdout else {
        panic!("expected file-backed stdout")
    };

    let again = Session::new(
        config(e.dir.path()),
        Box::new(FileStore::new(".cpjudge")),
        Arc::new(Recorder::default()),
    );
    assert!(again.load_problem(&e.src).unwrap());
    let r = again.problem().unwrap().case(id).unwrap().result.clone().unwrap();
    assert_eq!(r.verdict, Verdict::AC);
    assert_eq!(r.stdout, IoValue::from("0123456789"));
    assert!(!path.exists());
}

#[tokio::test]
async fn editing_operations() {
    let e = env("cat");
    let a = e.add("a\n", "a\n");
    let b = e.add("b\n", "b\n");
    let c = e.add("c\n", "c\n");

    assert!(e.session.move_case(2, 0));
    assert_eq!(e.problem().order(), &[c, a, b]);
    assert!(!e.session.move_case(3, 0));

    assert!(e.session.update_case(
        a,
        CaseEdit {
            answer: Some("x\n".into()),
            ..Default::default()
        }
    ));
    e.session.run_all(Recompile::Auto).await;
    assert_eq!(e.verdicts(), vec![Verdict::AC, Verdict::WA, Verdict::AC]);

    assert!(e.session.clear_result(a));
    assert_eq!(e.problem().case(a).unwrap().result, None);

    assert!(e.session.delete_case(b));
    assert!(!e.session.delete_case(b));
    assert_eq!(e.problem().order(), &[c, a]);

    let warnings = e.recorder.warnings();
    assert!(warnings.iter().any(|w| w.starts_with("Cannot move")));
    assert!(warnings.iter().any(|w| w.starts_with("Unknown test case")));
}

#[tokio::test]
async fn case_storage_can_be_toggled() {
    let e = env("cat");
    let id = e.add("1 2\n", "1 2\n");

    assert!(e.session.toggle_case_storage(id, CaseField::Stdin).await.unwrap());
    let stdin = e.problem().case(id).unwrap().stdin.clone();
    assert_eq!(stdin, IoValue::File(e.dir.path().join("work/main-1.in")));

    e.session.run_all(Recompile::Auto).await;
    assert_eq!(e.verdicts(), vec![Verdict::AC]);

    assert!(e.session.toggle_case_storage(id, CaseField::Stdin).await.unwrap());
    assert_eq!(e.problem().case(id).unwrap().stdin, IoValue::from("1 2\n"));
}

#[tokio::test]
async fn add_cases_replaces_when_configured() {
    let e = env("cat");
    let old = e.add("old", "old");

    let ids = e
        .session
        .add_cases(vec![TestCase::new("1", "1"), TestCase::new("2", "2")])
        .unwrap();
    assert_eq!(e.problem().order(), ids.as_slice());
    assert!(e.problem().case(old).is_none());
}

#[tokio::test]
async fn operations_without_a_problem_only_warn() {
    let e = env("cat");
    e.session.close_problem();
    assert!(e.session.problem().is_none());

    assert!(e.session.add_case(TestCase::new("", "")).is_none());
    e.session.run_all(Recompile::Auto).await;
    assert!(!e.session.clear_all_results());
    assert!(e
        .recorder
        .warnings()
        .iter()
        .all(|w| w == "No problem is loaded"));
    assert_eq!(e.recorder.snapshots.lock().unwrap().last(), Some(&None));
}

#[tokio::test]
async fn delete_problem_removes_saved_data() {
    let e = env_with("cat", |_| {}, Box::new(FileStore::new(".cpjudge")));
    e.add("", "");
    let saved = e.dir.path().join("work/.cpjudge/main.sh.bin");
    assert!(saved.is_file());

    assert!(e.session.delete_problem().unwrap());
    assert!(!saved.exists());
    assert!(e.session.problem().is_none());
    assert!(!e.session.load_problem(&e.src).unwrap());
}
