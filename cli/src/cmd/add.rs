use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use cpjudge_core::{IoValue, TestCase};

use crate::{observer::TerminalObserver, print_success, util};

use super::{GlobalArgs, SubcmdResult};

#[derive(Debug, clap::Args)]
pub struct Args {
    pub program_file: PathBuf,

    /// Input text of the new test case
    #[arg(short, long, conflicts_with_all = ["input_file", "dir"])]
    pub input: Option<String>,

    /// Expected output of the new test case
    #[arg(short, long, conflicts_with_all = ["answer_file", "dir"])]
    pub answer: Option<String>,

    /// Use this file as input instead of copying its content
    #[arg(long, conflicts_with = "dir")]
    pub input_file: Option<PathBuf>,

    #[arg(long, conflicts_with = "dir")]
    pub answer_file: Option<PathBuf>,

    /// Import every `<name>.in` with its `<name>.out` (or `.ans`) from a directory
    #[arg(short, long)]
    pub dir: Option<PathBuf>,
}

pub fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let program_file = util::program_file(&args.program_file)?;
    let session = global_args.open_session(Arc::new(TerminalObserver::new()))?;
    super::load_problem(&session, &program_file)?;

    if let Some(dir) = &args.dir {
        let cases = enumerate_case_files(dir)?;
        anyhow::ensure!(
            !cases.is_empty(),
            "No `*.in` files in {}",
            dir.to_string_lossy()
        );
        let n = cases.len();
        session
            .add_cases(cases)
            .context("Failed to add test cases")?;
        print_success!("Added {} test case(s) from {}", n, dir.to_string_lossy());
        return Ok(());
    }

    let stdin = value_of(&args.input, &args.input_file)?;
    let answer = value_of(&args.answer, &args.answer_file)?;
    session
        .add_case(TestCase::new(stdin, answer))
        .context("Failed to add test case")?;

    let n = session.problem().map(|p| p.len()).unwrap_or_default();
    print_success!("Added test case #{}", n);
    Ok(())
}

fn value_of(text: &Option<String>, file: &Option<PathBuf>) -> anyhow::Result<IoValue> {
    Ok(match (text, file) {
        (_, Some(path)) => IoValue::File(
            path.canonicalize()
                .with_context(|| format!("File not found: {}", path.display()))?,
        ),
        (Some(text), None) => text.as_str().into(),
        (None, None) => IoValue::default(),
    })
}

/// `<name>.in` paired with `<name>.out` or `<name>.ans`, sorted by file name.
/// An input without an answer gets an empty one.
fn enumerate_case_files(dir: &Path) -> anyhow::Result<Vec<TestCase>> {
    let dir = dir
        .canonicalize()
        .with_context(|| format!("Directory not found: {}", dir.display()))?;
    let mut inputs: Vec<PathBuf> = std::fs::read_dir(&dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().map_or(false, |ext| ext == "in"))
        .collect();
    inputs.sort();

    Ok(inputs
        .into_iter()
        .map(|input| {
            let answer = ["out", "ans"]
                .iter()
                .map(|ext| input.with_extension(ext))
                .find(|p| p.is_file())
                .map(IoValue::File)
                .unwrap_or_default();
            TestCase::new(IoValue::File(input), answer)
        })
        .collect())
}
