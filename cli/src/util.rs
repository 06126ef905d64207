use std::{
    collections::HashSet,
    hash::Hash,
    path::{Path, PathBuf},
    process::exit,
};

use anyhow::Context as _;
use cpjudge_core::{IoValue, Problem, TestCaseId};

pub fn dedup<T>(mut v: Vec<T>) -> Vec<T>
where
    T: Hash + Eq + Copy,
{
    let mut set = HashSet::new();
    v.retain(|&x| set.insert(x));
    v
}

pub fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|e| {
        eprintln!("Failed to get current dir: {}", e);
        exit(1);
    })
}

pub fn replace_homedir_to_tilde(path: impl Into<PathBuf>) -> PathBuf {
    let path = path.into();
    let Some(home_dir) = ::dirs::home_dir() else {
        return path
    };
    path.strip_prefix(home_dir)
        .map(|path| Path::new("~").join(path))
        .unwrap_or(path)
}

/// Absolute path of an existing program file.
pub fn program_file(path: impl AsRef<Path>) -> anyhow::Result<PathBuf> {
    let path = path.as_ref();
    let abs = path
        .canonicalize()
        .with_context(|| format!("Program file not found: {}", path.display()))?;
    anyhow::ensure!(abs.is_file(), "Not a file: {}", path.display());
    Ok(abs)
}

/// Resolves 1-based case numbers as shown by `cpjudge list`.
pub fn case_ids(problem: &Problem, numbers: &[usize]) -> anyhow::Result<Vec<TestCaseId>> {
    dedup(numbers.to_vec())
        .into_iter()
        .map(|n| {
            n.checked_sub(1)
                .and_then(|i| problem.id_at(i))
                .with_context(|| format!("No test case #{} (there are {})", n, problem.len()))
        })
        .collect()
}

/// Text of a value for display; unreadable files show the error instead.
pub fn io_text(v: &IoValue) -> String {
    match v {
        IoValue::Inline(s) => s.clone(),
        IoValue::File(path) => fsutil::read_to_string(path)
            .unwrap_or_else(|e| format!("<{}>", e)),
    }
}
