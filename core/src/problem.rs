mod io;
mod testcase;

pub use io::*;
pub use testcase::*;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::ProblemConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileWithHash {
    pub path: PathBuf,
    /// Cache key of the last successful build.
    pub hash: Option<String>,
}

impl FileWithHash {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            hash: None,
        }
    }
}

/// Sources of brute-force mode: `generator` prints a random input and `reference`
/// is a trusted (slow) solution whose output serves as the answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BruteForce {
    pub generator: FileWithHash,
    pub reference: FileWithHash,
}

/// Per-problem overrides of the configured language table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CompilationSettings {
    pub compiler: Option<String>,
    pub compiler_args: Option<Vec<String>>,
    pub runner: Option<String>,
    pub runner_args: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub version: u32,
    pub name: String,
    pub url: Option<Url>,
    pub time_limit_ms: u64,
    pub memory_limit_mb: u64,
    pub src: FileWithHash,
    pub checker: Option<FileWithHash>,
    /// Talks to the program over its stdin and stdout and decides the verdict.
    #[serde(default)]
    pub interactor: Option<FileWithHash>,
    #[serde(default)]
    pub brute_force: Option<BruteForce>,
    cases: HashMap<TestCaseId, TestCase>,
    order: Vec<TestCaseId>,
    pub compilation_settings: Option<CompilationSettings>,
}

impl Problem {
    pub const VERSION: u32 = 1;

    pub fn new(src: impl Into<PathBuf>, defaults: &ProblemConfig) -> Self {
        let src: PathBuf = src.into();
        let name = src
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            version: Self::VERSION,
            name,
            url: None,
            time_limit_ms: defaults.default_time_limit_ms,
            memory_limit_mb: defaults.default_memory_limit_mb,
            src: FileWithHash::new(src),
            checker: None,
            interactor: None,
            brute_force: None,
            cases: HashMap::new(),
            order: Vec::new(),
            compilation_settings: None,
        }
    }

    pub fn src_path(&self) -> &Path {
        &self.src.path
    }

    pub fn add_case(&mut self, tc: TestCase) -> TestCaseId {
        let id = TestCaseId::new();
        self.cases.insert(id, tc);
        self.order.push(id);
        id
    }

    pub fn add_cases(
        &mut self,
        cases: impl IntoIterator<Item = TestCase>,
        clear_first: bool,
    ) -> Vec<TestCaseId> {
        if clear_first {
            self.clear_cases();
        }
        cases.into_iter().map(|tc| self.add_case(tc)).collect()
    }

    /// Removes every case, returning them in order.
    pub fn clear_cases(&mut self) -> Vec<TestCase> {
        let order = std::mem::take(&mut self.order);
        let removed = order.iter().filter_map(|id| self.cases.remove(id)).collect();
        self.cases.clear();
        removed
    }

    pub fn case(&self, id: TestCaseId) -> Option<&TestCase> {
        self.cases.get(&id)
    }

    pub fn case_mut(&mut self, id: TestCaseId) -> Option<&mut TestCase> {
        self.cases.get_mut(&id)
    }

    pub fn remove_case(&mut self, id: TestCaseId) -> Option<TestCase> {
        self.order.retain(|&x| x != id);
        self.cases.remove(&id)
    }

    /// Moves the case at position `from` to position `to`.
    /// Returns false (and changes nothing) when either index is out of range.
    pub fn move_case(&mut self, from: usize, to: usize) -> bool {
        let n = self.order.len();
        if from >= n || to >= n {
            return false;
        }
        let id = self.order.remove(from);
        self.order.insert(to, id);
        true
    }

    pub fn id_at(&self, index: usize) -> Option<TestCaseId> {
        self.order.get(index).copied()
    }

    pub fn index_of(&self, id: TestCaseId) -> Option<usize> {
        self.order.iter().position(|&x| x == id)
    }

    pub fn order(&self) -> &[TestCaseId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter_ordered(&self) -> impl Iterator<Item = (TestCaseId, &TestCase)> + '_ {
        self.order
            .iter()
            .filter_map(|&id| self.cases.get(&id).map(|tc| (id, tc)))
    }

    pub fn cases_mut(&mut self) -> impl Iterator<Item = &mut TestCase> + '_ {
        self.cases.values_mut()
    }

    /// Drops cases that are not reachable from the order and order entries without a case.
    /// Returns the dropped cases.
    pub fn prune(&mut self) -> Vec<TestCase> {
        let cases = &self.cases;
        self.order.retain(|id| cases.contains_key(id));
        let keep: std::collections::HashSet<_> = self.order.iter().copied().collect();
        let dangling: Vec<_> = self
            .cases
            .keys()
            .filter(|id| !keep.contains(id))
            .copied()
            .collect();
        dangling
            .into_iter()
            .filter_map(|id| self.cases.remove(&id))
            .collect()
    }

    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        fsutil::to_gz_json(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        fsutil::from_gz_json(bytes).map(Self::pruned)
    }

    /// Drops cases that no ordering entry reaches. Used on freshly deserialized data.
    pub fn pruned(mut self) -> Self {
        let dropped = self.prune();
        if !dropped.is_empty() {
            log::warn!("Dropped {} unreachable test case(s) of {}", dropped.len(), self.name);
        }
        self
    }
}
