mod observer;
mod session;

pub use observer::*;
pub use session::*;

use serde::{Deserialize, Serialize};

use crate::verdict::Verdict;

/// Which cases get expanded (shown in detail) once judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpandBehavior {
    Always,
    Never,
    /// Only the first case of the run.
    First,
    /// Only the first case whose verdict deserves attention.
    #[default]
    FirstFailed,
    /// Leave the expansion state untouched.
    Same,
}

impl ExpandBehavior {
    /// `None` means keep the current state.
    pub fn decide(self, verdict: Verdict, is_first: bool, expanded_before: bool) -> Option<bool> {
        use ExpandBehavior::*;
        match self {
            Always => Some(true),
            Never => Some(false),
            First => Some(is_first),
            FirstFailed => Some(verdict.should_expand() && !expanded_before),
            Same => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopMode {
    /// Abort the running case and skip the rest.
    All,
    /// Abort only the running case; the batch goes on.
    CurrentOnly,
}
