pub mod cancel;
pub mod config;
pub mod judge;
pub mod problem;
pub mod scratch;
pub mod storage;
pub mod testing;
pub mod verdict;

pub mod error {
    #[allow(unused_imports)]
    pub(crate) use anyhow::{anyhow, bail, ensure, Context as _};
    pub use anyhow::{Error, Result};
}

pub use crate::config::Config;
pub use crate::judge::{Observer, Session, StopMode};
pub use crate::problem::{IoValue, Problem, TestCase, TestCaseId};
pub use crate::verdict::Verdict;
