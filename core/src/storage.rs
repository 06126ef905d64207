mod error;
mod file;
mod memory;

pub use error::*;
pub use file::FileStore;
pub use memory::MemoryStore;

use std::path::Path;

use crate::problem::Problem;

/// Where problems are persisted, keyed by their source file path.
pub trait ProblemStore: Send + Sync {
    fn load(&self, src: &Path) -> Result<Option<Problem>>;
    fn save(&self, problem: &Problem) -> Result<()>;
    /// Returns false if nothing was stored for `src`.
    fn delete(&self, src: &Path) -> Result<bool>;
    fn exists(&self, src: &Path) -> bool;
}
