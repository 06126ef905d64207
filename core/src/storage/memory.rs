use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{error::*, ProblemStore};
use crate::problem::Problem;

/// Keeps encoded problems in memory. Useful for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<PathBuf, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn blobs(&self) -> MutexGuard<'_, HashMap<PathBuf, Vec<u8>>> {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.blobs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs().is_empty()
    }
}

impl ProblemStore for MemoryStore {
    fn load(&self, src: &Path) -> Result<Option<Problem>> {
        let Some(bytes) = self.blobs().get(src).cloned() else {
            return Ok(None)
        };
        Problem::decode(&bytes)
            .map(Some)
            .map_err(|source| Error::Codec {
                action: CodecAction::Decode,
                path: src.to_owned(),
                source,
            })
    }

    fn save(&self, problem: &Problem) -> Result<()> {
        let bytes = problem.encode().map_err(|source| Error::Codec {
            action: CodecAction::Encode,
            path: problem.src_path().to_owned(),
            source,
        })?;
        self.blobs().insert(problem.src_path().to_owned(), bytes);
        Ok(())
    }

    fn delete(&self, src: &Path) -> Result<bool> {
        Ok(self.blobs().remove(src).is_some())
    }

    fn exists(&self, src: &Path) -> bool {
        self.blobs().contains_key(src)
    }
}
