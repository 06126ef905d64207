use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::*;

/// The cache directory: compiled binaries under `bin/`, spilled or materialized
/// test data under `io/`.
///
/// Only files under `io/` are ever deleted by [`Scratch::release`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scratch {
    root: PathBuf,
}

pub fn sha256_hex(data: impl AsRef<[u8]>) -> String {
    hex::encode(Sha256::digest(data.as_ref()))
}

impl Scratch {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    pub fn io_dir(&self) -> PathBuf {
        self.root.join("io")
    }

    /// A fresh path under `io/`; nothing is created.
    pub fn new_io_path(&self, label: &str) -> PathBuf {
        self.io_dir()
            .join(format!("{}-{}", uuid::Uuid::new_v4().simple(), label))
    }

    /// A stable path under `io/` derived from `key`.
    pub fn io_path_for(&self, key: &str) -> PathBuf {
        let hash = sha256_hex(key);
        self.io_dir().join(&hash[..16])
    }

    pub fn owns(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        path.starts_with(self.io_dir())
            && !path
                .components()
                .any(|c| matches!(c, Component::ParentDir | Component::CurDir))
    }

    pub async fn write_io(&self, path: &Path, content: &[u8]) -> Result<()> {
        ensure!(self.owns(path), "Not a scratch path: {}", path.display());
        tokio::fs::create_dir_all(self.io_dir())
            .await
            .with_context(|| format!("Cannot create dir {}", self.io_dir().display()))?;
        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("Cannot write scratch file {}", path.display()))
    }

    /// Deletes a scratch-owned file. Paths outside the scratch directory are left alone.
    pub fn release(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        if !self.owns(path) {
            log::debug!("Not releasing non-scratch file {}", path.display());
            return;
        }
        match fsutil::remove_file_if_exists(path) {
            Ok(_) => log::debug!("Released {}", path.display()),
            Err(e) => log::warn!("Failed to release scratch file: {:#}", e),
        }
    }
}
