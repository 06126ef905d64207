use std::io::Cursor;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

use crate::error::*;
use crate::scratch::Scratch;

/// Test data kept either in memory or in a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum IoValue {
    Inline(String),
    File(PathBuf),
}

pub type IoReader<'a> = Box<dyn AsyncRead + Unpin + Send + 'a>;

/// A readable path obtained from [`IoValue::to_path`].
#[derive(Debug)]
pub struct Materialized {
    pub path: PathBuf,
    temporary: bool,
}

impl Materialized {
    /// Deletes the file if it was created just for this use.
    pub fn release(self, scratch: &Scratch) {
        if self.temporary {
            scratch.release(&self.path);
        }
    }
}

impl Default for IoValue {
    fn default() -> Self {
        IoValue::Inline(String::new())
    }
}

impl From<&str> for IoValue {
    fn from(s: &str) -> Self {
        IoValue::Inline(s.to_owned())
    }
}

impl From<String> for IoValue {
    fn from(s: String) -> Self {
        IoValue::Inline(s)
    }
}

impl IoValue {
    pub fn is_empty_inline(&self) -> bool {
        matches!(self, IoValue::Inline(s) if s.is_empty())
    }

    pub fn is_file(&self) -> bool {
        matches!(self, IoValue::File(_))
    }

    pub async fn read_to_string(&self) -> Result<String> {
        match self {
            IoValue::Inline(s) => Ok(s.clone()),
            IoValue::File(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
        }
    }

    pub async fn new_reader(&self) -> Result<IoReader<'_>> {
        match self {
            IoValue::Inline(s) => Ok(Box::new(Cursor::new(s.as_bytes()))),
            IoValue::File(path) => {
                let f = tokio::fs::File::open(path)
                    .await
                    .with_context(|| format!("Failed to open {}", path.display()))?;
                Ok(Box::new(f))
            }
        }
    }

    /// A file path holding this value. Inline data is written into the scratch
    /// directory under a name derived from `key`.
    pub async fn to_path(&self, scratch: &Scratch, key: &str) -> Result<Materialized> {
        match self {
            IoValue::File(path) => Ok(Materialized {
                path: path.clone(),
                temporary: false,
            }),
            IoValue::Inline(s) => {
                let path = scratch.io_path_for(key);
                scratch.write_io(&path, s.as_bytes()).await?;
                Ok(Materialized {
                    path,
                    temporary: true,
                })
            }
        }
    }

    /// Keeps `content` inline unless it is longer than `max_len`, in which case it is
    /// spilled into a new scratch file.
    pub async fn store(content: String, scratch: &Scratch, max_len: usize, label: &str) -> Result<Self> {
        if content.len() <= max_len {
            return Ok(IoValue::Inline(content));
        }
        let path = scratch.new_io_path(label);
        scratch.write_io(&path, content.as_bytes()).await?;
        Ok(IoValue::File(path))
    }

    /// Reads a small scratch-owned file back inline and releases the file.
    /// Anything else is left as it is.
    pub fn inline_small(&mut self, scratch: &Scratch, max_len: usize) -> Result<()> {
        let IoValue::File(path) = self else {
            return Ok(());
        };
        if !scratch.owns(&*path) || fsutil::file_size(&*path)? > max_len as u64 {
            return Ok(());
        }
        let bytes = fsutil::read(&*path)?;
        scratch.release(&*path);
        *self = IoValue::Inline(String::from_utf8_lossy(&bytes).into_owned());
        Ok(())
    }

    pub async fn to_inline(&mut self, scratch: &Scratch) -> Result<()> {
        if let IoValue::File(path) = self {
            let content = IoValue::File(path.clone()).read_to_string().await?;
            scratch.release(&*path);
            *self = IoValue::Inline(content);
        }
        Ok(())
    }

    pub async fn to_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let IoValue::Inline(s) = self {
            if let Some(dir) = path.parent() {
                tokio::fs::create_dir_all(dir)
                    .await
                    .with_context(|| format!("Cannot create dir {}", dir.display()))?;
            }
            tokio::fs::write(path, s.as_bytes())
                .await
                .with_context(|| format!("Cannot write {}", path.display()))?;
            *self = IoValue::File(path.to_owned());
        }
        Ok(())
    }

    /// Drops the backing file if the scratch directory owns it.
    pub fn release(&self, scratch: &Scratch) {
        if let IoValue::File(path) = self {
            scratch.release(path);
        }
    }
}
