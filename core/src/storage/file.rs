use std::path::{Path, PathBuf};

use super::{error::*, ProblemStore};
use crate::problem::Problem;

/// Keeps each problem as a gzip-compressed JSON blob next to its source file:
/// `<source dir>/<data dir>/<source file name>.bin`.
#[derive(Debug, Clone)]
pub struct FileStore {
    data_dir: PathBuf,
}

impl FileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn path_for(&self, src: &Path) -> Result<PathBuf> {
        let name = src
            .file_name()
            .ok_or_else(|| Error::InvalidSourcePath(src.to_owned()))?;
        let dir = src.parent().unwrap_or(Path::new("."));
        let mut filename = name.to_owned();
        filename.push(".bin");
        Ok(dir.join(&self.data_dir).join(filename))
    }
}

fn codec_error(e: fsutil::Error) -> Error {
    match e {
        fsutil::Error::SerializeToJson(path, source) => Error::Codec {
            action: CodecAction::Encode,
            path,
            source,
        },
        fsutil::Error::DeserializeFromJson(path, source) => Error::Codec {
            action: CodecAction::Decode,
            path,
            source,
        },
        e => Error::Fs(e),
    }
}

impl ProblemStore for FileStore {
    fn load(&self, src: &Path) -> Result<Option<Problem>> {
        let path = self.path_for(src)?;
        if !path.is_file() {
            return Ok(None);
        }
        let problem: Problem = fsutil::read_gz_json(&path).map_err(codec_error)?;
        log::debug!("Loaded problem from {}", path.display());
        Ok(Some(problem.pruned()))
    }

    fn save(&self, problem: &Problem) -> Result<()> {
        let path = self.path_for(problem.src_path())?;
        fsutil::write_gz_json_with_mkdir(&path, problem).map_err(codec_error)?;
        log::debug!("Saved problem to {}", path.display());
        Ok(())
    }

    fn delete(&self, src: &Path) -> Result<bool> {
        let path = self.path_for(src)?;
        Ok(fsutil::remove_file_if_exists(path)?)
    }

    fn exists(&self, src: &Path) -> bool {
        self.path_for(src).map_or(false, |p| p.is_file())
    }
}
