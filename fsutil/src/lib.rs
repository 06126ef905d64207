use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write as _},
    path::Path,
};

pub mod error {
    use std::{io, path::PathBuf};

    pub type Result<T> = std::result::Result<T, self::Error>;

    type Msg = &'static str;

    #[derive(Debug, thiserror::Error)]
    pub enum Error {
        #[error("{0} ({1}): {2}")]
        SingleIO(Msg, PathBuf, #[source] io::Error),

        #[error("Cannot serialize to JSON (dest='{0}'): {1}")]
        SerializeToJson(PathBuf, #[source] serde_json::Error),

        #[error("Cannot deserialize from JSON (src='{0}'): {1}")]
        DeserializeFromJson(PathBuf, #[source] serde_json::Error),
    }

    impl Error {
        pub fn is_not_found(&self) -> bool {
            match self {
                Error::SingleIO(_, _, e) => e.kind() == io::ErrorKind::NotFound,
                _ => false,
            }
        }
    }
}
pub use error::{Error, Result};

#[must_use]
pub fn mkdir_all(path: impl AsRef<Path>) -> Result<()> {
    let dir = path.as_ref();
    fs::create_dir_all(dir).map_err(|e| Error::SingleIO("Cannot create dir", dir.to_owned(), e))
}

#[must_use]
pub fn write<P, C>(filepath: P, contents: C) -> Result<()>
where
    P: AsRef<Path>,
    C: AsRef<[u8]>,
{
    fs::write(&filepath, contents)
        .map_err(|e| Error::SingleIO("Cannot write file", filepath.as_ref().to_owned(), e))
}

#[must_use]
pub fn write_with_mkdir<P, C>(filepath: P, contents: C) -> Result<()>
where
    P: AsRef<Path>,
    C: AsRef<[u8]>,
{
    if let Some(dir) = filepath.as_ref().parent() {
        self::mkdir_all(dir)?;
    }
    self::write(filepath, contents)
}

#[must_use]
pub fn read(filepath: impl AsRef<Path>) -> Result<Vec<u8>> {
    fs::read(&filepath)
        .map_err(|e| Error::SingleIO("Cannot read file", filepath.as_ref().to_owned(), e))
}

#[must_use]
pub fn read_to_string(filepath: impl AsRef<Path>) -> Result<String> {
    fs::read_to_string(&filepath)
        .map_err(|e| Error::SingleIO("Cannot read file", filepath.as_ref().to_owned(), e))
}

#[must_use]
pub fn remove_file(filepath: impl AsRef<Path>) -> Result<()> {
    fs::remove_file(&filepath)
        .map_err(|e| Error::SingleIO("Cannot remove file", filepath.as_ref().to_owned(), e))
}

/// Removes the file and reports whether something was actually removed.
/// A missing file is not an error.
#[must_use]
pub fn remove_file_if_exists(filepath: impl AsRef<Path>) -> Result<bool> {
    match self::remove_file(&filepath) {
        Ok(()) => Ok(true),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e),
    }
}

#[must_use]
pub fn file_size(filepath: impl AsRef<Path>) -> Result<u64> {
    fs::metadata(&filepath)
        .map(|m| m.len())
        .map_err(|e| Error::SingleIO("Cannot stat file", filepath.as_ref().to_owned(), e))
}

/// Returns true if `path` is a regular file that the current user may execute.
///
/// ```
/// assert!(!fsutil::is_executable_file("/surely/not/existing/file"));
/// ```
pub fn is_executable_file(path: impl AsRef<Path>) -> bool {
    let Ok(meta) = fs::metadata(path.as_ref()) else {
        return false
    };
    if !meta.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

/// Serializes `data` as JSON, compresses it with gzip and writes it to `filepath`,
/// creating the parent directories as needed.
#[must_use]
pub fn write_gz_json_with_mkdir<P, T>(filepath: P, data: &T) -> Result<()>
where
    P: AsRef<Path>,
    T: Serialize,
{
    let filepath = filepath.as_ref();
    if let Some(dir) = filepath.parent() {
        self::mkdir_all(dir)?;
    }
    let bytes = self::to_gz_json(data)
        .map_err(|e| Error::SerializeToJson(filepath.to_owned(), e))?;
    self::write(filepath, bytes)
}

#[must_use]
pub fn read_gz_json<P, T>(filepath: P) -> Result<T>
where
    P: AsRef<Path>,
    T: DeserializeOwned,
{
    let filepath = filepath.as_ref();
    let f = File::open(filepath)
        .map_err(|e| Error::SingleIO("Cannot read file", filepath.to_owned(), e))?;
    serde_json::from_reader(GzDecoder::new(BufReader::new(f)))
        .map_err(|e| Error::DeserializeFromJson(filepath.to_owned(), e))
}

/// In-memory variant of [`write_gz_json_with_mkdir`].
pub fn to_gz_json<T: Serialize>(data: &T) -> std::result::Result<Vec<u8>, serde_json::Error> {
    let mut enc = GzEncoder::new(BufWriter::new(Vec::new()), Compression::default());
    serde_json::to_writer(&mut enc, data)?;
    let finish = |enc: GzEncoder<BufWriter<Vec<u8>>>| -> io::Result<Vec<u8>> {
        let mut w = enc.finish()?;
        w.flush()?;
        w.into_inner().map_err(|e| e.into_error())
    };
    finish(enc).map_err(serde_json::Error::io)
}

/// In-memory variant of [`read_gz_json`].
pub fn from_gz_json<T: DeserializeOwned>(bytes: &[u8]) -> std::result::Result<T, serde_json::Error> {
    serde_json::from_reader(GzDecoder::new(bytes))
}
