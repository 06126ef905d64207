use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Fs(#[from] fsutil::Error),

    #[error("Cannot {action} problem data '{}': {source}", .path.to_string_lossy())]
    Codec {
        action: CodecAction,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Not a source file path: '{}'", .0.to_string_lossy())]
    InvalidSourcePath(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum CodecAction {
    #[strum(serialize = "encode")]
    Encode,
    #[strum(serialize = "decode")]
    Decode,
}
