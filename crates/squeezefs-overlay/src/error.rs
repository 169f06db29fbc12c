use thiserror::Error;

use squeezefs_codec::CodecError;
use squeezefs_vfs::VfsError;

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("unsupported compression algorithm: {name}")]
    UnsupportedAlgorithm { name: String },

    #[error("invalid compression level: {level}")]
    InvalidLevel { level: i32 },

    #[error("seek not supported on compressed files")]
    SeekNotSupported,

    #[error("file is already compressed")]
    AlreadyCompressed,

    #[error("corrupted compressed data")]
    CorruptedData,

    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error(transparent)]
    Vfs(#[from] VfsError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OverlayError>;
