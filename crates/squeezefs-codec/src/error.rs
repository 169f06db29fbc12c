//! Error types for the codec layer.

use thiserror::Error;

/// All errors that can occur constructing or driving a codec stream.
#[derive(Debug, Error)]
pub enum CodecError {
    /// An algorithm name outside the supported set was requested.
    #[error("unsupported compression algorithm: {name}")]
    UnknownAlgorithm {
        /// The offending name.
        name: String,
    },
    /// I/O error from the codec or the stream beneath it.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A compressed stream failed to decode.
    #[error("corrupted compressed data: {reason}")]
    Corrupted {
        /// Decoder diagnostic.
        reason: String,
    },
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, CodecError>;
