use thiserror::Error;

#[derive(Debug, Error)]
pub enum VfsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {path}")]
    NotFound { path: String },

    #[error("already exists: {path}")]
    AlreadyExists { path: String },

    #[error("not a directory: {path}")]
    NotADirectory { path: String },

    #[error("is a directory: {path}")]
    IsADirectory { path: String },

    #[error("file is closed")]
    Closed,

    #[error("operation not supported: {op}")]
    NotSupported { op: &'static str },

    #[error("invalid argument: {msg}")]
    InvalidArgument { msg: String },
}

pub type Result<T> = std::result::Result<T, VfsError>;

impl VfsError {
    /// Convert into an `io::Error` carrying `self` as the source, for the
    /// byte-oriented file methods that speak `io::Result`.
    pub fn into_io(self) -> std::io::Error {
        use std::io::ErrorKind;
        let kind = match &self {
            VfsError::Io(e) => e.kind(),
            VfsError::NotFound { .. } => ErrorKind::NotFound,
            VfsError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            VfsError::NotSupported { .. } => ErrorKind::Unsupported,
            VfsError::InvalidArgument { .. } => ErrorKind::InvalidInput,
            _ => ErrorKind::Other,
        };
        std::io::Error::new(kind, self)
    }
}
