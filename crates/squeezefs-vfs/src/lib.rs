//! Filesystem abstraction consumed by the squeezefs overlay.
//!
//! The overlay decorates any backend implementing [`Vfs`]; files it hands
//! out implement [`VfsFile`]. Optional operations (positional I/O, rename,
//! ownership changes, sub-filesystems) have default implementations that
//! fail with [`VfsError::NotSupported`], so minimal backends still wrap.
//! [`MemFs`] is the in-memory reference backend used throughout the test
//! suites.

pub mod error;
pub mod filesystem;
pub mod flags;
pub mod memfs;
pub mod metadata;

pub use error::{Result, VfsError};
pub use filesystem::{read_to_end, write_all, Vfs, VfsFile};
pub use flags::OpenFlags;
pub use memfs::{normalize_path, MemFs, PrefixFs};
pub use metadata::{DirEntry, Metadata};
