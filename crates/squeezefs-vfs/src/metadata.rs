//! File metadata and directory entries.

use std::time::SystemTime;

/// Metadata for a file or directory, as reported by [`crate::Vfs::stat`].
#[derive(Debug, Clone)]
pub struct Metadata {
    /// Base name of the entry (no directory components).
    pub name: String,
    /// Size in bytes. Zero for directories.
    pub size: u64,
    /// Unix permission bits.
    pub mode: u32,
    /// Last modification time.
    pub modified: SystemTime,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

impl Metadata {
    /// True for regular files.
    pub fn is_file(&self) -> bool {
        !self.is_dir
    }
}

/// A single entry returned by [`crate::Vfs::read_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Base name of the entry within its directory.
    pub name: String,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

impl DirEntry {
    /// Construct an entry for a regular file.
    pub fn file(name: impl Into<String>) -> Self {
        DirEntry {
            name: name.into(),
            is_dir: false,
        }
    }

    /// Construct an entry for a directory.
    pub fn dir(name: impl Into<String>) -> Self {
        DirEntry {
            name: name.into(),
            is_dir: true,
        }
    }
}
