//! The `Vfs` and `VfsFile` capability traits.
//!
//! Backends implement as much of the surface as they can; operations a
//! backend cannot express keep their default implementation, which fails
//! with `VfsError::NotSupported`. Consumers probe capabilities by calling
//! and handling the failure rather than by downcasting.

use std::io::{self, SeekFrom};
use std::sync::Arc;
use std::time::SystemTime;

use crate::error::{Result, VfsError};
use crate::flags::OpenFlags;
use crate::metadata::{DirEntry, Metadata};

/// A filesystem capability: byte-oriented file I/O, directory listing, and
/// metadata mutation. All paths are slash-separated and interpreted by the
/// backend.
pub trait Vfs: Send + Sync {
    /// Open a file with explicit flags and permission bits.
    fn open_file(&self, path: &str, flags: OpenFlags, mode: u32) -> Result<Box<dyn VfsFile>>;

    /// Open a file for reading.
    fn open(&self, path: &str) -> Result<Box<dyn VfsFile>> {
        self.open_file(path, OpenFlags::RDONLY, 0)
    }

    /// Create (or truncate) a file for reading and writing.
    fn create(&self, path: &str) -> Result<Box<dyn VfsFile>> {
        self.open_file(path, OpenFlags::create_rw(), 0o666)
    }

    fn mkdir(&self, path: &str, mode: u32) -> Result<()>;

    fn mkdir_all(&self, path: &str, mode: u32) -> Result<()>;

    fn remove(&self, path: &str) -> Result<()>;

    /// Remove `path` and any children it contains.
    fn remove_all(&self, path: &str) -> Result<()>;

    fn rename(&self, from: &str, to: &str) -> Result<()> {
        let _ = (from, to);
        Err(VfsError::NotSupported { op: "rename" })
    }

    fn stat(&self, path: &str) -> Result<Metadata>;

    /// List the entries of a directory, sorted by name.
    fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>>;

    fn truncate(&self, path: &str, size: u64) -> Result<()> {
        let _ = (path, size);
        Err(VfsError::NotSupported { op: "truncate" })
    }

    fn chmod(&self, path: &str, mode: u32) -> Result<()> {
        let _ = (path, mode);
        Err(VfsError::NotSupported { op: "chmod" })
    }

    fn chtimes(&self, path: &str, atime: SystemTime, mtime: SystemTime) -> Result<()> {
        let _ = (path, atime, mtime);
        Err(VfsError::NotSupported { op: "chtimes" })
    }

    fn chown(&self, path: &str, uid: u32, gid: u32) -> Result<()> {
        let _ = (path, uid, gid);
        Err(VfsError::NotSupported { op: "chown" })
    }

    /// Directory for temporary files.
    fn temp_dir(&self) -> String {
        "/tmp".to_string()
    }

    fn getwd(&self) -> Result<String> {
        Err(VfsError::NotSupported { op: "getwd" })
    }

    fn chdir(&self, path: &str) -> Result<()> {
        let _ = path;
        Err(VfsError::NotSupported { op: "chdir" })
    }

    /// Read an entire file.
    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let mut file = self.open(path)?;
        let result = read_to_end(file.as_mut());
        let close_result = file.close();
        let bytes = result.map_err(VfsError::Io)?;
        close_result?;
        Ok(bytes)
    }

    /// Derive a filesystem rooted at `dir`.
    fn sub(&self, dir: &str) -> Result<Arc<dyn Vfs>> {
        let _ = dir;
        Err(VfsError::NotSupported { op: "sub" })
    }
}

/// An open file. Sequential read/write and seek-from-start are required;
/// positional I/O, truncation, and directory enumeration are optional
/// capabilities with default-failing implementations.
pub trait VfsFile: Send {
    /// The path this file was opened with.
    fn name(&self) -> &str;

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64>;

    fn stat(&self) -> Result<Metadata>;

    fn sync(&mut self) -> Result<()>;

    /// Release the handle. Implementations tolerate a second close by
    /// returning success.
    fn close(&mut self) -> Result<()>;

    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let _ = (buf, offset);
        Err(VfsError::NotSupported { op: "read_at" }.into_io())
    }

    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize> {
        let _ = (buf, offset);
        Err(VfsError::NotSupported { op: "write_at" }.into_io())
    }

    fn truncate(&mut self, size: u64) -> io::Result<()> {
        let _ = size;
        Err(VfsError::NotSupported { op: "truncate" }.into_io())
    }

    /// Enumerate entries when the handle refers to a directory.
    fn read_dir_entries(&mut self) -> Result<Vec<DirEntry>> {
        Err(VfsError::NotSupported {
            op: "read_dir_entries",
        })
    }
}

/// Drain `file` from its current position to EOF.
pub fn read_to_end(file: &mut dyn VfsFile) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = file.read(&mut chunk)?;
        if n == 0 {
            return Ok(out);
        }
        out.extend_from_slice(&chunk[..n]);
    }
}

/// Write all of `buf`, retrying on partial writes.
pub fn write_all(file: &mut dyn VfsFile, mut buf: &[u8]) -> io::Result<()> {
    while !buf.is_empty() {
        let n = file.write(buf)?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "file refused to accept more bytes",
            ));
        }
        buf = &buf[n..];
    }
    Ok(())
}
