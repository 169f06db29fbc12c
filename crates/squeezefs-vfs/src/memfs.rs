//! In-memory filesystem backend.
//!
//! Used by the test suites and as the reference implementation of the
//! [`Vfs`] contract. File nodes are shared between handles, so two handles
//! opened on the same path observe the same bytes; each handle carries its
//! own cursor.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{self, SeekFrom};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use crate::error::{Result, VfsError};
use crate::filesystem::{Vfs, VfsFile};
use crate::flags::OpenFlags;
use crate::metadata::{DirEntry, Metadata};

/// Normalize a path for storage and lookup: strip leading slashes, resolve
/// `.` and `..` components. The empty path and `/` both normalize to `.`.
pub fn normalize_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => ".",
    }
}

fn base_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

struct FileNode {
    path: String,
    data: Vec<u8>,
    mode: u32,
    modified: SystemTime,
}

impl FileNode {
    fn metadata(&self) -> Metadata {
        Metadata {
            name: base_of(&self.path).to_string(),
            size: self.data.len() as u64,
            mode: self.mode,
            modified: self.modified,
            is_dir: false,
        }
    }
}

struct MemState {
    files: HashMap<String, Arc<Mutex<FileNode>>>,
    dirs: HashSet<String>,
    cwd: String,
}

impl MemState {
    fn dir_exists(&self, path: &str) -> bool {
        if path == "." || self.dirs.contains(path) {
            return true;
        }
        let prefix = format!("{path}/");
        self.files.keys().any(|k| k.starts_with(&prefix))
            || self.dirs.iter().any(|d| d.starts_with(&prefix))
    }
}

/// An in-memory [`Vfs`]. Cloning yields another view onto the same state.
#[derive(Clone)]
pub struct MemFs {
    state: Arc<Mutex<MemState>>,
}

impl Default for MemFs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemFs {
    pub fn new() -> Self {
        MemFs {
            state: Arc::new(Mutex::new(MemState {
                files: HashMap::new(),
                dirs: HashSet::new(),
                cwd: ".".to_string(),
            })),
        }
    }

    fn node(&self, path: &str) -> Result<Arc<Mutex<FileNode>>> {
        let state = self.state.lock().unwrap();
        state
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| VfsError::NotFound {
                path: path.to_string(),
            })
    }
}

impl Vfs for MemFs {
    fn open_file(&self, path: &str, flags: OpenFlags, mode: u32) -> Result<Box<dyn VfsFile>> {
        let path = normalize_path(path);
        let mut state = self.state.lock().unwrap();

        if state.dir_exists(&path) && !state.files.contains_key(&path) {
            let entries = list_dir(&state, &path);
            return Ok(Box::new(MemDirHandle {
                path,
                entries,
                closed: false,
            }));
        }

        if flags.is_create() && !state.files.contains_key(&path) {
            state.files.insert(
                path.clone(),
                Arc::new(Mutex::new(FileNode {
                    path: path.clone(),
                    data: Vec::new(),
                    mode,
                    modified: SystemTime::now(),
                })),
            );
        }

        let node = state
            .files
            .get(&path)
            .cloned()
            .ok_or_else(|| VfsError::NotFound { path: path.clone() })?;
        drop(state);

        if flags.contains(OpenFlags::TRUNC) {
            let mut n = node.lock().unwrap();
            n.data.clear();
            n.modified = SystemTime::now();
        }

        Ok(Box::new(MemFile {
            path,
            node,
            pos: 0,
            append: flags.contains(OpenFlags::APPEND),
            closed: false,
        }))
    }

    fn mkdir(&self, path: &str, _mode: u32) -> Result<()> {
        let path = normalize_path(path);
        let mut state = self.state.lock().unwrap();
        if state.files.contains_key(&path) {
            return Err(VfsError::AlreadyExists { path });
        }
        state.dirs.insert(path);
        Ok(())
    }

    fn mkdir_all(&self, path: &str, _mode: u32) -> Result<()> {
        let path = normalize_path(path);
        if path == "." {
            return Ok(());
        }
        let mut state = self.state.lock().unwrap();
        let mut so_far = String::new();
        for part in path.split('/') {
            if !so_far.is_empty() {
                so_far.push('/');
            }
            so_far.push_str(part);
            state.dirs.insert(so_far.clone());
        }
        Ok(())
    }

    fn remove(&self, path: &str) -> Result<()> {
        let path = normalize_path(path);
        let mut state = self.state.lock().unwrap();
        if state.files.remove(&path).is_some() {
            return Ok(());
        }
        if state.dirs.contains(&path) {
            let prefix = format!("{path}/");
            let occupied = state.files.keys().any(|k| k.starts_with(&prefix));
            if occupied {
                return Err(VfsError::InvalidArgument {
                    msg: format!("directory not empty: {path}"),
                });
            }
            state.dirs.remove(&path);
            return Ok(());
        }
        Err(VfsError::NotFound { path })
    }

    fn remove_all(&self, path: &str) -> Result<()> {
        let path = normalize_path(path);
        let mut state = self.state.lock().unwrap();
        let prefix = format!("{path}/");
        state
            .files
            .retain(|k, _| k != &path && !k.starts_with(&prefix));
        state
            .dirs
            .retain(|d| d != &path && !d.starts_with(&prefix));
        Ok(())
    }

    fn rename(&self, from: &str, to: &str) -> Result<()> {
        let from = normalize_path(from);
        let to = normalize_path(to);
        let mut state = self.state.lock().unwrap();
        let node = state
            .files
            .remove(&from)
            .ok_or_else(|| VfsError::NotFound { path: from.clone() })?;
        {
            let mut n = node.lock().unwrap();
            n.path = to.clone();
            n.modified = SystemTime::now();
        }
        state.files.insert(to, node);
        Ok(())
    }

    fn stat(&self, path: &str) -> Result<Metadata> {
        let path = normalize_path(path);
        let state = self.state.lock().unwrap();
        if let Some(node) = state.files.get(&path) {
            return Ok(node.lock().unwrap().metadata());
        }
        if state.dir_exists(&path) {
            return Ok(Metadata {
                name: base_of(&path).to_string(),
                size: 0,
                mode: 0o755,
                modified: SystemTime::now(),
                is_dir: true,
            });
        }
        Err(VfsError::NotFound { path })
    }

    fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let path = normalize_path(path);
        let state = self.state.lock().unwrap();
        if state.files.contains_key(&path) {
            return Err(VfsError::NotADirectory { path });
        }
        if !state.dir_exists(&path) {
            return Err(VfsError::NotFound { path });
        }
        Ok(list_dir(&state, &path))
    }

    fn truncate(&self, path: &str, size: u64) -> Result<()> {
        let path = normalize_path(path);
        let node = self.node(&path)?;
        let mut n = node.lock().unwrap();
        n.data.resize(size as usize, 0);
        n.modified = SystemTime::now();
        Ok(())
    }

    fn chmod(&self, path: &str, mode: u32) -> Result<()> {
        let path = normalize_path(path);
        let node = self.node(&path)?;
        node.lock().unwrap().mode = mode;
        Ok(())
    }

    fn chtimes(&self, path: &str, _atime: SystemTime, mtime: SystemTime) -> Result<()> {
        let path = normalize_path(path);
        let node = self.node(&path)?;
        node.lock().unwrap().modified = mtime;
        Ok(())
    }

    fn chown(&self, path: &str, _uid: u32, _gid: u32) -> Result<()> {
        // Ownership is not modeled; existence check only.
        let path = normalize_path(path);
        self.node(&path).map(|_| ())
    }

    fn getwd(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().cwd.clone())
    }

    fn chdir(&self, path: &str) -> Result<()> {
        let path = normalize_path(path);
        let mut state = self.state.lock().unwrap();
        if !state.dir_exists(&path) {
            return Err(VfsError::NotFound { path });
        }
        state.cwd = path;
        Ok(())
    }

    fn sub(&self, dir: &str) -> Result<Arc<dyn Vfs>> {
        let dir = normalize_path(dir);
        {
            let state = self.state.lock().unwrap();
            if state.files.contains_key(&dir) {
                return Err(VfsError::NotADirectory { path: dir });
            }
            if !state.dir_exists(&dir) {
                return Err(VfsError::NotFound { path: dir });
            }
        }
        Ok(Arc::new(PrefixFs {
            base: Arc::new(self.clone()),
            prefix: dir,
        }))
    }
}

fn list_dir(state: &MemState, dir: &str) -> Vec<DirEntry> {
    let mut children: BTreeMap<String, bool> = BTreeMap::new();
    let prefix = if dir == "." {
        String::new()
    } else {
        format!("{dir}/")
    };

    for path in state.files.keys() {
        if let Some(rest) = path.strip_prefix(&prefix) {
            if prefix.is_empty() && path.contains('/') {
                let first = path.split('/').next().unwrap_or(path);
                children.insert(first.to_string(), true);
            } else if let Some(idx) = rest.find('/') {
                children.insert(rest[..idx].to_string(), true);
            } else if !rest.is_empty() {
                children.entry(rest.to_string()).or_insert(false);
            }
        }
    }
    for d in &state.dirs {
        if let Some(rest) = d.strip_prefix(&prefix) {
            if prefix.is_empty() && d.contains('/') {
                let first = d.split('/').next().unwrap_or(d);
                children.insert(first.to_string(), true);
            } else if !rest.is_empty() {
                let first = rest.split('/').next().unwrap_or(rest);
                children.insert(first.to_string(), true);
            }
        }
    }

    children
        .into_iter()
        .map(|(name, is_dir)| DirEntry { name, is_dir })
        .collect()
}

struct MemFile {
    path: String,
    node: Arc<Mutex<FileNode>>,
    pos: u64,
    append: bool,
    closed: bool,
}

impl MemFile {
    fn check_open(&self) -> io::Result<()> {
        if self.closed {
            Err(VfsError::Closed.into_io())
        } else {
            Ok(())
        }
    }
}

impl VfsFile for MemFile {
    fn name(&self) -> &str {
        &self.path
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.check_open()?;
        let node = self.node.lock().unwrap();
        let len = node.data.len() as u64;
        if self.pos >= len {
            return Ok(0);
        }
        let start = self.pos as usize;
        let n = buf.len().min(node.data.len() - start);
        buf[..n].copy_from_slice(&node.data[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.check_open()?;
        let mut node = self.node.lock().unwrap();
        if self.append {
            self.pos = node.data.len() as u64;
        }
        let start = self.pos as usize;
        let end = start + buf.len();
        if node.data.len() < end {
            node.data.resize(end, 0);
        }
        node.data[start..end].copy_from_slice(buf);
        node.modified = SystemTime::now();
        self.pos = end as u64;
        Ok(buf.len())
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.check_open()?;
        let len = self.node.lock().unwrap().data.len() as i64;
        let target = match pos {
            SeekFrom::Start(n) => n as i64,
            SeekFrom::Current(n) => self.pos as i64 + n,
            SeekFrom::End(n) => len + n,
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "negative seek position",
            ));
        }
        self.pos = target as u64;
        Ok(self.pos)
    }

    fn stat(&self) -> Result<Metadata> {
        Ok(self.node.lock().unwrap().metadata())
    }

    fn sync(&mut self) -> Result<()> {
        if self.closed {
            return Err(VfsError::Closed);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }

    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.check_open()?;
        let node = self.node.lock().unwrap();
        let start = offset as usize;
        if start >= node.data.len() {
            return Ok(0);
        }
        let n = buf.len().min(node.data.len() - start);
        buf[..n].copy_from_slice(&node.data[start..start + n]);
        Ok(n)
    }

    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize> {
        self.check_open()?;
        let mut node = self.node.lock().unwrap();
        let start = offset as usize;
        let end = start + buf.len();
        if node.data.len() < end {
            node.data.resize(end, 0);
        }
        node.data[start..end].copy_from_slice(buf);
        node.modified = SystemTime::now();
        Ok(buf.len())
    }

    fn truncate(&mut self, size: u64) -> io::Result<()> {
        self.check_open()?;
        let mut node = self.node.lock().unwrap();
        node.data.resize(size as usize, 0);
        node.modified = SystemTime::now();
        Ok(())
    }
}

struct MemDirHandle {
    path: String,
    entries: Vec<DirEntry>,
    closed: bool,
}

impl VfsFile for MemDirHandle {
    fn name(&self) -> &str {
        &self.path
    }

    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(VfsError::IsADirectory {
            path: self.path.clone(),
        }
        .into_io())
    }

    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(VfsError::IsADirectory {
            path: self.path.clone(),
        }
        .into_io())
    }

    fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
        Err(VfsError::IsADirectory {
            path: self.path.clone(),
        }
        .into_io())
    }

    fn stat(&self) -> Result<Metadata> {
        Ok(Metadata {
            name: base_of(&self.path).to_string(),
            size: 0,
            mode: 0o755,
            modified: SystemTime::now(),
            is_dir: true,
        })
    }

    fn sync(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }

    fn read_dir_entries(&mut self) -> Result<Vec<DirEntry>> {
        if self.closed {
            return Err(VfsError::Closed);
        }
        Ok(self.entries.clone())
    }
}

/// A view of another filesystem rooted at a fixed prefix.
pub struct PrefixFs {
    base: Arc<dyn Vfs>,
    prefix: String,
}

impl PrefixFs {
    pub fn new(base: Arc<dyn Vfs>, prefix: impl Into<String>) -> Self {
        PrefixFs {
            base,
            prefix: normalize_path(&prefix.into()),
        }
    }

    fn join(&self, path: &str) -> String {
        let path = normalize_path(path);
        if path == "." {
            self.prefix.clone()
        } else {
            format!("{}/{}", self.prefix, path)
        }
    }
}

impl Vfs for PrefixFs {
    fn open_file(&self, path: &str, flags: OpenFlags, mode: u32) -> Result<Box<dyn VfsFile>> {
        self.base.open_file(&self.join(path), flags, mode)
    }

    fn mkdir(&self, path: &str, mode: u32) -> Result<()> {
        self.base.mkdir(&self.join(path), mode)
    }

    fn mkdir_all(&self, path: &str, mode: u32) -> Result<()> {
        self.base.mkdir_all(&self.join(path), mode)
    }

    fn remove(&self, path: &str) -> Result<()> {
        self.base.remove(&self.join(path))
    }

    fn remove_all(&self, path: &str) -> Result<()> {
        self.base.remove_all(&self.join(path))
    }

    fn rename(&self, from: &str, to: &str) -> Result<()> {
        self.base.rename(&self.join(from), &self.join(to))
    }

    fn stat(&self, path: &str) -> Result<Metadata> {
        self.base.stat(&self.join(path))
    }

    fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        self.base.read_dir(&self.join(path))
    }

    fn truncate(&self, path: &str, size: u64) -> Result<()> {
        self.base.truncate(&self.join(path), size)
    }

    fn chmod(&self, path: &str, mode: u32) -> Result<()> {
        self.base.chmod(&self.join(path), mode)
    }

    fn chtimes(&self, path: &str, atime: SystemTime, mtime: SystemTime) -> Result<()> {
        self.base.chtimes(&self.join(path), atime, mtime)
    }

    fn chown(&self, path: &str, uid: u32, gid: u32) -> Result<()> {
        self.base.chown(&self.join(path), uid, gid)
    }

    fn temp_dir(&self) -> String {
        self.base.temp_dir()
    }

    fn getwd(&self) -> Result<String> {
        Ok(".".to_string())
    }

    fn sub(&self, dir: &str) -> Result<Arc<dyn Vfs>> {
        self.base.sub(&self.join(dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::read_to_end;

    #[test]
    fn normalize_paths() {
        assert_eq!(normalize_path("/a/b"), "a/b");
        assert_eq!(normalize_path("a//b/./c"), "a/b/c");
        assert_eq!(normalize_path("a/../b"), "b");
        assert_eq!(normalize_path(""), ".");
        assert_eq!(normalize_path("/"), ".");
    }

    #[test]
    fn create_write_read() {
        let fs = MemFs::new();
        let mut f = fs.create("hello.txt").unwrap();
        f.write(b"hello world").unwrap();
        f.close().unwrap();

        let mut f = fs.open("hello.txt").unwrap();
        let data = read_to_end(f.as_mut()).unwrap();
        assert_eq!(data, b"hello world");
        f.close().unwrap();
    }

    #[test]
    fn handles_share_node() {
        let fs = MemFs::new();
        let mut w = fs.create("shared").unwrap();
        w.write(b"abc").unwrap();

        let meta = fs.stat("shared").unwrap();
        assert_eq!(meta.size, 3);
        w.close().unwrap();
    }

    #[test]
    fn truncate_on_open() {
        let fs = MemFs::new();
        let mut f = fs.create("t").unwrap();
        f.write(b"0123456789").unwrap();
        f.close().unwrap();

        let mut f = fs.create("t").unwrap();
        f.close().unwrap();
        assert_eq!(fs.stat("t").unwrap().size, 0);
    }

    #[test]
    fn append_mode() {
        let fs = MemFs::new();
        let mut f = fs.create("log").unwrap();
        f.write(b"one").unwrap();
        f.close().unwrap();

        let mut f = fs
            .open_file("log", OpenFlags::WRONLY | OpenFlags::APPEND, 0o644)
            .unwrap();
        f.write(b"two").unwrap();
        f.close().unwrap();

        assert_eq!(fs.read_file("log").unwrap(), b"onetwo");
    }

    #[test]
    fn seek_and_read() {
        let fs = MemFs::new();
        let mut f = fs.create("s").unwrap();
        f.write(b"abcdef").unwrap();
        f.seek(SeekFrom::Start(2)).unwrap();
        let mut buf = [0u8; 2];
        assert_eq!(f.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf, b"cd");
        f.close().unwrap();
    }

    #[test]
    fn rename_moves_file() {
        let fs = MemFs::new();
        let mut f = fs.create("old").unwrap();
        f.write(b"x").unwrap();
        f.close().unwrap();

        fs.rename("old", "new").unwrap();
        assert!(fs.stat("old").is_err());
        assert_eq!(fs.stat("new").unwrap().size, 1);
    }

    #[test]
    fn read_dir_lists_children() {
        let fs = MemFs::new();
        fs.create("a.txt").unwrap().close().unwrap();
        fs.create("sub/b.txt").unwrap().close().unwrap();

        let entries = fs.read_dir(".").unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "sub"]);
        assert!(!entries[0].is_dir);
        assert!(entries[1].is_dir);
    }

    #[test]
    fn remove_and_remove_all() {
        let fs = MemFs::new();
        fs.create("d/one").unwrap().close().unwrap();
        fs.create("d/two").unwrap().close().unwrap();

        assert!(fs.remove("d").is_err());
        fs.remove("d/one").unwrap();
        fs.remove_all("d").unwrap();
        assert!(fs.stat("d").is_err());
    }

    #[test]
    fn sub_view() {
        let fs = MemFs::new();
        fs.create("root/inner/file").unwrap().close().unwrap();

        let sub = fs.sub("root").unwrap();
        assert_eq!(sub.stat("inner/file").unwrap().size, 0);
        assert!(sub.stat("missing").is_err());
    }

    #[test]
    fn closed_handle_rejects_io() {
        let fs = MemFs::new();
        let mut f = fs.create("c").unwrap();
        f.close().unwrap();
        assert!(f.write(b"x").is_err());
        let mut buf = [0u8; 1];
        assert!(f.read(&mut buf).is_err());
        // Second close is a no-op.
        assert!(f.close().is_ok());
    }

    #[test]
    fn chdir_getwd() {
        let fs = MemFs::new();
        fs.mkdir_all("a/b", 0o755).unwrap();
        fs.chdir("a/b").unwrap();
        assert_eq!(fs.getwd().unwrap(), "a/b");
        assert!(fs.chdir("missing").is_err());
    }
}
