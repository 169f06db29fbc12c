//! The wrapper facade: a [`Vfs`] that compresses transparently.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use tracing::debug;

use squeezefs_codec::Algorithm;
use squeezefs_vfs::{DirEntry, Metadata, OpenFlags, Vfs, VfsError, VfsFile};

use crate::config::Config;
use crate::error::{OverlayError, Result};
use crate::file::CompressedFile;
use crate::names;
use crate::policy::Policy;
use crate::stats::{Stats, StatsSnapshot};

/// State shared between the facade and every handle it produces.
pub(crate) struct Shared {
    pub(crate) base: Arc<dyn Vfs>,
    pub(crate) config: RwLock<Config>,
    pub(crate) policy: Policy,
    pub(crate) stats: Stats,
    cwd: RwLock<String>,
}

/// A compression overlay over an underlying filesystem.
///
/// Callers use logical names; the underlying store sees physical names
/// carrying a codec suffix. Writes are staged and compressed at close;
/// reads probe magic bytes and decompress on the fly.
pub struct CompressFs {
    shared: Arc<Shared>,
}

impl CompressFs {
    /// Wrap `base` with `config`. Skip patterns and algorithm rules are
    /// compiled here; a malformed pattern fails construction, so a built
    /// overlay is never in an inconsistent state.
    pub fn new(base: Arc<dyn Vfs>, config: Config) -> Result<CompressFs> {
        let policy = Policy::new(&config)?;
        let cwd = base.getwd().unwrap_or_else(|_| "/".to_string());
        Ok(CompressFs {
            shared: Arc::new(Shared {
                base,
                config: RwLock::new(config),
                policy,
                stats: Stats::new(),
                cwd: RwLock::new(cwd),
            }),
        })
    }

    /// Wrap `base` with the default configuration.
    pub fn with_defaults(base: Arc<dyn Vfs>) -> Result<CompressFs> {
        CompressFs::new(base, Config::default())
    }

    /// Open a logical file, returning the concrete handle type.
    pub fn open_file(
        &self,
        name: &str,
        flags: OpenFlags,
        mode: u32,
    ) -> squeezefs_vfs::Result<CompressedFile> {
        let (default_algo, preserve, strip) = {
            let cfg = self.shared.config.read().unwrap();
            (cfg.algorithm, cfg.preserve_extension, cfg.strip_extension)
        };

        let mut physical = name.to_string();
        let mut hint: Option<Algorithm> = None;

        if (flags.is_create() || flags.has_write_access()) && !self.shared.policy.should_skip(name)
        {
            if !names::has_compression_suffix(name) {
                physical = names::add_suffix(name, default_algo, preserve);
                hint = Some(default_algo);
            }
        } else if strip {
            for (candidate, algo) in names::candidates(name, default_algo) {
                if self.shared.base.stat(&candidate).is_ok() {
                    debug!("resolved logical {} to physical {}", name, candidate);
                    physical = candidate;
                    hint = Some(algo);
                    break;
                }
            }
        }

        let base_file = self.shared.base.open_file(&physical, flags, mode)?;
        Ok(CompressedFile::new(
            Arc::clone(&self.shared),
            base_file,
            name,
            &physical,
            flags,
            hint,
        ))
    }

    /// Open a logical file for reading.
    pub fn open(&self, name: &str) -> squeezefs_vfs::Result<CompressedFile> {
        self.open_file(name, OpenFlags::RDONLY, 0)
    }

    /// Create (or truncate) a logical file for writing.
    pub fn create(&self, name: &str) -> squeezefs_vfs::Result<CompressedFile> {
        self.open_file(name, OpenFlags::create_rw(), 0o666)
    }

    /// Change the default algorithm for subsequent writes.
    pub fn set_algorithm(&self, algorithm: Algorithm) {
        self.shared.config.write().unwrap().algorithm = algorithm;
    }

    /// Change the default level for subsequent writes.
    pub fn set_level(&self, level: i32) {
        self.shared.config.write().unwrap().level = level;
    }

    /// A point-in-time copy of the aggregate counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// How many files were processed with `algo`.
    pub fn algorithm_count(&self, algo: Algorithm) -> u64 {
        self.shared.stats.algorithm_count(algo)
    }

    /// Zero the aggregate counters.
    pub fn reset_stats(&self) {
        self.shared.stats.reset();
    }

    fn strip_enabled(&self) -> bool {
        self.shared.config.read().unwrap().strip_extension
    }

    fn candidates_for(&self, name: &str) -> Vec<(String, Algorithm)> {
        let preferred = self.shared.config.read().unwrap().algorithm;
        names::candidates(name, preferred)
    }

    /// Run `op` on the name as given, then on each suffixed candidate when
    /// extension stripping is enabled. The first success wins; candidate
    /// failures are discarded in favor of the original error.
    fn with_suffix_fallback<T>(
        &self,
        name: &str,
        op: impl Fn(&str) -> squeezefs_vfs::Result<T>,
    ) -> squeezefs_vfs::Result<T> {
        match op(name) {
            Ok(v) => Ok(v),
            Err(original) => {
                if self.strip_enabled() {
                    for (candidate, _) in self.candidates_for(name) {
                        if let Ok(v) = op(&candidate) {
                            return Ok(v);
                        }
                    }
                }
                Err(original)
            }
        }
    }

    /// Resolve the physical name a logical name currently maps to, or the
    /// logical name itself when no suffixed candidate exists.
    fn resolve_physical(&self, name: &str) -> String {
        if self.strip_enabled() {
            for (candidate, _) in self.candidates_for(name) {
                if self.shared.base.stat(&candidate).is_ok() {
                    return candidate;
                }
            }
        }
        name.to_string()
    }
}

impl Vfs for CompressFs {
    fn open_file(
        &self,
        path: &str,
        flags: OpenFlags,
        mode: u32,
    ) -> squeezefs_vfs::Result<Box<dyn VfsFile>> {
        Ok(Box::new(CompressFs::open_file(self, path, flags, mode)?))
    }

    fn mkdir(&self, path: &str, mode: u32) -> squeezefs_vfs::Result<()> {
        self.shared.base.mkdir(path, mode)
    }

    fn mkdir_all(&self, path: &str, mode: u32) -> squeezefs_vfs::Result<()> {
        self.shared.base.mkdir_all(path, mode)
    }

    fn remove(&self, path: &str) -> squeezefs_vfs::Result<()> {
        self.with_suffix_fallback(path, |p| self.shared.base.remove(p))
    }

    fn remove_all(&self, path: &str) -> squeezefs_vfs::Result<()> {
        self.with_suffix_fallback(path, |p| self.shared.base.remove_all(p))
    }

    fn rename(&self, from: &str, to: &str) -> squeezefs_vfs::Result<()> {
        let mut actual_from = from.to_string();
        let mut actual_to = to.to_string();

        if self.strip_enabled() {
            for (candidate, algo) in self.candidates_for(from) {
                if self.shared.base.stat(&candidate).is_ok() {
                    actual_from = candidate;
                    // The new logical name inherits the suffix so the file
                    // stays discoverable under candidate probing.
                    if !names::has_compression_suffix(to) {
                        actual_to = format!("{to}{}", algo.suffix());
                    }
                    break;
                }
            }
        }

        self.shared.base.rename(&actual_from, &actual_to)
    }

    fn stat(&self, path: &str) -> squeezefs_vfs::Result<Metadata> {
        self.with_suffix_fallback(path, |p| self.shared.base.stat(p))
    }

    fn read_dir(&self, path: &str) -> squeezefs_vfs::Result<Vec<DirEntry>> {
        let entries = self.shared.base.read_dir(path)?;
        if !self.strip_enabled() {
            return Ok(entries);
        }

        let mut seen: HashSet<String> = HashSet::with_capacity(entries.len());
        let mut projected = Vec::with_capacity(entries.len());
        for entry in entries {
            let (stripped, algo) = names::strip_suffix(&entry.name);
            let name = if algo.is_some() { stripped } else { entry.name };
            if seen.insert(name.clone()) {
                projected.push(DirEntry {
                    name,
                    is_dir: entry.is_dir,
                });
            }
        }
        Ok(projected)
    }

    fn truncate(&self, path: &str, size: u64) -> squeezefs_vfs::Result<()> {
        let physical = self.resolve_physical(path);
        self.shared.base.truncate(&physical, size)
    }

    fn chmod(&self, path: &str, mode: u32) -> squeezefs_vfs::Result<()> {
        self.with_suffix_fallback(path, |p| self.shared.base.chmod(p, mode))
    }

    fn chtimes(
        &self,
        path: &str,
        atime: SystemTime,
        mtime: SystemTime,
    ) -> squeezefs_vfs::Result<()> {
        self.with_suffix_fallback(path, |p| self.shared.base.chtimes(p, atime, mtime))
    }

    fn chown(&self, path: &str, uid: u32, gid: u32) -> squeezefs_vfs::Result<()> {
        self.with_suffix_fallback(path, |p| self.shared.base.chown(p, uid, gid))
    }

    fn temp_dir(&self) -> String {
        self.shared.base.temp_dir()
    }

    fn getwd(&self) -> squeezefs_vfs::Result<String> {
        match self.shared.base.getwd() {
            Ok(wd) => Ok(wd),
            Err(_) => Ok(self.shared.cwd.read().unwrap().clone()),
        }
    }

    fn chdir(&self, path: &str) -> squeezefs_vfs::Result<()> {
        if self.shared.base.chdir(path).is_err() {
            // The backend cannot track a working directory; verify the
            // target exists and track it locally.
            self.shared.base.stat(path)?;
        }
        let mut cwd = self.shared.cwd.write().unwrap();
        *cwd = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("{}/{}", cwd.trim_end_matches('/'), path)
        };
        Ok(())
    }

    fn read_file(&self, path: &str) -> squeezefs_vfs::Result<Vec<u8>> {
        let mut file = CompressFs::open(self, path)?;
        // The hint is the physical (possibly compressed) size — a
        // pre-allocation aid, not a bound.
        let size_hint = file.stat().map(|m| m.size as usize).unwrap_or(0);
        let chunk_len = self.shared.config.read().unwrap().buffer_size.max(1);

        let mut out = Vec::with_capacity(size_hint);
        let mut chunk = vec![0u8; chunk_len];
        loop {
            match file.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => out.extend_from_slice(&chunk[..n]),
                Err(e) => {
                    let _ = file.close();
                    return Err(VfsError::Io(e));
                }
            }
        }
        file.close()?;
        Ok(out)
    }

    fn sub(&self, dir: &str) -> squeezefs_vfs::Result<Arc<dyn Vfs>> {
        let meta = self.stat(dir)?;
        if !meta.is_dir {
            return Err(VfsError::NotADirectory {
                path: dir.to_string(),
            });
        }
        let base_sub = self.shared.base.sub(dir)?;
        let config = self.shared.config.read().unwrap().clone();
        let wrapped = CompressFs::new(base_sub, config).map_err(overlay_to_vfs)?;
        Ok(Arc::new(wrapped))
    }
}

fn overlay_to_vfs(err: OverlayError) -> VfsError {
    match err {
        OverlayError::Vfs(e) => e,
        other => VfsError::InvalidArgument {
            msg: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use squeezefs_vfs::MemFs;

    fn overlay(config: Config) -> (CompressFs, MemFs) {
        let mem = MemFs::new();
        let fs = CompressFs::new(Arc::new(mem.clone()), config).unwrap();
        (fs, mem)
    }

    fn write_file(fs: &CompressFs, name: &str, data: &[u8]) {
        let mut f = CompressFs::create(fs, name).unwrap();
        f.write(data).unwrap();
        f.close().unwrap();
    }

    #[test]
    fn create_adds_suffix_and_open_strips_it() {
        let (fs, mem) = overlay(Config {
            algorithm: Algorithm::Gzip,
            ..Config::default()
        });
        write_file(&fs, "doc.txt", b"some document text that compresses");

        assert!(mem.stat("doc.txt.gz").is_ok());
        assert!(mem.stat("doc.txt").is_err());
        assert_eq!(
            fs.read_file("doc.txt").unwrap(),
            b"some document text that compresses"
        );
    }

    #[test]
    fn writing_suffixed_name_passes_through() {
        let (fs, mem) = overlay(Config::default());
        write_file(&fs, "already.gz", b"not actually gzip");

        // No second suffix, no codec frame.
        assert!(mem.stat("already.gz.zst").is_err());
        assert_eq!(mem.read_file("already.gz").unwrap(), b"not actually gzip");
    }

    #[test]
    fn stat_falls_back_to_suffixed_candidates() {
        let (fs, _mem) = overlay(Config::default());
        write_file(&fs, "a.bin", &vec![7u8; 2048]);

        let meta = fs.stat("a.bin").unwrap();
        assert!(meta.size > 0);
        assert!(fs.stat("missing.bin").is_err());
    }

    #[test]
    fn read_dir_projects_and_dedupes() {
        let (fs, mem) = overlay(Config::default());
        mem.create("x").unwrap().close().unwrap();
        {
            let mut f = mem.create("x.gz").unwrap();
            f.write(b"shadow").unwrap();
            f.close().unwrap();
        }
        {
            let mut f = mem.create("y.zst").unwrap();
            f.write(b"z").unwrap();
            f.close().unwrap();
        }

        let entries = fs.read_dir(".").unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["x", "y"]);
    }

    #[test]
    fn rename_carries_suffix_to_new_name() {
        let (fs, mem) = overlay(Config::default());
        write_file(&fs, "old.txt", b"rename me, I am long enough");

        fs.rename("old.txt", "new.txt").unwrap();
        assert!(mem.stat("new.txt.zst").is_ok());
        assert!(mem.stat("old.txt.zst").is_err());
        assert_eq!(fs.read_file("new.txt").unwrap(), b"rename me, I am long enough");
    }

    #[test]
    fn remove_resolves_physical_name() {
        let (fs, mem) = overlay(Config::default());
        write_file(&fs, "gone.txt", b"bytes to delete, of reasonable length");

        fs.remove("gone.txt").unwrap();
        assert!(mem.stat("gone.txt.zst").is_err());
        assert!(fs.stat("gone.txt").is_err());
    }

    #[test]
    fn chmod_and_chtimes_probe_candidates() {
        let (fs, mem) = overlay(Config::default());
        write_file(&fs, "meta.txt", b"metadata target with enough payload");

        fs.chmod("meta.txt", 0o600).unwrap();
        assert_eq!(mem.stat("meta.txt.zst").unwrap().mode, 0o600);

        let stamp = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_700_000_000);
        fs.chtimes("meta.txt", stamp, stamp).unwrap();
        assert_eq!(mem.stat("meta.txt.zst").unwrap().modified, stamp);
    }

    #[test]
    fn set_algorithm_changes_new_writes() {
        let (fs, mem) = overlay(Config::default());
        fs.set_algorithm(Algorithm::Lz4);
        write_file(&fs, "after.txt", b"written after the switch");

        assert!(mem.stat("after.txt.lz4").is_ok());
        assert_eq!(fs.read_file("after.txt").unwrap(), b"written after the switch");
    }

    #[test]
    fn sub_wraps_with_same_config() {
        let (fs, mem) = overlay(Config {
            algorithm: Algorithm::Gzip,
            ..Config::default()
        });
        mem.mkdir_all("nested", 0o755).unwrap();
        write_file(&fs, "nested/inner.txt", b"inner file body for the sub view");

        let sub = fs.sub("nested").unwrap();
        assert_eq!(
            sub.read_file("inner.txt").unwrap(),
            b"inner file body for the sub view"
        );
        assert!(fs.sub("nested/inner.txt").is_err());
    }

    #[test]
    fn invalid_skip_pattern_fails_construction() {
        let mem = MemFs::new();
        let config = Config {
            skip_patterns: vec!["(".to_string()],
            ..Config::default()
        };
        assert!(CompressFs::new(Arc::new(mem), config).is_err());
    }

    #[test]
    fn getwd_and_chdir_track_directories() {
        let (fs, mem) = overlay(Config::default());
        mem.mkdir_all("w/d", 0o755).unwrap();
        fs.chdir("w/d").unwrap();
        assert_eq!(fs.getwd().unwrap(), "w/d");
        assert!(fs.chdir("not-there").is_err());
    }
}
