//! Shared helpers for the integration suites.

use std::sync::Arc;

use squeezefs_overlay::{CompressFs, Config};
use squeezefs_vfs::{MemFs, Vfs, VfsFile};

/// Build a memory-backed overlay, returning both the facade and the
/// underlying store so suites can assert on physical names.
pub fn overlay(config: Config) -> (CompressFs, MemFs) {
    let mem = MemFs::new();
    let fs = CompressFs::new(Arc::new(mem.clone()), config)
        .expect("overlay construction with a valid config");
    (fs, mem)
}

/// [`overlay`] with the default configuration.
pub fn overlay_with_defaults() -> (CompressFs, MemFs) {
    overlay(Config::default())
}

/// Create `name` through the facade, write `data`, close.
pub fn write_file(fs: &CompressFs, name: &str, data: &[u8]) {
    let mut file = fs.create(name).expect("create through the overlay");
    file.write(data).expect("staged write");
    file.close().expect("close with codec flush");
}

/// Read `name` through the facade until EOF.
pub fn read_back(fs: &CompressFs, name: &str) -> Vec<u8> {
    fs.read_file(name).expect("read through the overlay")
}

/// A compressible payload of `len` bytes with mild structure.
pub fn sample_payload(len: usize) -> Vec<u8> {
    let dict = b"the quick brown fox jumps over the lazy dog ";
    (0..len).map(|i| dict[i % dict.len()]).collect()
}
