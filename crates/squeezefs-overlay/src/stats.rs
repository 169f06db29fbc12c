//! Aggregate compression statistics.
//!
//! Counters are lock-free `AtomicU64`s updated with relaxed additions;
//! per-field reads are consistent but a snapshot is not atomic across
//! fields. The per-algorithm map sits behind its own mutex.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use squeezefs_codec::Algorithm;

/// Live counters owned by an overlay instance.
#[derive(Debug, Default)]
pub struct Stats {
    files_compressed: AtomicU64,
    files_decompressed: AtomicU64,
    files_skipped: AtomicU64,
    bytes_read: AtomicU64,
    bytes_written: AtomicU64,
    bytes_compressed: AtomicU64,
    bytes_decompressed: AtomicU64,
    algorithm_counts: Mutex<HashMap<Algorithm, u64>>,
}

impl Stats {
    pub fn new() -> Stats {
        Stats::default()
    }

    pub(crate) fn inc_files_compressed(&self) {
        self.files_compressed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_files_decompressed(&self) {
        self.files_decompressed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_files_skipped(&self) {
        self.files_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_bytes_read(&self, n: u64) {
        self.bytes_read.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn add_bytes_written(&self, n: u64) {
        self.bytes_written.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn add_bytes_compressed(&self, n: u64) {
        self.bytes_compressed.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn add_bytes_decompressed(&self, n: u64) {
        self.bytes_decompressed.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn inc_algorithm(&self, algo: Algorithm) {
        let mut counts = self.algorithm_counts.lock().unwrap();
        *counts.entry(algo).or_insert(0) += 1;
    }

    /// How many files were processed with `algo`, in either direction.
    pub fn algorithm_count(&self, algo: Algorithm) -> u64 {
        self.algorithm_counts
            .lock()
            .unwrap()
            .get(&algo)
            .copied()
            .unwrap_or(0)
    }

    /// A point-in-time copy of every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            files_compressed: self.files_compressed.load(Ordering::Relaxed),
            files_decompressed: self.files_decompressed.load(Ordering::Relaxed),
            files_skipped: self.files_skipped.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            bytes_compressed: self.bytes_compressed.load(Ordering::Relaxed),
            bytes_decompressed: self.bytes_decompressed.load(Ordering::Relaxed),
            algorithm_counts: self.algorithm_counts.lock().unwrap().clone(),
        }
    }

    /// Zero every counter.
    pub fn reset(&self) {
        self.files_compressed.store(0, Ordering::Relaxed);
        self.files_decompressed.store(0, Ordering::Relaxed);
        self.files_skipped.store(0, Ordering::Relaxed);
        self.bytes_read.store(0, Ordering::Relaxed);
        self.bytes_written.store(0, Ordering::Relaxed);
        self.bytes_compressed.store(0, Ordering::Relaxed);
        self.bytes_decompressed.store(0, Ordering::Relaxed);
        self.algorithm_counts.lock().unwrap().clear();
    }
}

/// Serializable copy of the counters at one point in time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Files whose staged bytes went through an encoder at close.
    pub files_compressed: u64,
    /// Files read back through a decoder.
    pub files_decompressed: u64,
    /// Files stored verbatim (skip pattern or below the size floor).
    pub files_skipped: u64,
    /// Plaintext bytes handed to callers by reads.
    pub bytes_read: u64,
    /// Plaintext bytes accepted from callers by writes.
    pub bytes_written: u64,
    /// Plaintext bytes that entered an encoder.
    pub bytes_compressed: u64,
    /// Plaintext bytes that left a decoder.
    pub bytes_decompressed: u64,
    /// Per-algorithm file counts.
    pub algorithm_counts: HashMap<Algorithm, u64>,
}

impl StatsSnapshot {
    /// Overall compression ratio; zero until something was written.
    pub fn compression_ratio(&self) -> f64 {
        if self.bytes_written == 0 {
            return 0.0;
        }
        self.bytes_compressed as f64 / self.bytes_written as f64
    }

    /// Overall decompression ratio; zero until something was decompressed.
    pub fn decompression_ratio(&self) -> f64 {
        if self.bytes_decompressed == 0 {
            return 0.0;
        }
        self.bytes_read as f64 / self.bytes_decompressed as f64
    }
}
