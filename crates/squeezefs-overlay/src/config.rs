//! Overlay configuration.

use serde::{Deserialize, Serialize};

use squeezefs_codec::Algorithm;

/// Pattern-based algorithm selection. Rules are evaluated in order against
/// logical names; the first match wins over both the configured default and
/// auto-tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmRule {
    /// Regex matched against the logical file name.
    pub pattern: String,
    /// Algorithm applied to matching files.
    pub algorithm: Algorithm,
    /// Level override. Negative means "use the algorithm's default level";
    /// zero and above are used verbatim.
    pub level: i32,
}

impl AlgorithmRule {
    pub fn new(pattern: impl Into<String>, algorithm: Algorithm, level: i32) -> Self {
        AlgorithmRule {
            pattern: pattern.into(),
            algorithm,
            level,
        }
    }
}

/// Configuration for a compression overlay.
///
/// Only `algorithm` and `level` can be changed after construction (via
/// [`crate::CompressFs::set_algorithm`] and [`crate::CompressFs::set_level`]);
/// the remaining fields are fixed once the overlay is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Default codec applied to writes.
    pub algorithm: Algorithm,

    /// Default compression level; interpretation is codec-specific
    /// (gzip 0-9, zstd speed bands, brotli 0-11, ignored by lz4/snappy).
    pub level: i32,

    /// Ordered regexes; files matching any of them are stored verbatim.
    pub skip_patterns: Vec<String>,

    /// Ordered per-pattern algorithm overrides; first match wins.
    pub algorithm_rules: Vec<AlgorithmRule>,

    /// On read, probe magic bytes when the physical suffix gives no hint.
    pub auto_detect: bool,

    /// Append the codec suffix to the full name (`a.txt.gz`) instead of
    /// replacing the logical extension (`a.gz`).
    pub preserve_extension: bool,

    /// Hide codec suffixes from callers and probe for them on lookup.
    pub strip_extension: bool,

    /// Capacity hint for staging and streaming buffers.
    pub buffer_size: usize,

    /// Writes smaller than this (measured at close) are stored verbatim.
    pub min_size: u64,

    /// Lower the compression level for large inputs when no rule matched.
    pub enable_auto_tuning: bool,

    /// Size at and above which auto-tuning applies.
    pub auto_tune_size_threshold: u64,

    /// Optional pre-trained zstd dictionary shared across files.
    pub zstd_dictionary: Vec<u8>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            algorithm: Algorithm::Zstd,
            level: 3,
            skip_patterns: Vec::new(),
            algorithm_rules: Vec::new(),
            auto_detect: true,
            preserve_extension: true,
            strip_extension: true,
            buffer_size: 64 * 1024,
            min_size: 0,
            enable_auto_tuning: false,
            auto_tune_size_threshold: 1024 * 1024,
            zstd_dictionary: Vec::new(),
        }
    }
}
