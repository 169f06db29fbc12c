//! Compression algorithm selection and per-algorithm level contracts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// A supported compression algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Gzip (DEFLATE with gzip framing). Widest compatibility.
    Gzip,
    /// Zstandard — the balanced default (~3:1 at high speed).
    #[default]
    Zstd,
    /// LZ4 frame format — hot path, minimal CPU.
    Lz4,
    /// Brotli — highest ratio, slowest; suited to write-once data.
    Brotli,
    /// Snappy framed format — lowest CPU, modest ratio.
    Snappy,
}

impl Algorithm {
    /// Every supported algorithm, in canonical probe order.
    pub const ALL: [Algorithm; 5] = [
        Algorithm::Gzip,
        Algorithm::Zstd,
        Algorithm::Lz4,
        Algorithm::Brotli,
        Algorithm::Snappy,
    ];

    /// Canonical physical-name suffix, including the leading dot.
    pub fn suffix(self) -> &'static str {
        match self {
            Algorithm::Gzip => ".gz",
            Algorithm::Zstd => ".zst",
            Algorithm::Lz4 => ".lz4",
            Algorithm::Brotli => ".br",
            Algorithm::Snappy => ".sz",
        }
    }

    /// Default compression level.
    ///
    /// Levels are codec-specific: gzip 0-9, zstd speed bands, brotli 0-11.
    /// LZ4 and snappy expose no level knob and report a placeholder.
    pub fn default_level(self) -> i32 {
        match self {
            Algorithm::Gzip => 6,
            Algorithm::Zstd => 3,
            Algorithm::Lz4 => 1,
            Algorithm::Brotli => 6,
            Algorithm::Snappy => 0,
        }
    }
}

/// Map a suffix (canonical or alias, lowercase, leading dot) to its
/// algorithm.
pub fn algorithm_for_suffix(suffix: &str) -> Option<Algorithm> {
    match suffix {
        ".gz" | ".gzip" => Some(Algorithm::Gzip),
        ".zst" | ".zstd" => Some(Algorithm::Zstd),
        ".lz4" => Some(Algorithm::Lz4),
        ".br" => Some(Algorithm::Brotli),
        ".sz" | ".snappy" => Some(Algorithm::Snappy),
        _ => None,
    }
}

/// Clamp and remap a caller-facing integer level onto the codec's native
/// knobs.
///
/// - Gzip: negative means default (6); otherwise clamped to 0-9, where 0 is
///   stored-as-is.
/// - Zstd: four speed bands — `<=0` fastest (1), `<=3` default (3), `<=6`
///   better (7), anything higher best (19).
/// - Brotli: clamped to 0-11.
/// - LZ4 and snappy ignore the level entirely.
pub fn normalize_level(algo: Algorithm, level: i32) -> i32 {
    match algo {
        Algorithm::Gzip => {
            if level < 0 {
                6
            } else {
                level.min(9)
            }
        }
        Algorithm::Zstd => match level {
            l if l <= 0 => 1,
            l if l <= 3 => 3,
            l if l <= 6 => 7,
            _ => 19,
        },
        Algorithm::Brotli => level.clamp(0, 11),
        Algorithm::Lz4 | Algorithm::Snappy => 0,
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Algorithm::Gzip => "gzip",
            Algorithm::Zstd => "zstd",
            Algorithm::Lz4 => "lz4",
            Algorithm::Brotli => "brotli",
            Algorithm::Snappy => "snappy",
        };
        f.write_str(name)
    }
}

impl FromStr for Algorithm {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gzip" | "gz" => Ok(Algorithm::Gzip),
            "zstd" | "zst" => Ok(Algorithm::Zstd),
            "lz4" => Ok(Algorithm::Lz4),
            "brotli" | "br" => Ok(Algorithm::Brotli),
            "snappy" | "sz" => Ok(Algorithm::Snappy),
            other => Err(CodecError::UnknownAlgorithm {
                name: other.to_string(),
            }),
        }
    }
}
