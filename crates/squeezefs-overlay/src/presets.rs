//! Preset configurations for common deployments.

use squeezefs_codec::Algorithm;

use crate::config::{AlgorithmRule, Config};

/// Skip patterns for content that is already compressed.
fn precompressed_patterns() -> Vec<String> {
    vec![
        r"\.(jpg|jpeg|png|gif|webp)$".to_string(),
        r"\.(mp4|mkv|avi|mov|webm)$".to_string(),
        r"\.(mp3|flac|ogg|m4a|aac)$".to_string(),
        r"\.(zip|gz|bz2|xz|7z|rar|tar)$".to_string(),
        r"\.(zst|lz4|br|sz|snappy)$".to_string(),
    ]
}

impl Config {
    /// Optimized for speed: LZ4, no minimum size, everything compressed.
    pub fn fastest() -> Config {
        Config {
            algorithm: Algorithm::Lz4,
            level: 0,
            ..Config::default()
        }
    }

    /// Recommended general-purpose settings: zstd level 3, very small files
    /// stored verbatim, precompressed formats skipped.
    pub fn recommended() -> Config {
        Config {
            algorithm: Algorithm::Zstd,
            level: 3,
            min_size: 512,
            skip_patterns: precompressed_patterns(),
            ..Config::default()
        }
    }

    /// Maximum ratio for write-once/read-many data: brotli 11.
    pub fn best_compression() -> Config {
        Config {
            algorithm: Algorithm::Brotli,
            level: 11,
            buffer_size: 128 * 1024,
            min_size: 1024,
            skip_patterns: precompressed_patterns(),
            ..Config::default()
        }
    }

    /// Gzip for maximum interoperability with external tooling.
    pub fn compatible() -> Config {
        Config {
            algorithm: Algorithm::Gzip,
            level: 6,
            min_size: 512,
            skip_patterns: precompressed_patterns(),
            ..Config::default()
        }
    }

    /// Minimal CPU cost: framed snappy with a larger skip floor.
    pub fn low_cpu() -> Config {
        Config {
            algorithm: Algorithm::Snappy,
            level: 0,
            buffer_size: 32 * 1024,
            min_size: 1024,
            skip_patterns: precompressed_patterns(),
            ..Config::default()
        }
    }

    /// Per-file-type algorithm selection with auto-tuning enabled.
    pub fn smart() -> Config {
        Config {
            algorithm: Algorithm::Zstd,
            level: 3,
            min_size: 512,
            skip_patterns: precompressed_patterns(),
            algorithm_rules: vec![
                // Logs favor throughput.
                AlgorithmRule::new(r"\.log$", Algorithm::Lz4, 0),
                AlgorithmRule::new(r"/logs/", Algorithm::Lz4, 0),
                // Structured text compresses well; spend more CPU on it.
                AlgorithmRule::new(r"\.(json|xml|yaml|yml)$", Algorithm::Zstd, 6),
                // Scratch files get the cheapest codec.
                AlgorithmRule::new(r"\.tmp$", Algorithm::Snappy, 0),
                AlgorithmRule::new(r"/tmp/", Algorithm::Snappy, 0),
                // Source code: balanced.
                AlgorithmRule::new(r"\.(rs|js|ts|py|java|c|cpp|h|hpp)$", Algorithm::Zstd, 3),
            ],
            enable_auto_tuning: true,
            ..Config::default()
        }
    }

    /// High-throughput ingest: LZ4 with a large streaming buffer.
    pub fn high_performance() -> Config {
        Config {
            algorithm: Algorithm::Lz4,
            level: 0,
            buffer_size: 256 * 1024,
            min_size: 1024,
            skip_patterns: precompressed_patterns(),
            ..Config::default()
        }
    }

    /// Long-term storage: brotli 11 with heavier rules for text formats.
    pub fn archival() -> Config {
        Config {
            algorithm: Algorithm::Brotli,
            level: 11,
            buffer_size: 128 * 1024,
            min_size: 1024,
            skip_patterns: precompressed_patterns(),
            algorithm_rules: vec![
                AlgorithmRule::new(r"\.(txt|log|csv)$", Algorithm::Brotli, 11),
                AlgorithmRule::new(r"\.(json|xml|yaml|yml)$", Algorithm::Brotli, 11),
                AlgorithmRule::new(r"\.(rs|js|ts|py|java|c|cpp)$", Algorithm::Zstd, 15),
            ],
            ..Config::default()
        }
    }
}
