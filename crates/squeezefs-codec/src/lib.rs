#![warn(missing_docs)]

//! Streaming compression codecs for squeezefs.
//!
//! One registry over five formats — gzip, zstd, lz4, brotli, snappy — each
//! exposed as a streaming encoder/decoder factory plus the static tables
//! the overlay needs: canonical suffixes with accepted aliases, magic-byte
//! signatures, and per-codec level contracts.

pub mod algorithm;
pub mod decode;
pub mod dict;
pub mod encode;
pub mod error;
pub mod helpers;
pub mod magic;

pub use algorithm::{algorithm_for_suffix, normalize_level, Algorithm};
pub use decode::new_decoder;
pub use dict::train_zstd_dictionary;
pub use encode::{new_encoder, Encoder};
pub use error::{CodecError, Result};
pub use helpers::{compress_bytes, compression_ratio, decompress_bytes, space_savings_percent};
pub use magic::{detect, magic, PROBE_LEN};
