//! Magic-byte signatures and format detection.
//!
//! Brotli streams carry no reliable signature; its presence can only be
//! inferred from the file suffix, so [`detect`] never reports it.

use crate::algorithm::Algorithm;

/// How many leading bytes a probe must read to recognize any format.
pub const PROBE_LEN: usize = 10;

/// The magic prefix identifying a compressed stream, or an empty slice for
/// brotli.
pub fn magic(algo: Algorithm) -> &'static [u8] {
    match algo {
        Algorithm::Gzip => &[0x1f, 0x8b],
        Algorithm::Zstd => &[0x28, 0xb5, 0x2f, 0xfd],
        Algorithm::Lz4 => &[0x04, 0x22, 0x4d, 0x18],
        Algorithm::Brotli => &[],
        Algorithm::Snappy => &[0xff, 0x06, 0x00, 0x00, 0x73, 0x4e, 0x61, 0x50],
    }
}

/// Identify the compression format of `data` from its leading bytes.
pub fn detect(data: &[u8]) -> Option<Algorithm> {
    for algo in Algorithm::ALL {
        let sig = magic(algo);
        if !sig.is_empty() && data.len() >= sig.len() && &data[..sig.len()] == sig {
            return Some(algo);
        }
    }
    None
}
