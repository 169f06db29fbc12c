//! One-shot byte-slice helpers and ratio math.

use std::io::{Cursor, Read, Write};
use std::sync::{Arc, Mutex};

use crate::algorithm::Algorithm;
use crate::decode::new_decoder;
use crate::encode::new_encoder;
use crate::error::Result;

/// A `Write` sink backed by a shared growable buffer. The encoder owns one
/// clone while the caller keeps the other to collect the output.
#[derive(Clone)]
struct SharedVec(Arc<Mutex<Vec<u8>>>);

impl Write for SharedVec {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Compress `data` in one shot.
pub fn compress_bytes(data: &[u8], algo: Algorithm, level: i32) -> Result<Vec<u8>> {
    let out = Arc::new(Mutex::new(Vec::new()));
    let mut encoder = new_encoder(algo, SharedVec(Arc::clone(&out)), level, None)?;
    encoder.write_all(data)?;
    encoder.finish()?;
    let bytes = std::mem::take(&mut *out.lock().unwrap());
    Ok(bytes)
}

/// Decompress `data` in one shot.
pub fn decompress_bytes(data: &[u8], algo: Algorithm) -> Result<Vec<u8>> {
    let mut decoder = new_decoder(algo, Cursor::new(data.to_vec()), None)?;
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Compressed-to-original size ratio; lower is better. Zero when the
/// original size is unknown.
pub fn compression_ratio(original: u64, compressed: u64) -> f64 {
    if original == 0 {
        return 0.0;
    }
    compressed as f64 / original as f64
}

/// Space saved by compression, as a percentage of the original size.
pub fn space_savings_percent(original: u64, compressed: u64) -> f64 {
    if original == 0 {
        return 0.0;
    }
    (1.0 - compressed as f64 / original as f64) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::magic::detect;

    #[test]
    fn round_trip_every_algorithm() {
        let data = b"the quick brown fox jumps over the lazy dog, repeatedly, \
                     the quick brown fox jumps over the lazy dog";
        for algo in Algorithm::ALL {
            let compressed = compress_bytes(data, algo, algo.default_level()).unwrap();
            let restored = decompress_bytes(&compressed, algo).unwrap();
            assert_eq!(restored, data, "{algo} failed to round-trip");
        }
    }

    #[test]
    fn round_trip_empty_input() {
        for algo in Algorithm::ALL {
            let compressed = compress_bytes(&[], algo, algo.default_level()).unwrap();
            let restored = decompress_bytes(&compressed, algo).unwrap();
            assert!(restored.is_empty(), "{algo} corrupted empty input");
        }
    }

    #[test]
    fn compressed_output_carries_magic() {
        let data = vec![b'a'; 1024];
        for algo in [Algorithm::Gzip, Algorithm::Zstd, Algorithm::Lz4, Algorithm::Snappy] {
            let compressed = compress_bytes(&data, algo, algo.default_level()).unwrap();
            assert_eq!(detect(&compressed), Some(algo), "{algo} magic missing");
        }
    }

    #[test]
    fn brotli_output_is_not_detected() {
        let compressed = compress_bytes(b"some text", Algorithm::Brotli, 6).unwrap();
        assert_eq!(detect(&compressed), None);
    }

    #[test]
    fn incompressible_data_survives() {
        use rand::RngCore;
        let mut data = vec![0u8; 64 * 1024];
        rand::thread_rng().fill_bytes(&mut data);
        for algo in Algorithm::ALL {
            let compressed = compress_bytes(&data, algo, algo.default_level()).unwrap();
            let restored = decompress_bytes(&compressed, algo).unwrap();
            assert_eq!(restored, data);
        }
    }

    #[test]
    fn level_zero_gzip_stores_verbatim_payload() {
        let data = vec![b'x'; 4096];
        let stored = compress_bytes(&data, Algorithm::Gzip, 0).unwrap();
        // Stored mode still frames the payload, so output exceeds input.
        assert!(stored.len() > data.len());
        assert_eq!(decompress_bytes(&stored, Algorithm::Gzip).unwrap(), data);
    }

    #[test]
    fn ratio_math() {
        assert_eq!(compression_ratio(100, 50), 0.5);
        assert_eq!(compression_ratio(0, 50), 0.0);
        assert_eq!(space_savings_percent(100, 25), 75.0);
        assert_eq!(space_savings_percent(0, 25), 0.0);
    }
}
