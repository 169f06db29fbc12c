//! Zstd dictionary training.

use crate::error::Result;

/// Train a zstd dictionary from representative samples.
///
/// The resulting blob can be supplied to the overlay configuration to
/// improve ratios on many small, similar files. `max_size` bounds the
/// dictionary size in bytes; 100 KiB to 1 MiB is the useful range.
pub fn train_zstd_dictionary<S: AsRef<[u8]>>(samples: &[S], max_size: usize) -> Result<Vec<u8>> {
    Ok(zstd::dict::from_samples(samples, max_size)?)
}
