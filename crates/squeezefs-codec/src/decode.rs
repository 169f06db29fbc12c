//! Streaming decoder construction.

use std::io::{self, Read};

use flate2::read::MultiGzDecoder;
use lz4_flex::frame::FrameDecoder as Lz4Decoder;
use snap::read::FrameDecoder as SnapDecoder;
use tracing::debug;
use zstd::stream::read::Decoder as ZstdDecoder;

use crate::algorithm::Algorithm;
use crate::error::Result;

/// Internal buffer size handed to codecs that want one.
const CODEC_BUF_SIZE: usize = 4096;

/// Build a streaming decoder for `algo` over `reader`.
///
/// The returned reader yields plaintext and signals end-of-stream through
/// the usual empty read. A zstd dictionary is validated first and dropped
/// when the codec rejects it, mirroring the encoder-side fallback.
pub fn new_decoder<R>(
    algo: Algorithm,
    reader: R,
    dictionary: Option<&[u8]>,
) -> Result<Box<dyn Read + Send>>
where
    R: Read + Send + 'static,
{
    match algo {
        Algorithm::Gzip => Ok(Box::new(MultiGzDecoder::new(reader))),
        Algorithm::Zstd => {
            if let Some(dict) = dictionary.filter(|d| !d.is_empty()) {
                if ZstdDecoder::with_dictionary(io::empty(), dict).is_ok() {
                    return Ok(Box::new(ZstdDecoder::with_dictionary(
                        io::BufReader::new(reader),
                        dict,
                    )?));
                }
                debug!("zstd decoder rejected dictionary, decoding without it");
            }
            Ok(Box::new(ZstdDecoder::new(reader)?))
        }
        Algorithm::Lz4 => Ok(Box::new(Lz4Decoder::new(reader))),
        Algorithm::Brotli => Ok(Box::new(brotli::Decompressor::new(reader, CODEC_BUF_SIZE))),
        Algorithm::Snappy => Ok(Box::new(SnapDecoder::new(reader))),
    }
}
