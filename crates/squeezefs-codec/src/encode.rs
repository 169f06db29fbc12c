//! Streaming encoder construction.

use std::io::{self, Write};

use flate2::write::GzEncoder;
use flate2::Compression;
use lz4_flex::frame::FrameEncoder as Lz4Encoder;
use snap::write::FrameEncoder as SnapEncoder;
use tracing::debug;
use zstd::stream::write::Encoder as ZstdEncoder;

use crate::algorithm::{normalize_level, Algorithm};
use crate::error::Result;

/// Internal buffer size handed to codecs that want one.
const CODEC_BUF_SIZE: usize = 4096;

/// Brotli window size (log2); the library default.
const BROTLI_LG_WINDOW: u32 = 22;

/// A streaming compressor. Bytes written are plaintext; the compressed
/// stream is emitted to the writer the encoder was built over.
///
/// [`Encoder::finish`] must be called to flush the codec trailer; dropping
/// an unfinished encoder may leave a truncated stream.
pub trait Encoder: Write + Send {
    /// Flush any buffered input and write the codec's end-of-stream trailer.
    fn finish(self: Box<Self>) -> io::Result<()>;
}

impl<W: Write + Send> Encoder for GzEncoder<W> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        (*self).finish().map(|_| ())
    }
}

impl<W: Write + Send> Encoder for ZstdEncoder<'static, W> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        (*self).finish().map(|_| ())
    }
}

impl<W: Write + Send> Encoder for Lz4Encoder<W> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        (*self)
            .finish()
            .map(|_| ())
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}

impl<W: Write + Send> Encoder for brotli::CompressorWriter<W> {
    fn finish(mut self: Box<Self>) -> io::Result<()> {
        // The terminal metablock is emitted when the writer drops.
        self.flush()
    }
}

impl<W: Write + Send> Encoder for SnapEncoder<W> {
    fn finish(mut self: Box<Self>) -> io::Result<()> {
        self.flush()
    }
}

/// Build a streaming encoder for `algo` over `writer`.
///
/// The level is normalized per [`normalize_level`]. A zstd dictionary is
/// validated first and silently dropped when the codec rejects it, so bad
/// training data degrades ratio but never correctness.
pub fn new_encoder<W>(
    algo: Algorithm,
    writer: W,
    level: i32,
    dictionary: Option<&[u8]>,
) -> Result<Box<dyn Encoder>>
where
    W: Write + Send + 'static,
{
    let level = normalize_level(algo, level);
    match algo {
        Algorithm::Gzip => Ok(Box::new(GzEncoder::new(
            writer,
            Compression::new(level as u32),
        ))),
        Algorithm::Zstd => {
            if let Some(dict) = dictionary.filter(|d| !d.is_empty()) {
                if ZstdEncoder::with_dictionary(io::sink(), level, dict).is_ok() {
                    return Ok(Box::new(ZstdEncoder::with_dictionary(writer, level, dict)?));
                }
                debug!("zstd encoder rejected dictionary, compressing without it");
            }
            Ok(Box::new(ZstdEncoder::new(writer, level)?))
        }
        Algorithm::Lz4 => Ok(Box::new(Lz4Encoder::new(writer))),
        Algorithm::Brotli => Ok(Box::new(brotli::CompressorWriter::new(
            writer,
            CODEC_BUF_SIZE,
            level as u32,
            BROTLI_LG_WINDOW,
        ))),
        Algorithm::Snappy => Ok(Box::new(SnapEncoder::new(writer))),
    }
}
