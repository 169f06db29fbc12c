//! The per-file compression state machine.
//!
//! Write mode stages plaintext in memory and binds the codec at close,
//! because auto-tuning needs the final size. Read mode probes the first
//! bytes against the codec signatures and seeks back before wiring a
//! decoder, because a suffix-tagged physical file may legitimately hold
//! plaintext (the demotion path).

use std::io::{self, Read, SeekFrom, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use squeezefs_codec::{self as codec, Algorithm};
use squeezefs_vfs::{write_all, DirEntry, Metadata, OpenFlags, VfsError, VfsFile};

use crate::error::OverlayError;
use crate::fs::Shared;
use crate::names;

/// The underlying file, shared between the handle and a streaming decoder.
/// The mutex serializes interleaved access from both sides.
#[derive(Clone)]
pub(crate) struct SharedFile(Arc<Mutex<Box<dyn VfsFile>>>);

impl SharedFile {
    fn new(file: Box<dyn VfsFile>) -> SharedFile {
        SharedFile(Arc::new(Mutex::new(file)))
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn VfsFile>> {
        self.0.lock().unwrap()
    }
}

impl Read for SharedFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.lock().read(buf)
    }
}

impl Write for SharedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

enum HandleState {
    /// Passthrough: skipped files, plaintext reads, empty files.
    Plain,
    /// Write mode: plaintext accumulates until close.
    Staged {
        buf: Vec<u8>,
        algorithm: Algorithm,
        /// Rule-derived level, or 0 when the defaults applied at open and
        /// the final level is chosen at close.
        level: i32,
    },
    /// Read mode with a decoder between the caller and the file.
    Coded {
        decoder: Box<dyn Read + Send>,
        algorithm: Algorithm,
    },
}

/// A logical file handle produced by the overlay.
pub struct CompressedFile {
    shared: Arc<Shared>,
    base: SharedFile,
    logical: String,
    physical: String,
    state: HandleState,
    bytes_read: u64,
    bytes_written: u64,
    closed: bool,
}

impl CompressedFile {
    pub(crate) fn new(
        shared: Arc<Shared>,
        base_file: Box<dyn VfsFile>,
        logical: &str,
        physical: &str,
        flags: OpenFlags,
        algo_hint: Option<Algorithm>,
    ) -> CompressedFile {
        let base = SharedFile::new(base_file);
        let hint = algo_hint.filter(|_| !shared.policy.should_skip(logical));
        let mut state = HandleState::Plain;

        if flags.wants_write() {
            if let Some(algorithm) = hint {
                let cfg = shared.config.read().unwrap();
                let sel = shared.policy.select(&cfg, logical, 0);
                let level = if sel.used_defaults { 0 } else { sel.level };
                state = HandleState::Staged {
                    buf: Vec::with_capacity(cfg.buffer_size),
                    algorithm,
                    level,
                };
            }
        } else if !flags.is_create() {
            let is_empty = matches!(base.lock().stat(), Ok(m) if m.size == 0);
            if !is_empty {
                if let Some(hinted) = hint {
                    state = probe_with_hint(&shared, &base, hinted);
                } else if shared.config.read().unwrap().auto_detect {
                    state = probe_auto(&shared, &base);
                }
            }
        }

        CompressedFile {
            shared,
            base,
            logical: logical.to_string(),
            physical: physical.to_string(),
            state,
            bytes_read: 0,
            bytes_written: 0,
            closed: false,
        }
    }

    /// The codec wired into this handle: the staged write algorithm, the
    /// detected read algorithm, or `None` in passthrough mode.
    pub fn algorithm(&self) -> Option<Algorithm> {
        match &self.state {
            HandleState::Staged { algorithm, .. } => Some(*algorithm),
            HandleState::Coded { algorithm, .. } => Some(*algorithm),
            HandleState::Plain => None,
        }
    }

    /// The physical name this handle is bound to.
    pub fn physical_name(&self) -> &str {
        &self.physical
    }

    /// Plaintext bytes moved through the handle so far: decoded output in
    /// read mode, staged input in write mode.
    pub fn plaintext_size(&self) -> u64 {
        match self.state {
            HandleState::Coded { .. } => self.bytes_read,
            _ => self.bytes_written.max(self.bytes_read),
        }
    }

    fn closed_err() -> io::Error {
        VfsError::Closed.into_io()
    }

    fn seek_err() -> io::Error {
        io::Error::new(io::ErrorKind::Unsupported, OverlayError::SeekNotSupported)
    }

    fn is_passthrough(&self) -> bool {
        matches!(self.state, HandleState::Plain)
    }
}

/// Fill `buf` from the file's current position, stopping early at EOF.
fn read_probe(base: &SharedFile, buf: &mut [u8]) -> io::Result<usize> {
    let mut file = base.lock();
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Read path when the physical suffix names an algorithm: verify with the
/// magic probe, seek back, and wire a decoder. Suffixes without reliable
/// magic (brotli, snappy) are trusted. Any failure degrades to plaintext.
fn probe_with_hint(shared: &Arc<Shared>, base: &SharedFile, hinted: Algorithm) -> HandleState {
    let mut prefix = [0u8; codec::PROBE_LEN];
    let n = match read_probe(base, &mut prefix) {
        Ok(n) => n,
        Err(_) => return HandleState::Plain,
    };
    let detected = codec::detect(&prefix[..n]);

    if base.lock().seek(SeekFrom::Start(0)).is_err() {
        // Cannot rewind; serve whatever follows the probe as plaintext.
        return HandleState::Plain;
    }

    let (algorithm, decode) = match detected {
        Some(found) => (found, true),
        None => match hinted {
            Algorithm::Brotli | Algorithm::Snappy => (hinted, true),
            _ => (hinted, false),
        },
    };
    if !decode {
        debug!(
            "suffix names {} but no magic matched; reading {} as plaintext",
            hinted,
            base.lock().name()
        );
        return HandleState::Plain;
    }

    match make_decoder(shared, base.clone(), algorithm) {
        Ok(decoder) => HandleState::Coded { decoder, algorithm },
        Err(_) => HandleState::Plain,
    }
}

/// Read path without a suffix hint: a magic match decides everything.
fn probe_auto(shared: &Arc<Shared>, base: &SharedFile) -> HandleState {
    let mut prefix = [0u8; codec::PROBE_LEN];
    let n = match read_probe(base, &mut prefix) {
        Ok(n) => n,
        Err(_) => return HandleState::Plain,
    };
    if n == 0 {
        return HandleState::Plain;
    }

    let Some(algorithm) = codec::detect(&prefix[..n]) else {
        let _ = base.lock().seek(SeekFrom::Start(0));
        return HandleState::Plain;
    };

    if base.lock().seek(SeekFrom::Start(0)).is_err() {
        return HandleState::Plain;
    }

    match make_decoder(shared, base.clone(), algorithm) {
        Ok(decoder) => HandleState::Coded { decoder, algorithm },
        Err(_) => HandleState::Plain,
    }
}

fn make_decoder(
    shared: &Arc<Shared>,
    reader: SharedFile,
    algorithm: Algorithm,
) -> codec::Result<Box<dyn Read + Send>> {
    let dict = {
        let cfg = shared.config.read().unwrap();
        (algorithm == Algorithm::Zstd && !cfg.zstd_dictionary.is_empty())
            .then(|| cfg.zstd_dictionary.clone())
    };
    codec::new_decoder(algorithm, reader, dict.as_deref())
}

impl VfsFile for CompressedFile {
    fn name(&self) -> &str {
        &self.logical
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.closed {
            return Err(Self::closed_err());
        }
        match &mut self.state {
            HandleState::Coded { decoder, .. } => {
                let n = decoder.read(buf)?;
                if n > 0 {
                    self.bytes_read += n as u64;
                    self.shared.stats.add_bytes_read(n as u64);
                }
                Ok(n)
            }
            _ => {
                let n = self.base.lock().read(buf)?;
                if n > 0 {
                    self.bytes_read += n as u64;
                    self.shared.stats.add_bytes_read(n as u64);
                }
                Ok(n)
            }
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.closed {
            return Err(Self::closed_err());
        }
        match &mut self.state {
            HandleState::Staged { buf: staging, .. } => {
                staging.extend_from_slice(buf);
                self.bytes_written += buf.len() as u64;
                Ok(buf.len())
            }
            _ => {
                let n = self.base.lock().write(buf)?;
                if n > 0 {
                    self.bytes_written += n as u64;
                    self.shared.stats.add_bytes_written(n as u64);
                }
                Ok(n)
            }
        }
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        if self.closed {
            return Err(Self::closed_err());
        }
        if !self.is_passthrough() {
            return Err(Self::seek_err());
        }
        self.base.lock().seek(pos)
    }

    fn stat(&self) -> squeezefs_vfs::Result<Metadata> {
        self.base.lock().stat()
    }

    fn sync(&mut self) -> squeezefs_vfs::Result<()> {
        if self.closed {
            return Err(VfsError::Closed);
        }
        self.base.lock().sync()
    }

    fn close(&mut self) -> squeezefs_vfs::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        fn record_err(err: VfsError, first: &mut Option<VfsError>) {
            if first.is_none() {
                *first = Some(err);
            }
        }

        let mut first_err: Option<VfsError> = None;
        let mut base_closed = false;

        match std::mem::replace(&mut self.state, HandleState::Plain) {
            HandleState::Staged {
                buf,
                algorithm: _,
                level,
            } => {
                let staged = buf.len() as u64;
                if staged > 0 {
                    let (selection, min_size, dict) = {
                        let cfg = self.shared.config.read().unwrap();
                        let sel = self.shared.policy.select(&cfg, &self.logical, staged);
                        let dict = (sel.algorithm == Algorithm::Zstd
                            && !cfg.zstd_dictionary.is_empty())
                        .then(|| cfg.zstd_dictionary.clone());
                        (sel, cfg.min_size, dict)
                    };
                    // A level recorded at open came from a rule and wins over
                    // auto-tune; the sentinel 0 defers to the close-time pick.
                    let final_level = if level != 0 { level } else { selection.level };

                    if staged < min_size {
                        if let Err(e) = write_all(self.base.lock().as_mut(), &buf) {
                            record_err(VfsError::Io(e), &mut first_err);
                        }
                        self.shared.stats.inc_files_skipped();
                        debug!(
                            "{} staged {} bytes, below floor {}; storing verbatim",
                            self.logical, staged, min_size
                        );
                        if self.physical != self.logical
                            && names::has_compression_suffix(&self.physical)
                        {
                            // The physical name promises a codec stream it no
                            // longer carries; move it back to the logical name.
                            if let Err(e) = self.base.lock().close() {
                                record_err(e, &mut first_err);
                            }
                            base_closed = true;
                            if let Err(e) = self.shared.base.rename(&self.physical, &self.logical)
                            {
                                // Non-fatal: the bytes are plaintext and reads
                                // recover through the auto-detect probe.
                                warn!(
                                    "demotion rename {} -> {} failed: {}",
                                    self.physical, self.logical, e
                                );
                            }
                        }
                    } else {
                        match codec::new_encoder(
                            selection.algorithm,
                            self.base.clone(),
                            final_level,
                            dict.as_deref(),
                        ) {
                            Ok(mut encoder) => {
                                debug!(
                                    "compressing {} with {} level {} ({} bytes staged)",
                                    self.logical, selection.algorithm, final_level, staged
                                );
                                let result =
                                    encoder.write_all(&buf).and_then(|()| encoder.finish());
                                match result {
                                    Ok(()) => {
                                        self.shared.stats.inc_files_compressed();
                                        self.shared.stats.add_bytes_written(self.bytes_written);
                                        self.shared.stats.add_bytes_compressed(self.bytes_written);
                                        self.shared.stats.inc_algorithm(selection.algorithm);
                                    }
                                    Err(e) => record_err(VfsError::Io(e), &mut first_err),
                                }
                            }
                            Err(e) => record_err(
                                VfsError::Io(io::Error::new(io::ErrorKind::Other, e)),
                                &mut first_err,
                            ),
                        }
                    }
                }
                // An empty staging buffer leaves an empty underlying file:
                // no codec frame, no counter changes.
            }
            HandleState::Coded { decoder, algorithm } => {
                drop(decoder);
                self.shared.stats.inc_files_decompressed();
                self.shared.stats.add_bytes_decompressed(self.bytes_read);
                self.shared.stats.inc_algorithm(algorithm);
            }
            HandleState::Plain => {}
        }

        if !base_closed {
            if let Err(e) = self.base.lock().close() {
                record_err(e, &mut first_err);
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        if self.closed {
            return Err(Self::closed_err());
        }
        if !self.is_passthrough() {
            return Err(Self::seek_err());
        }
        self.base.lock().read_at(buf, offset)
    }

    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize> {
        if self.closed {
            return Err(Self::closed_err());
        }
        if !self.is_passthrough() {
            return Err(Self::seek_err());
        }
        self.base.lock().write_at(buf, offset)
    }

    fn truncate(&mut self, size: u64) -> io::Result<()> {
        if self.closed {
            return Err(Self::closed_err());
        }
        if !self.is_passthrough() {
            return Err(Self::seek_err());
        }
        self.base.lock().truncate(size)
    }

    fn read_dir_entries(&mut self) -> squeezefs_vfs::Result<Vec<DirEntry>> {
        if self.closed {
            return Err(VfsError::Closed);
        }
        self.base.lock().read_dir_entries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use squeezefs_vfs::{MemFs, Vfs};

    #[test]
    fn shared_file_reads_through_clones() {
        let fs = MemFs::new();
        let mut w = fs.create("f").unwrap();
        w.write(b"abcdef").unwrap();
        w.close().unwrap();

        let shared = SharedFile::new(fs.open("f").unwrap());
        let mut a = shared.clone();
        let mut b = shared;

        let mut buf = [0u8; 3];
        a.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"abc");
        // The clone shares the cursor.
        b.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"def");
    }

    #[test]
    fn read_probe_stops_at_eof() {
        let fs = MemFs::new();
        let mut w = fs.create("short").unwrap();
        w.write(b"xyz").unwrap();
        w.close().unwrap();

        let shared = SharedFile::new(fs.open("short").unwrap());
        let mut buf = [0u8; 10];
        assert_eq!(read_probe(&shared, &mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"xyz");
    }
}
