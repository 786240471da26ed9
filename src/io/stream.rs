//! Buffered zio streams
//!
//! [`ZioInput`] and [`ZioOutput`] implement the primitive contracts over a
//! [`WorkingBuffer`](super::buffer) and a pluggable backing store. Each
//! primitive first makes sure the buffer can service it whole (refill on
//! input, flush on output) and only then copies, so no value is ever split
//! across an exchange with the store.
//!
//! Checksums are computed lazily: bytes are fed to the accumulator right
//! before they leave the buffer, or when a checksum is requested.
//!
//! # Examples
//! ```
//! use zio::{StreamConfig, ZioInput, ZioOutput, ZioRead, ZioWrite};
//!
//! let mut out = ZioOutput::memory(&StreamConfig::default());
//! out.write_version(3).unwrap();
//! out.write_str("hello").unwrap();
//! let sum = out.close().unwrap();
//! let bytes = out.into_bytes().unwrap();
//!
//! let mut input = ZioInput::from_bytes(bytes, &StreamConfig::default());
//! input.read_version_expect(3).unwrap();
//! assert_eq!(input.read_str().unwrap(), "hello");
//! assert_eq!(input.close().unwrap(), sum);
//! ```

use std::fs::File;
use std::io::{self, Cursor};
use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use super::buffer::WorkingBuffer;
use super::checksum::Accumulator;
use super::config::StreamConfig;
use super::contract::{ZioRead, ZioWrite};
use super::error::ZioError;
use super::store::{FileSink, MemorySink, ReaderSource, Sink, Source};

/// Input stream over a file
pub type FileInput = ZioInput<ReaderSource<File>>;

/// Input stream over an owned byte array
pub type MemoryInput = ZioInput<ReaderSource<Cursor<Vec<u8>>>>;

/// Output stream into a file
pub type FileOutput = ZioOutput<FileSink>;

/// Output stream into a growable byte array
pub type MemoryOutput = ZioOutput<MemorySink>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lifecycle {
    Open,
    Closed,
    /// A store exchange failed part way; the stream accepts nothing more.
    Failed,
}

impl Lifecycle {
    fn ensure_open(self) -> io::Result<()> {
        match self {
            Lifecycle::Open => Ok(()),
            Lifecycle::Closed => Err(ZioError::Closed.into()),
            Lifecycle::Failed => Err(ZioError::Failed.into()),
        }
    }
}

/// Accumulates wall-clock time spent exchanging data with the backing store.
#[derive(Clone, Copy, Debug, Default)]
struct IoTimer {
    total: Duration,
    stopped: bool,
}

impl IoTimer {
    fn record(&mut self, started: Instant) {
        if !self.stopped {
            self.total += started.elapsed();
        }
    }

    fn stop(&mut self) -> Duration {
        self.stopped = true;
        self.total
    }
}

/// Buffered input stream pulling from a [`Source`]
pub struct ZioInput<S: Source> {
    source: S,
    buffer: WorkingBuffer,
    digest: Option<Accumulator>,
    /// Bytes consumed and dropped from the buffer by earlier refills
    base: u64,
    lifecycle: Lifecycle,
    final_checksum: Option<String>,
    io_timer: IoTimer,
}

impl<S: Source> ZioInput<S> {
    pub fn new(source: S, config: &StreamConfig) -> Self {
        let plan = config.buffer_plan();
        debug!(capacity = plan.capacity(), checksum = ?config.checksum, "opening zio input");
        Self {
            source,
            buffer: WorkingBuffer::new(plan),
            digest: Accumulator::new(config.checksum),
            base: 0,
            lifecycle: Lifecycle::Open,
            final_checksum: None,
            io_timer: IoTimer::default(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn is_closed(&self) -> bool {
        self.lifecycle == Lifecycle::Closed
    }

    /// Time spent waiting on the source so far
    pub fn io_time(&self) -> Duration {
        self.io_timer.total
    }

    fn ensure_open(&self) -> io::Result<()> {
        self.lifecycle.ensure_open()
    }

    fn digest_pending(&mut self) {
        if let Some(acc) = self.digest.as_mut() {
            acc.update(self.buffer.undigested());
        }
        self.buffer.mark_digested();
    }

    /// Make at least `needed` unconsumed bytes available. `needed` never
    /// exceeds the buffer capacity.
    fn refill(&mut self, needed: usize) -> io::Result<()> {
        self.digest_pending();
        self.base += self.buffer.compact() as u64;

        let started = Instant::now();
        while self.buffer.available() < needed {
            let n = match self.source.fill(self.buffer.spare_mut()) {
                Ok(n) => n,
                Err(e) => {
                    self.io_timer.record(started);
                    return Err(e);
                }
            };
            if n == 0 {
                self.io_timer.record(started);
                return Err(ZioError::EndOfStream {
                    needed,
                    available: self.buffer.available(),
                }
                .into());
            }
            self.buffer.advance_limit(n);
        }
        self.io_timer.record(started);
        trace!(
            available = self.buffer.available(),
            position = self.base,
            "refilled zio input"
        );
        Ok(())
    }
}

impl FileInput {
    /// Open `path` for reading; the file length serves as size hint.
    pub fn open<P: AsRef<Path>>(path: P, config: &StreamConfig) -> io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self::new(ReaderSource::new(file), &config.hinted(len)))
    }
}

impl MemoryInput {
    pub fn from_bytes(bytes: Vec<u8>, config: &StreamConfig) -> Self {
        let config = config.hinted(bytes.len() as u64);
        Self::new(ReaderSource::new(Cursor::new(bytes)), &config)
    }
}

impl<S: Source> ZioRead for ZioInput<S> {
    fn read_bytes(&mut self, dst: &mut [u8]) -> io::Result<()> {
        self.ensure_open()?;
        let capacity = self.buffer.capacity();
        if dst.len() <= capacity {
            if self.buffer.available() < dst.len() {
                self.refill(dst.len())?;
            }
            self.buffer.take_into(dst);
            return Ok(());
        }

        let mut filled = 0;
        while filled < dst.len() {
            let remaining = dst.len() - filled;
            if self.buffer.available() == 0 {
                self.refill(remaining.min(capacity))?;
            }
            let n = self.buffer.available().min(remaining);
            self.buffer.take_into(&mut dst[filled..filled + n]);
            filled += n;
        }
        Ok(())
    }

    fn position(&self) -> io::Result<u64> {
        self.ensure_open()?;
        Ok(self.base + self.buffer.offset() as u64)
    }

    fn checksum(&mut self) -> io::Result<Option<String>> {
        if self.is_closed() {
            return Ok(self.final_checksum.clone());
        }
        self.digest_pending();
        Ok(self.digest.as_ref().map(Accumulator::snapshot_hex))
    }

    fn close(&mut self) -> io::Result<Option<String>> {
        if self.is_closed() {
            return Ok(self.final_checksum.clone());
        }
        let io_time = self.io_timer.stop();
        self.digest_pending();
        let consumed = self.base + self.buffer.offset() as u64;
        self.final_checksum = self.digest.take().map(|acc| acc.snapshot_hex());
        self.buffer.release();
        self.lifecycle = Lifecycle::Closed;
        self.source.release()?;
        debug!(
            bytes = consumed,
            io_time_us = io_time.as_micros() as u64,
            checksum = self.final_checksum.as_deref().unwrap_or("-"),
            "closed zio input"
        );
        Ok(self.final_checksum.clone())
    }
}

/// Buffered output stream pushing to a [`Sink`]
///
/// Dropping an open output closes it; failures at that point can only be
/// logged, so call [`close`](ZioWrite::close) explicitly.
pub struct ZioOutput<S: Sink> {
    sink: S,
    buffer: WorkingBuffer,
    digest: Option<Accumulator>,
    /// Bytes already handed to the sink
    base: u64,
    lifecycle: Lifecycle,
    final_checksum: Option<String>,
    io_timer: IoTimer,
}

impl<S: Sink> ZioOutput<S> {
    pub fn new(sink: S, config: &StreamConfig) -> Self {
        let plan = config.buffer_plan();
        debug!(capacity = plan.capacity(), checksum = ?config.checksum, "opening zio output");
        Self {
            sink,
            buffer: WorkingBuffer::new(plan),
            digest: Accumulator::new(config.checksum),
            base: 0,
            lifecycle: Lifecycle::Open,
            final_checksum: None,
            io_timer: IoTimer::default(),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn is_closed(&self) -> bool {
        self.lifecycle == Lifecycle::Closed
    }

    /// True once a flush has failed. A failed output cannot be written,
    /// flushed or closed, since part of the pending buffer may already sit
    /// in the sink.
    pub fn is_failed(&self) -> bool {
        self.lifecycle == Lifecycle::Failed
    }

    /// Time spent waiting on the sink so far
    pub fn io_time(&self) -> Duration {
        self.io_timer.total
    }

    /// Push buffered bytes to the sink without closing.
    pub fn flush(&mut self) -> io::Result<()> {
        self.ensure_open()?;
        self.flush_buffer()
    }

    fn ensure_open(&self) -> io::Result<()> {
        self.lifecycle.ensure_open()
    }

    fn digest_pending(&mut self) {
        if let Some(acc) = self.digest.as_mut() {
            acc.update(self.buffer.undigested());
        }
        self.buffer.mark_digested();
    }

    fn flush_buffer(&mut self) -> io::Result<()> {
        self.digest_pending();
        let pending = self.buffer.pending().len();
        if pending == 0 {
            return Ok(());
        }
        let started = Instant::now();
        let result = self.sink.drain(self.buffer.pending());
        self.io_timer.record(started);
        if let Err(e) = result {
            warn!(position = self.base, pending, error = %e, "zio output flush failed");
            self.lifecycle = Lifecycle::Failed;
            return Err(e);
        }
        self.base += pending as u64;
        self.buffer.reset();
        trace!(flushed = pending, position = self.base, "flushed zio output");
        Ok(())
    }
}

impl FileOutput {
    /// Create (or truncate) `path` for writing.
    pub fn create<P: AsRef<Path>>(path: P, config: &StreamConfig) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(FileSink::new(file, config.sync_on_close), config))
    }
}

impl MemoryOutput {
    pub fn memory(config: &StreamConfig) -> Self {
        let initial = config.buffer_plan().capacity();
        Self::new(MemorySink::with_capacity(initial), config)
    }

    /// Written bytes, available once the stream is closed
    pub fn bytes(&self) -> Option<&[u8]> {
        self.is_closed().then(|| self.sink.as_slice())
    }

    /// Close the stream if needed and hand over the written bytes.
    pub fn into_bytes(mut self) -> io::Result<Vec<u8>> {
        self.close()?;
        Ok(std::mem::take(&mut self.sink).into_bytes())
    }
}

impl<S: Sink> ZioWrite for ZioOutput<S> {
    fn write_bytes(&mut self, src: &[u8]) -> io::Result<()> {
        self.ensure_open()?;
        if src.len() <= self.buffer.capacity() {
            if self.buffer.free() < src.len() {
                self.flush_buffer()?;
            }
            self.buffer.put(src);
            return Ok(());
        }

        let mut rest = src;
        while !rest.is_empty() {
            if self.buffer.free() == 0 {
                self.flush_buffer()?;
            }
            let n = self.buffer.free().min(rest.len());
            self.buffer.put(&rest[..n]);
            rest = &rest[n..];
        }
        Ok(())
    }

    fn position(&self) -> io::Result<u64> {
        self.ensure_open()?;
        Ok(self.base + self.buffer.offset() as u64)
    }

    fn checksum(&mut self) -> io::Result<Option<String>> {
        if self.is_closed() {
            return Ok(self.final_checksum.clone());
        }
        self.ensure_open()?;
        self.digest_pending();
        Ok(self.digest.as_ref().map(Accumulator::snapshot_hex))
    }

    fn close(&mut self) -> io::Result<Option<String>> {
        if self.is_closed() {
            return Ok(self.final_checksum.clone());
        }
        self.ensure_open()?;
        self.flush_buffer()?;
        let io_time = self.io_timer.stop();
        self.final_checksum = self.digest.take().map(|acc| acc.snapshot_hex());
        self.buffer.release();
        self.lifecycle = Lifecycle::Closed;
        self.sink.release()?;
        debug!(
            bytes = self.base,
            io_time_us = io_time.as_micros() as u64,
            checksum = self.final_checksum.as_deref().unwrap_or("-"),
            "closed zio output"
        );
        Ok(self.final_checksum.clone())
    }
}

impl<S: Sink> Drop for ZioOutput<S> {
    fn drop(&mut self) {
        if self.lifecycle != Lifecycle::Open {
            return;
        }
        warn!(position = self.base, "zio output dropped without close");
        if let Err(e) = self.close() {
            warn!(error = %e, "closing dropped zio output failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::checksum::{checksum_of, ChecksumAlgorithm};
    use crate::io::error::error_of;
    use crate::io::store::WriterSink;
    use std::io::Write;

    /// Accepts three bytes, fails once, then accepts everything.
    #[derive(Default)]
    struct FlakyWriter {
        bytes: Vec<u8>,
        calls: usize,
    }

    impl Write for FlakyWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.calls += 1;
            match self.calls {
                1 => {
                    let n = buf.len().min(3);
                    self.bytes.extend_from_slice(&buf[..n]);
                    Ok(n)
                }
                2 => Err(io::Error::other("disk hiccup")),
                _ => {
                    self.bytes.extend_from_slice(buf);
                    Ok(buf.len())
                }
            }
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn small() -> StreamConfig {
        StreamConfig::default().with_buffer_capacity(16)
    }

    #[test]
    fn test_values_straddle_flush_boundary() {
        let mut out = ZioOutput::memory(&small());
        for i in 0..10i64 {
            out.write_i64(i * 1_000_003).unwrap();
            out.write_i8(i as i8).unwrap();
        }
        assert_eq!(out.position().unwrap(), 90);
        let bytes = out.into_bytes().unwrap();
        assert_eq!(bytes.len(), 90);

        let mut input = ZioInput::from_bytes(bytes, &small());
        for i in 0..10i64 {
            assert_eq!(input.read_i64().unwrap(), i * 1_000_003);
            assert_eq!(input.read_i8().unwrap(), i as i8);
        }
        assert_eq!(input.position().unwrap(), 90);
    }

    #[test]
    fn test_byte_range_larger_than_buffer() {
        let payload: Vec<u8> = (0..100u8).collect();
        let mut out = ZioOutput::memory(&small());
        out.write_u8(7).unwrap();
        out.write_bytes(&payload).unwrap();
        let bytes = out.into_bytes().unwrap();

        let mut input = ZioInput::from_bytes(bytes, &small());
        assert_eq!(input.read_u8().unwrap(), 7);
        let mut back = vec![0u8; 100];
        input.read_bytes(&mut back).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn test_input_checksum_excludes_unread_bytes() {
        let data = b"abcdefgh".to_vec();
        let mut input = ZioInput::from_bytes(data, &StreamConfig::default());
        let mut head = [0u8; 3];
        input.read_bytes(&mut head).unwrap();

        let sum = input.checksum().unwrap().unwrap();
        assert_eq!(sum, checksum_of(ChecksumAlgorithm::Sha256, b"abc").unwrap());
    }

    #[test]
    fn test_checksum_mid_stream_then_continue() {
        let mut out = ZioOutput::memory(&small());
        out.write_bytes(b"0123456789").unwrap();
        let mid = out.checksum().unwrap().unwrap();
        assert_eq!(mid, checksum_of(ChecksumAlgorithm::Sha256, b"0123456789").unwrap());

        out.write_bytes(b"abcdefghij").unwrap();
        let fin = out.close().unwrap().unwrap();
        assert_eq!(
            fin,
            checksum_of(ChecksumAlgorithm::Sha256, b"0123456789abcdefghij").unwrap()
        );
    }

    #[test]
    fn test_eof_mid_value() {
        let mut input = ZioInput::from_bytes(vec![0, 0, 1], &StreamConfig::default());
        let err = input.read_i32().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert!(matches!(
            error_of(&err),
            Some(ZioError::EndOfStream {
                needed: 4,
                available: 3
            })
        ));
    }

    #[test]
    fn test_closed_stream_rejects_operations() {
        let mut out = ZioOutput::memory(&StreamConfig::default());
        out.write_i32(1).unwrap();
        let sum = out.close().unwrap();

        assert!(out.write_i32(2).is_err());
        assert!(out.position().is_err());
        assert_eq!(out.checksum().unwrap(), sum);
        assert_eq!(out.close().unwrap(), sum);
        assert_eq!(out.bytes(), Some(&[0u8, 0, 0, 1][..]));
    }

    #[test]
    fn test_checksum_disabled() {
        let config = StreamConfig::default().with_checksum(ChecksumAlgorithm::None);
        let mut out = ZioOutput::memory(&config);
        out.write_bool(true).unwrap();
        assert_eq!(out.checksum().unwrap(), None);
        assert_eq!(out.close().unwrap(), None);
    }

    #[test]
    fn test_io_timer_stops_at_close() {
        let mut timer = IoTimer::default();
        timer.record(Instant::now());
        let total = timer.stop();
        timer.record(Instant::now());
        assert_eq!(timer.total, total);
    }

    #[test]
    fn test_failed_flush_blocks_resend() {
        let sink = WriterSink::new(FlakyWriter::default());
        let mut out = ZioOutput::new(sink, &StreamConfig::default());
        out.write_i64(0x0102_0304_0506_0708).unwrap();

        let err = out.close().unwrap_err();
        assert_eq!(err.to_string(), "disk hiccup");
        assert!(out.is_failed());

        let err = out.close().unwrap_err();
        assert!(matches!(error_of(&err), Some(ZioError::Failed)));
        assert!(out.write_u8(9).is_err());
        assert!(out.flush().is_err());
        assert!(out.checksum().is_err());

        // Only the bytes accepted before the failure reached the writer.
        let writer = out.sink().get_ref().unwrap();
        assert_eq!(writer.bytes, [1, 2, 3]);
        assert_eq!(writer.calls, 2);
    }
}
