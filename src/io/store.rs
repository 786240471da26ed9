//! Backing stores behind buffered zio streams
//!
//! A [`Source`] refills an input stream's working buffer; a [`Sink`] drains an
//! output stream's buffer. Each owns exactly one medium and gives it up in
//! `release`, which the stream calls once when it closes.

use std::fs::File;
use std::io::{self, Read, Write};

use tracing::trace;

use super::error::ZioError;

/// Medium an input stream pulls from
pub trait Source {
    /// Copy the next bytes into `spare`, returning how many landed.
    ///
    /// Returns 0 only once the medium is exhausted.
    fn fill(&mut self, spare: &mut [u8]) -> io::Result<usize>;

    /// Give up the medium
    fn release(&mut self) -> io::Result<()>;
}

/// Medium an output stream pushes to
pub trait Sink {
    /// Store every byte of `bytes`.
    fn drain(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Finalize and give up the medium
    fn release(&mut self) -> io::Result<()>;
}

/// Any [`Read`] as a stream source: files, cursors over byte arrays, pipes.
#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: Option<R>,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Some(reader),
        }
    }

    /// The wrapped reader, `None` after release
    pub fn get_ref(&self) -> Option<&R> {
        self.reader.as_ref()
    }
}

impl<R: Read> Source for ReaderSource<R> {
    fn fill(&mut self, spare: &mut [u8]) -> io::Result<usize> {
        let reader = self.reader.as_mut().ok_or(ZioError::Closed)?;
        loop {
            match reader.read(spare) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => return other,
            }
        }
    }

    fn release(&mut self) -> io::Result<()> {
        self.reader = None;
        Ok(())
    }
}

/// Write all of `bytes`, retrying short writes.
///
/// A short write is normal for files and pipes; only a write that accepts
/// nothing is an error.
fn write_fully<W: Write + ?Sized>(writer: &mut W, mut bytes: &[u8]) -> io::Result<()> {
    while !bytes.is_empty() {
        match writer.write(bytes) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "backing store accepted no bytes",
                ))
            }
            Ok(n) => {
                if n < bytes.len() {
                    trace!(written = n, remaining = bytes.len() - n, "partial write");
                }
                bytes = &bytes[n..];
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// File opened for writing
#[derive(Debug)]
pub struct FileSink {
    file: Option<File>,
    sync_on_close: bool,
}

impl FileSink {
    pub fn new(file: File, sync_on_close: bool) -> Self {
        Self {
            file: Some(file),
            sync_on_close,
        }
    }
}

impl Sink for FileSink {
    fn drain(&mut self, bytes: &[u8]) -> io::Result<()> {
        let file = self.file.as_mut().ok_or(ZioError::Closed)?;
        write_fully(file, bytes)
    }

    fn release(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
            if self.sync_on_close {
                file.sync_all()?;
            }
        }
        Ok(())
    }
}

/// Any [`Write`] as a stream sink
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: Option<W>,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Some(writer),
        }
    }

    /// The wrapped writer, `None` after release
    pub fn get_ref(&self) -> Option<&W> {
        self.writer.as_ref()
    }
}

impl<W: Write> Sink for WriterSink<W> {
    fn drain(&mut self, bytes: &[u8]) -> io::Result<()> {
        let writer = self.writer.as_mut().ok_or(ZioError::Closed)?;
        write_fully(writer, bytes)
    }

    fn release(&mut self) -> io::Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}

/// Growable byte array.
///
/// Capacity doubles (or grows to fit the incoming chunk, whichever is larger)
/// when a drain would overflow it; release trims it to the bytes written.
#[derive(Debug, Default)]
pub struct MemorySink {
    bytes: Vec<u8>,
    frozen: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
            frozen: false,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    /// True once the owning stream has closed
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl Sink for MemorySink {
    fn drain(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.frozen {
            return Err(ZioError::Closed.into());
        }
        let needed = self.bytes.len() + bytes.len();
        if needed > self.bytes.capacity() {
            let target = (self.bytes.capacity() * 2).max(needed);
            self.bytes.reserve_exact(target - self.bytes.len());
        }
        self.bytes.extend_from_slice(bytes);
        Ok(())
    }

    fn release(&mut self) -> io::Result<()> {
        self.bytes.shrink_to_fit();
        self.frozen = true;
        Ok(())
    }
}
