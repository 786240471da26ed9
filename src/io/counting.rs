//! Discard sink that only counts bytes
//!
//! [`CountingOutput`] answers "how large would this be?" without storing
//! anything. It is never a terminal stream, so it refuses to close.

use std::io;

use super::contract::ZioWrite;
use super::error::ZioError;
use super::serialize::ZioEncode;

/// Output stream that discards bytes and counts them
#[derive(Clone, Copy, Debug, Default)]
pub struct CountingOutput {
    count: u64,
}

impl CountingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written so far
    pub fn len(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl ZioWrite for CountingOutput {
    fn write_bytes(&mut self, src: &[u8]) -> io::Result<()> {
        self.count += src.len() as u64;
        Ok(())
    }

    fn position(&self) -> io::Result<u64> {
        Ok(self.count)
    }

    fn checksum(&mut self) -> io::Result<Option<String>> {
        Ok(None)
    }

    fn close(&mut self) -> io::Result<Option<String>> {
        Err(ZioError::Unsupported("close on a counting output").into())
    }
}

/// Encoded size of `item` in bytes
///
/// # Examples
/// ```
/// use zio::serialized_len;
///
/// assert_eq!(serialized_len(&String::from("hello")).unwrap(), 7);
/// assert_eq!(serialized_len(&42i64).unwrap(), 8);
/// ```
pub fn serialized_len<T: ZioEncode + ?Sized>(item: &T) -> io::Result<u64> {
    let mut counter = CountingOutput::new();
    item.encode_zio(&mut counter)?;
    Ok(counter.len())
}
