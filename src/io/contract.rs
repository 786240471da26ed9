//! Primitive stream contracts
//!
//! [`ZioWrite`] and [`ZioRead`] carry the full primitive vocabulary. An
//! implementation only supplies raw byte movement, position, checksum and
//! close; every typed operation is derived from those and encodes big-endian.
//!
//! Strings carry a two-byte length: `0xFFFF` marks a null string, `0` an
//! empty one, anything else is followed by that many UTF-8 bytes.

use std::io;

use super::error::ZioError;
use super::version::{self, VERSION_ESCAPE};

/// Length prefix standing for a null string
pub const NULL_STRING_LEN: u16 = 0xFFFF;

/// Longest UTF-8 payload a string field can carry
pub const MAX_STRING_BYTES: usize = NULL_STRING_LEN as usize - 1;

const BYTE_VEC_CHUNK: usize = 64 * 1024;

/// Write side of a zio stream
pub trait ZioWrite {
    /// Write every byte of `src`.
    fn write_bytes(&mut self, src: &[u8]) -> io::Result<()>;

    /// Bytes produced so far. Fails once the stream is closed.
    fn position(&self) -> io::Result<u64>;

    /// Hex checksum of the bytes produced so far, `None` without an accumulator.
    fn checksum(&mut self) -> io::Result<Option<String>>;

    /// Finish the stream and return its final checksum. Repeated calls return
    /// the same value and do nothing else.
    fn close(&mut self) -> io::Result<Option<String>>;

    fn write_i8(&mut self, v: i8) -> io::Result<()> {
        self.write_bytes(&v.to_be_bytes())
    }

    fn write_u8(&mut self, v: u8) -> io::Result<()> {
        self.write_bytes(&[v])
    }

    fn write_i16(&mut self, v: i16) -> io::Result<()> {
        self.write_bytes(&v.to_be_bytes())
    }

    fn write_i32(&mut self, v: i32) -> io::Result<()> {
        self.write_bytes(&v.to_be_bytes())
    }

    fn write_i64(&mut self, v: i64) -> io::Result<()> {
        self.write_bytes(&v.to_be_bytes())
    }

    /// One byte, 1 for true
    fn write_bool(&mut self, v: bool) -> io::Result<()> {
        self.write_u8(u8::from(v))
    }

    /// A single UTF-16 code unit
    fn write_char16(&mut self, v: u16) -> io::Result<()> {
        self.write_bytes(&v.to_be_bytes())
    }

    fn write_f32(&mut self, v: f32) -> io::Result<()> {
        self.write_bytes(&v.to_be_bytes())
    }

    fn write_f64(&mut self, v: f64) -> io::Result<()> {
        self.write_bytes(&v.to_be_bytes())
    }

    /// Length-prefixed UTF-8 string; `None` writes the null marker.
    ///
    /// Strings of `0xFFFF` UTF-8 bytes or more are rejected before anything
    /// is written.
    fn write_string(&mut self, v: Option<&str>) -> io::Result<()> {
        let Some(s) = v else {
            return self.write_bytes(&NULL_STRING_LEN.to_be_bytes());
        };
        let bytes = s.as_bytes();
        if bytes.len() > MAX_STRING_BYTES {
            return Err(ZioError::StringOverflow {
                len: bytes.len(),
                limit: MAX_STRING_BYTES,
            }
            .into());
        }
        self.write_bytes(&(bytes.len() as u16).to_be_bytes())?;
        self.write_bytes(bytes)
    }

    /// Non-null string
    fn write_str(&mut self, v: &str) -> io::Result<()> {
        self.write_string(Some(v))
    }

    /// ASCII string without a length prefix, for format magic
    fn write_raw_string(&mut self, v: &str) -> io::Result<()> {
        if !v.is_ascii() {
            return Err(ZioError::NonAsciiRawString(v.to_owned()).into());
        }
        self.write_bytes(v.as_bytes())
    }

    fn write_version(&mut self, v: u32) -> io::Result<()> {
        let mut buf = [0u8; 5];
        let len = version::encode_version(v, &mut buf);
        self.write_bytes(&buf[..len])
    }
}

/// Read side of a zio stream
pub trait ZioRead {
    /// Fill `dst` completely or fail with end-of-stream.
    fn read_bytes(&mut self, dst: &mut [u8]) -> io::Result<()>;

    /// Bytes consumed so far. Fails once the stream is closed.
    fn position(&self) -> io::Result<u64>;

    /// Hex checksum of the bytes consumed so far, `None` without an accumulator.
    ///
    /// Bytes sitting in the buffer that no read has asked for are not included.
    fn checksum(&mut self) -> io::Result<Option<String>>;

    /// Release the stream and return its final checksum. Repeated calls
    /// return the same value and do nothing else.
    fn close(&mut self) -> io::Result<Option<String>>;

    fn read_i8(&mut self) -> io::Result<i8> {
        Ok(i8::from_be_bytes(read_array(self)?))
    }

    fn read_u8(&mut self) -> io::Result<u8> {
        Ok(u8::from_be_bytes(read_array(self)?))
    }

    fn read_i16(&mut self) -> io::Result<i16> {
        Ok(i16::from_be_bytes(read_array(self)?))
    }

    fn read_i32(&mut self) -> io::Result<i32> {
        Ok(i32::from_be_bytes(read_array(self)?))
    }

    fn read_i64(&mut self) -> io::Result<i64> {
        Ok(i64::from_be_bytes(read_array(self)?))
    }

    /// Any non-zero byte reads as true
    fn read_bool(&mut self) -> io::Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    fn read_char16(&mut self) -> io::Result<u16> {
        Ok(u16::from_be_bytes(read_array(self)?))
    }

    fn read_f32(&mut self) -> io::Result<f32> {
        Ok(f32::from_be_bytes(read_array(self)?))
    }

    fn read_f64(&mut self) -> io::Result<f64> {
        Ok(f64::from_be_bytes(read_array(self)?))
    }

    /// Length-prefixed UTF-8 string; the null marker reads as `None`.
    fn read_string(&mut self) -> io::Result<Option<String>> {
        let len = u16::from_be_bytes(read_array(self)?);
        if len == NULL_STRING_LEN {
            return Ok(None);
        }
        let bytes = self.read_byte_vec(usize::from(len))?;
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| ZioError::from(e).into())
    }

    /// Non-null string; a null marker is an error.
    fn read_str(&mut self) -> io::Result<String> {
        self.read_string()?
            .ok_or_else(|| ZioError::NullString.into())
    }

    /// Exactly `len` bytes as a fresh vector
    fn read_byte_vec(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut out = Vec::with_capacity(len.min(BYTE_VEC_CHUNK));
        let mut remaining = len;
        while remaining > 0 {
            let chunk = remaining.min(BYTE_VEC_CHUNK);
            let start = out.len();
            out.resize(start + chunk, 0);
            self.read_bytes(&mut out[start..])?;
            remaining -= chunk;
        }
        Ok(out)
    }

    /// Read `expected.len()` bytes and fail unless they spell `expected`.
    fn read_raw_string_and_validate(&mut self, expected: &str) -> io::Result<()> {
        let found = self.read_byte_vec(expected.len())?;
        if found == expected.as_bytes() {
            return Ok(());
        }
        Err(ZioError::HeaderMismatch {
            expected: expected.to_owned(),
            found: String::from_utf8_lossy(&found).into_owned(),
        }
        .into())
    }

    fn read_version(&mut self) -> io::Result<u32> {
        let lead = self.read_u8()?;
        if lead == VERSION_ESCAPE {
            Ok(u32::from_be_bytes(read_array(self)?))
        } else {
            Ok(u32::from(lead))
        }
    }

    /// Read a tag and fail unless it equals `expected`.
    fn read_version_expect(&mut self, expected: u32) -> io::Result<()> {
        let found = self.read_version()?;
        version::check_expected(found, expected)
    }

    /// Read a tag and fail unless it is one of `candidates`; returns the tag.
    fn read_version_one_of(&mut self, candidates: &[u32]) -> io::Result<u32> {
        let found = self.read_version()?;
        version::check_one_of(found, candidates)
    }
}

fn read_array<R: ZioRead + ?Sized, const N: usize>(input: &mut R) -> io::Result<[u8; N]> {
    let mut buf = [0u8; N];
    input.read_bytes(&mut buf)?;
    Ok(buf)
}
