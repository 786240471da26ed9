//! Compact version tags
//!
//! Tags below 255 take one byte. Anything larger is written as the escape
//! byte 255 followed by the full value as a big-endian `u32`.

use std::io;

use super::error::ZioError;

/// Leading byte announcing a four-byte tag
pub const VERSION_ESCAPE: u8 = 0xFF;

/// Encode `version` into `buf`, returning the number of bytes used (1 or 5).
///
/// # Examples
/// ```
/// use zio::version::encode_version;
///
/// let mut buf = [0u8; 5];
/// assert_eq!(encode_version(254, &mut buf), 1);
/// assert_eq!(encode_version(256, &mut buf), 5);
/// assert_eq!(buf, [0xFF, 0, 0, 1, 0]);
/// ```
pub fn encode_version(version: u32, buf: &mut [u8; 5]) -> usize {
    if version < u32::from(VERSION_ESCAPE) {
        buf[0] = version as u8;
        1
    } else {
        buf[0] = VERSION_ESCAPE;
        buf[1..].copy_from_slice(&version.to_be_bytes());
        5
    }
}

/// Encoded size of a tag
pub fn version_len(version: u32) -> usize {
    if version < u32::from(VERSION_ESCAPE) {
        1
    } else {
        5
    }
}

pub(crate) fn check_expected(found: u32, expected: u32) -> io::Result<()> {
    if found == expected {
        Ok(())
    } else {
        Err(ZioError::VersionMismatch { found, expected }.into())
    }
}

pub(crate) fn check_one_of(found: u32, candidates: &[u32]) -> io::Result<u32> {
    if candidates.contains(&found) {
        Ok(found)
    } else {
        Err(ZioError::VersionNotInSet {
            found,
            expected: candidates.to_vec(),
        }
        .into())
    }
}
