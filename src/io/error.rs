//! Error values raised by zio streams
//!
//! Every failure leaves the crate as a [`std::io::Error`]; the descriptive
//! [`ZioError`] rides along as the payload so callers that care can recover it
//! with [`error_of`].

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ZioError {
    #[error("end of stream: needed {needed} bytes, only {available} available")]
    EndOfStream { needed: usize, available: usize },

    #[error("version mismatch: read {found}, expected {expected}")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("version mismatch: read {found}, expected one of {expected:?}")]
    VersionNotInSet { found: u32, expected: Vec<u32> },

    #[error("header mismatch: expected {expected:?}, found {found:?}")]
    HeaderMismatch { expected: String, found: String },

    #[error("string too long: {len} UTF-8 bytes (limit {limit})")]
    StringOverflow { len: usize, limit: usize },

    #[error("raw string must be ASCII: {0:?}")]
    NonAsciiRawString(String),

    #[error("invalid UTF-8 in string field: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("required string was null")]
    NullString,

    #[error("preloaded container holds {expected} entries but stream stores {found}")]
    CountMismatch { expected: usize, found: usize },

    #[error("preloaded map key mismatch at index {index}: expected {expected:?}, found {found:?}")]
    KeyMismatch {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("negative element count: {0}")]
    NegativeCount(i32),

    #[error("stream is closed")]
    Closed,

    #[error("stream aborted after a failed store exchange")]
    Failed,

    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("corrupt envelope: {0}")]
    Envelope(String),
}

impl ZioError {
    fn kind(&self) -> io::ErrorKind {
        match self {
            ZioError::EndOfStream { .. } => io::ErrorKind::UnexpectedEof,
            ZioError::Unsupported(_) => io::ErrorKind::Unsupported,
            ZioError::StringOverflow { .. } | ZioError::NonAsciiRawString(_) => {
                io::ErrorKind::InvalidInput
            }
            ZioError::Closed | ZioError::Failed => io::ErrorKind::Other,
            _ => io::ErrorKind::InvalidData,
        }
    }

    /// Wrap into the `io::Error` every stream operation returns.
    pub fn into_io(self) -> io::Error {
        io::Error::new(self.kind(), self)
    }
}

impl From<ZioError> for io::Error {
    fn from(err: ZioError) -> Self {
        err.into_io()
    }
}

/// Recover the [`ZioError`] carried by an `io::Error`, if it has one.
pub fn error_of(err: &io::Error) -> Option<&ZioError> {
    err.get_ref().and_then(|inner| inner.downcast_ref::<ZioError>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let eof: io::Error = ZioError::EndOfStream {
            needed: 4,
            available: 1,
        }
        .into();
        assert_eq!(eof.kind(), io::ErrorKind::UnexpectedEof);

        let unsupported: io::Error = ZioError::Unsupported("close").into();
        assert_eq!(unsupported.kind(), io::ErrorKind::Unsupported);
    }

    #[test]
    fn test_downcast_roundtrip() {
        let err: io::Error = ZioError::VersionMismatch {
            found: 3,
            expected: 2,
        }
        .into();
        assert!(matches!(
            error_of(&err),
            Some(ZioError::VersionMismatch {
                found: 3,
                expected: 2
            })
        ));
        assert!(err.to_string().contains("read 3, expected 2"));

        let plain = io::Error::other("plain");
        assert!(error_of(&plain).is_none());
    }
}
