//! Self-describing payload envelope
//!
//! Frames an opaque payload so it can be recognized and validated later:
//!
//! | Field        | Encoding                      |
//! |--------------|-------------------------------|
//! | magic        | raw ASCII `ZIO1`              |
//! | version      | version tag                   |
//! | codec        | `u8` ([`CompressionCodec`])   |
//! | raw length   | `i64`                         |
//! | stored length| `i64`                         |
//! | payload      | stored bytes                  |

use std::io;

use super::config::StreamConfig;
use super::contract::{ZioRead, ZioWrite};
use super::error::ZioError;
use super::stream::{ZioInput, ZioOutput};

pub const ENVELOPE_MAGIC: &str = "ZIO1";

/// Envelope layout version written by this crate
pub const ENVELOPE_VERSION: u32 = 1;

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompressionCodec {
    None = 0,
    Zstd = 1,
    Lz4 = 2,
}

impl CompressionCodec {
    fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::None),
            1 => Some(Self::Zstd),
            2 => Some(Self::Lz4),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct EnvelopeOptions {
    pub codec: CompressionCodec,
    pub level: Option<i32>,
}

impl Default for EnvelopeOptions {
    fn default() -> Self {
        Self {
            codec: CompressionCodec::None,
            level: None,
        }
    }
}

/// Write `payload` wrapped in an envelope
pub fn write_envelope(out: &mut dyn ZioWrite, opts: EnvelopeOptions, payload: &[u8]) -> io::Result<()> {
    let stored = compress(opts, payload)?;

    out.write_raw_string(ENVELOPE_MAGIC)?;
    out.write_version(ENVELOPE_VERSION)?;
    out.write_u8(opts.codec as u8)?;
    out.write_i64(payload.len() as i64)?;
    out.write_i64(stored.len() as i64)?;
    out.write_bytes(&stored)
}

/// Read an envelope and return the original payload
pub fn read_envelope(input: &mut dyn ZioRead) -> io::Result<Vec<u8>> {
    input.read_raw_string_and_validate(ENVELOPE_MAGIC)?;
    input.read_version_expect(ENVELOPE_VERSION)?;

    let codec_byte = input.read_u8()?;
    let codec = CompressionCodec::from_u8(codec_byte)
        .ok_or_else(|| ZioError::Envelope(format!("unknown compression codec {codec_byte}")))?;
    let raw_len = read_len(input, "raw")?;
    let stored_len = read_len(input, "stored")?;

    let stored = input.read_byte_vec(stored_len)?;
    let decoded = decompress(codec, stored, raw_len)?;
    if decoded.len() != raw_len {
        return Err(ZioError::Envelope(format!(
            "size mismatch: header says {raw_len} bytes, decoded {}",
            decoded.len()
        ))
        .into());
    }
    Ok(decoded)
}

fn read_len(input: &mut dyn ZioRead, what: &str) -> io::Result<usize> {
    let len = input.read_i64()?;
    usize::try_from(len).map_err(|_| ZioError::Envelope(format!("negative {what} length {len}")).into())
}

/// Envelope `payload` into a fresh byte vector
pub fn wrap_payload(opts: EnvelopeOptions, payload: &[u8]) -> io::Result<Vec<u8>> {
    let config = StreamConfig::default().with_size_hint(payload.len() as u64 + 32);
    let mut out = ZioOutput::memory(&config);
    write_envelope(&mut out, opts, payload)?;
    out.into_bytes()
}

/// Payload of an envelope held in memory
pub fn unwrap_payload(data: Vec<u8>) -> io::Result<Vec<u8>> {
    let mut input = ZioInput::from_bytes(data, &StreamConfig::default());
    let payload = read_envelope(&mut input)?;
    input.close()?;
    Ok(payload)
}

fn compress(opts: EnvelopeOptions, raw: &[u8]) -> io::Result<Vec<u8>> {
    match opts.codec {
        CompressionCodec::None => Ok(raw.to_vec()),
        #[cfg(feature = "compression-zstd")]
        CompressionCodec::Zstd => zstd::bulk::compress(raw, opts.level.unwrap_or(0)),
        #[cfg(not(feature = "compression-zstd"))]
        CompressionCodec::Zstd => Err(ZioError::Unsupported(ZSTD_DISABLED).into()),
        #[cfg(feature = "compression-lz4")]
        CompressionCodec::Lz4 => Ok(lz4_flex::compress_prepend_size(raw)),
        #[cfg(not(feature = "compression-lz4"))]
        CompressionCodec::Lz4 => Err(ZioError::Unsupported(LZ4_DISABLED).into()),
    }
}

/// Decode `stored`, giving up once the output exceeds `raw_len` bytes.
#[cfg_attr(
    not(any(feature = "compression-zstd", feature = "compression-lz4")),
    allow(unused_variables)
)]
fn decompress(codec: CompressionCodec, stored: Vec<u8>, raw_len: usize) -> io::Result<Vec<u8>> {
    match codec {
        CompressionCodec::None => Ok(stored),
        #[cfg(feature = "compression-zstd")]
        CompressionCodec::Zstd => {
            use std::io::Read;
            // One byte past the header length is enough to detect an overlong payload.
            let mut decoded = Vec::new();
            zstd::stream::Decoder::new(stored.as_slice())?
                .take(raw_len as u64 + 1)
                .read_to_end(&mut decoded)?;
            Ok(decoded)
        }
        #[cfg(not(feature = "compression-zstd"))]
        CompressionCodec::Zstd => Err(ZioError::Unsupported(ZSTD_DISABLED).into()),
        #[cfg(feature = "compression-lz4")]
        CompressionCodec::Lz4 => {
            // lz4_flex prepends the decoded size as a little-endian u32
            let declared = stored
                .get(..4)
                .and_then(|b| <[u8; 4]>::try_from(b).ok())
                .map(|b| u32::from_le_bytes(b) as usize);
            if declared != Some(raw_len) {
                return Err(ZioError::Envelope(format!(
                    "size mismatch: header says {raw_len} bytes, lz4 block declares {declared:?}"
                ))
                .into());
            }
            lz4_flex::decompress_size_prepended(&stored)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
        }
        #[cfg(not(feature = "compression-lz4"))]
        CompressionCodec::Lz4 => Err(ZioError::Unsupported(LZ4_DISABLED).into()),
    }
}

#[cfg(not(feature = "compression-zstd"))]
const ZSTD_DISABLED: &str = "zstd codec (enable feature `compression-zstd`)";

#[cfg(not(feature = "compression-lz4"))]
const LZ4_DISABLED: &str = "lz4 codec (enable feature `compression-lz4`)";
