//! # zio
//!
//! Typed, buffered binary streams for persisting application state.
//!
//! - [`ZioWrite`] / [`ZioRead`]: the primitive vocabulary (fixed-width
//!   big-endian integers and floats, length-prefixed strings, raw headers,
//!   compact version tags), position and checksum queries.
//! - [`ZioOutput`] / [`ZioInput`]: buffered implementations over files,
//!   growable memory or any `Write`/`Read`, hashing exactly the bytes that
//!   pass through them.
//! - [`CountingOutput`]: measures encoded size without storing anything.
//! - [`ZioEncode`], [`ZioDecode`], [`ZioLoad`], [`ZioSpawner`]: how domain
//!   objects ride on the streams, plus sequence and mapping codecs.

pub mod io;
pub use io::*;
