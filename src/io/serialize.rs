//! Object-level serialization roles
//!
//! A type takes part in zio serialization in one of three ways:
//!
//! - **Value object**: [`ZioEncode`] + [`ZioDecode`]. Decoding constructs a new
//!   value straight from the stream; suits immutable types.
//! - **Mutable object**: [`ZioEncode`] + [`ZioLoad`]. Loading overwrites the
//!   fields of an existing value; `Default + ZioLoad` types also get a fresh
//!   construction path through [`ZioLoad::load_new`].
//! - **Externally spawned**: a separate [`ZioSpawner`] reads and writes items
//!   of a type that does not implement anything itself (foreign types, sealed
//!   hierarchies). [`BincodeSpawner`] covers every serde type.
//!
//! `Option<T>` is the nullable wrapper for value objects: a flag byte, then the
//! value when present.
//!
//! # Examples
//! ```
//! use std::io;
//! use zio::{StreamConfig, ZioDecode, ZioEncode, ZioInput, ZioOutput, ZioRead, ZioWrite};
//!
//! #[derive(Debug, PartialEq)]
//! struct Point { x: i32, y: i32 }
//!
//! impl ZioEncode for Point {
//!     fn encode_zio(&self, out: &mut dyn ZioWrite) -> io::Result<()> {
//!         out.write_version(1)?;
//!         out.write_i32(self.x)?;
//!         out.write_i32(self.y)
//!     }
//! }
//!
//! impl ZioDecode for Point {
//!     fn decode_zio(input: &mut dyn ZioRead) -> io::Result<Self> {
//!         input.read_version_expect(1)?;
//!         Ok(Point { x: input.read_i32()?, y: input.read_i32()? })
//!     }
//! }
//!
//! let mut out = ZioOutput::memory(&StreamConfig::default());
//! Some(Point { x: 1, y: -2 }).encode_zio(&mut out).unwrap();
//! let bytes = out.into_bytes().unwrap();
//!
//! let mut input = ZioInput::from_bytes(bytes, &StreamConfig::default());
//! let back = Option::<Point>::decode_zio(&mut input).unwrap();
//! assert_eq!(back, Some(Point { x: 1, y: -2 }));
//! ```

use std::io;
use std::marker::PhantomData;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::codec;
use super::contract::{ZioRead, ZioWrite};
use super::error::ZioError;

/// Anything that can write itself to a zio stream
pub trait ZioEncode {
    fn encode_zio(&self, out: &mut dyn ZioWrite) -> io::Result<()>;
}

/// Value-object role: construct a new instance from the stream.
pub trait ZioDecode: Sized {
    fn decode_zio(input: &mut dyn ZioRead) -> io::Result<Self>;
}

/// Mutable-object role: populate an existing instance from the stream.
pub trait ZioLoad {
    fn load_zio(&mut self, input: &mut dyn ZioRead) -> io::Result<()>;

    /// Default-construct, then load.
    fn load_new(input: &mut dyn ZioRead) -> io::Result<Self>
    where
        Self: Default + Sized,
    {
        let mut item = Self::default();
        item.load_zio(input)?;
        Ok(item)
    }
}

/// Externally-spawned role: a factory that reads and writes `Item`s.
pub trait ZioSpawner {
    type Item;

    fn spawn(&self, input: &mut dyn ZioRead) -> io::Result<Self::Item>;

    fn store(&self, item: &Self::Item, out: &mut dyn ZioWrite) -> io::Result<()>;
}

macro_rules! primitive_codec {
    ($($ty:ty => $write:ident, $read:ident;)*) => {
        $(
            impl ZioEncode for $ty {
                fn encode_zio(&self, out: &mut dyn ZioWrite) -> io::Result<()> {
                    out.$write(*self)
                }
            }

            impl ZioDecode for $ty {
                fn decode_zio(input: &mut dyn ZioRead) -> io::Result<Self> {
                    input.$read()
                }
            }
        )*
    };
}

primitive_codec! {
    i8 => write_i8, read_i8;
    u8 => write_u8, read_u8;
    i16 => write_i16, read_i16;
    i32 => write_i32, read_i32;
    i64 => write_i64, read_i64;
    bool => write_bool, read_bool;
    f32 => write_f32, read_f32;
    f64 => write_f64, read_f64;
}

impl ZioEncode for str {
    fn encode_zio(&self, out: &mut dyn ZioWrite) -> io::Result<()> {
        out.write_str(self)
    }
}

impl ZioEncode for String {
    fn encode_zio(&self, out: &mut dyn ZioWrite) -> io::Result<()> {
        out.write_str(self)
    }
}

impl ZioDecode for String {
    fn decode_zio(input: &mut dyn ZioRead) -> io::Result<Self> {
        input.read_str()
    }
}

impl<T: ZioEncode> ZioEncode for Option<T> {
    fn encode_zio(&self, out: &mut dyn ZioWrite) -> io::Result<()> {
        out.write_bool(self.is_some())?;
        match self {
            Some(item) => item.encode_zio(out),
            None => Ok(()),
        }
    }
}

impl<T: ZioDecode> ZioDecode for Option<T> {
    fn decode_zio(input: &mut dyn ZioRead) -> io::Result<Self> {
        if input.read_bool()? {
            T::decode_zio(input).map(Some)
        } else {
            Ok(None)
        }
    }
}

impl<T: ZioEncode> ZioEncode for [T] {
    fn encode_zio(&self, out: &mut dyn ZioWrite) -> io::Result<()> {
        codec::write_slice(out, self)
    }
}

impl<T: ZioEncode> ZioEncode for Vec<T> {
    fn encode_zio(&self, out: &mut dyn ZioWrite) -> io::Result<()> {
        codec::write_slice(out, self)
    }
}

impl<T: ZioDecode> ZioDecode for Vec<T> {
    fn decode_zio(input: &mut dyn ZioRead) -> io::Result<Self> {
        codec::read_vec(input)
    }
}

impl<V: ZioEncode> ZioEncode for IndexMap<String, V> {
    fn encode_zio(&self, out: &mut dyn ZioWrite) -> io::Result<()> {
        codec::write_map(out, self)
    }
}

impl<V: ZioDecode> ZioDecode for IndexMap<String, V> {
    fn decode_zio(input: &mut dyn ZioRead) -> io::Result<Self> {
        codec::read_map(input)
    }
}

/// Spawner for any serde type, stored as an `i32`-length-prefixed bincode blob.
///
/// # Examples
/// ```
/// use serde::{Deserialize, Serialize};
/// use zio::{BincodeSpawner, StreamConfig, ZioInput, ZioOutput, ZioSpawner};
///
/// #[derive(Serialize, Deserialize, PartialEq, Debug)]
/// struct Settings { width: u32, title: String }
///
/// let spawner = BincodeSpawner::<Settings>::new();
/// let settings = Settings { width: 640, title: "main".into() };
///
/// let mut out = ZioOutput::memory(&StreamConfig::default());
/// spawner.store(&settings, &mut out).unwrap();
/// let bytes = out.into_bytes().unwrap();
///
/// let mut input = ZioInput::from_bytes(bytes, &StreamConfig::default());
/// assert_eq!(spawner.spawn(&mut input).unwrap(), settings);
/// ```
pub struct BincodeSpawner<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> BincodeSpawner<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for BincodeSpawner<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize + DeserializeOwned> ZioSpawner for BincodeSpawner<T> {
    type Item = T;

    fn spawn(&self, input: &mut dyn ZioRead) -> io::Result<T> {
        let len = input.read_i32()?;
        let len = usize::try_from(len).map_err(|_| ZioError::NegativeCount(len))?;
        let bytes = input.read_byte_vec(len)?;
        bincode::deserialize(&bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn store(&self, item: &T, out: &mut dyn ZioWrite) -> io::Result<()> {
        let bytes = bincode::serialize(item).map_err(io::Error::other)?;
        codec::write_count(out, bytes.len())?;
        out.write_bytes(&bytes)
    }
}
