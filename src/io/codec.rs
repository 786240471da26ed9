//! Sequence, mapping and nullable-item codecs
//!
//! Sequences are an `i32` count followed by the elements. Mappings are an
//! `i32` count followed by (non-null string key, value) pairs in insertion
//! order. Reading into a preloaded container checks the stored shape first
//! and refuses to touch the container when it does not match.

use std::io;

use indexmap::IndexMap;

use super::contract::{ZioRead, ZioWrite};
use super::error::ZioError;
use super::serialize::{ZioDecode, ZioEncode, ZioLoad, ZioSpawner};

/// Write an element count
pub fn write_count(out: &mut dyn ZioWrite, count: usize) -> io::Result<()> {
    let count = i32::try_from(count).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("count {count} exceeds i32 range"),
        )
    })?;
    out.write_i32(count)
}

/// Read an element count, rejecting negative values
pub fn read_count(input: &mut dyn ZioRead) -> io::Result<usize> {
    let count = input.read_i32()?;
    usize::try_from(count).map_err(|_| ZioError::NegativeCount(count).into())
}

pub fn write_slice<T: ZioEncode>(out: &mut dyn ZioWrite, items: &[T]) -> io::Result<()> {
    write_count(out, items.len())?;
    for item in items {
        item.encode_zio(out)?;
    }
    Ok(())
}

/// Write a sequence of items through a spawner
pub fn write_slice_spawned<S: ZioSpawner>(
    out: &mut dyn ZioWrite,
    spawner: &S,
    items: &[S::Item],
) -> io::Result<()> {
    write_count(out, items.len())?;
    for item in items {
        spawner.store(item, out)?;
    }
    Ok(())
}

/// Read a fresh sequence, building each element with `make`.
pub fn read_vec_with<T, F>(input: &mut dyn ZioRead, mut make: F) -> io::Result<Vec<T>>
where
    F: FnMut(&mut dyn ZioRead) -> io::Result<T>,
{
    let count = read_count(input)?;
    // The count is untrusted; let the vector grow as elements arrive.
    let mut items = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        items.push(make(input)?);
    }
    Ok(items)
}

/// Read a fresh sequence of value objects
pub fn read_vec<T: ZioDecode>(input: &mut dyn ZioRead) -> io::Result<Vec<T>> {
    read_vec_with(input, T::decode_zio)
}

/// Read a fresh sequence of default-constructed, then loaded, mutable objects
pub fn read_vec_loaded<T: ZioLoad + Default>(input: &mut dyn ZioRead) -> io::Result<Vec<T>> {
    read_vec_with(input, T::load_new)
}

/// Read a fresh sequence through a spawner
pub fn read_vec_spawned<S: ZioSpawner>(
    input: &mut dyn ZioRead,
    spawner: &S,
) -> io::Result<Vec<S::Item>> {
    read_vec_with(input, |input| spawner.spawn(input))
}

/// Load a stored sequence into a preloaded, pre-sized slice.
///
/// Fails without touching `items` when the stored count differs from
/// `items.len()`.
pub fn read_into_slice<T: ZioLoad>(input: &mut dyn ZioRead, items: &mut [T]) -> io::Result<()> {
    let found = read_count(input)?;
    if found != items.len() {
        return Err(ZioError::CountMismatch {
            expected: items.len(),
            found,
        }
        .into());
    }
    for item in items.iter_mut() {
        item.load_zio(input)?;
    }
    Ok(())
}

pub fn write_map<V: ZioEncode>(out: &mut dyn ZioWrite, map: &IndexMap<String, V>) -> io::Result<()> {
    write_count(out, map.len())?;
    for (key, value) in map {
        out.write_str(key)?;
        value.encode_zio(out)?;
    }
    Ok(())
}

/// Read a fresh mapping, preserving stored order, building values with `make`.
pub fn read_map_with<V, F>(input: &mut dyn ZioRead, mut make: F) -> io::Result<IndexMap<String, V>>
where
    F: FnMut(&mut dyn ZioRead) -> io::Result<V>,
{
    let count = read_count(input)?;
    let mut map = IndexMap::with_capacity(count.min(1024));
    for _ in 0..count {
        let key = input.read_str()?;
        let value = make(input)?;
        map.insert(key, value);
    }
    Ok(map)
}

pub fn read_map<V: ZioDecode>(input: &mut dyn ZioRead) -> io::Result<IndexMap<String, V>> {
    read_map_with(input, V::decode_zio)
}

/// Load a stored mapping into a preloaded one.
///
/// The stored count must equal `map.len()` and every stored key must equal
/// the preloaded key at the same index. The count is checked before any
/// value is touched; a key mismatch stops at the offending entry.
pub fn read_into_map<V: ZioLoad>(
    input: &mut dyn ZioRead,
    map: &mut IndexMap<String, V>,
) -> io::Result<()> {
    let found = read_count(input)?;
    if found != map.len() {
        return Err(ZioError::CountMismatch {
            expected: map.len(),
            found,
        }
        .into());
    }
    for (index, (key, value)) in map.iter_mut().enumerate() {
        let stored = input.read_str()?;
        if stored != *key {
            return Err(ZioError::KeyMismatch {
                index,
                expected: key.clone(),
                found: stored,
            }
            .into());
        }
        value.load_zio(input)?;
    }
    Ok(())
}

/// Write an optional mutable object behind a presence flag
pub fn write_nullable<T: ZioEncode>(out: &mut dyn ZioWrite, item: Option<&T>) -> io::Result<()> {
    out.write_bool(item.is_some())?;
    match item {
        Some(item) => item.encode_zio(out),
        None => Ok(()),
    }
}

/// Read an optional mutable object written by [`write_nullable`]
pub fn read_nullable<T: ZioLoad + Default>(input: &mut dyn ZioRead) -> io::Result<Option<T>> {
    if input.read_bool()? {
        T::load_new(input).map(Some)
    } else {
        Ok(None)
    }
}

/// Load an optional mutable object written by [`write_nullable`] into `slot`.
///
/// A present item is loaded into the existing value when `slot` holds one,
/// otherwise into a default-constructed value. An absent item clears `slot`.
pub fn read_nullable_into<T: ZioLoad + Default>(
    input: &mut dyn ZioRead,
    slot: &mut Option<T>,
) -> io::Result<()> {
    if !input.read_bool()? {
        *slot = None;
        return Ok(());
    }
    match slot {
        Some(item) => item.load_zio(input),
        None => {
            *slot = Some(T::load_new(input)?);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::config::StreamConfig;
    use crate::io::error::error_of;
    use crate::io::stream::{MemoryInput, ZioInput, ZioOutput};

    #[derive(Default, Debug, Clone, PartialEq)]
    struct Slot(i32);

    impl ZioEncode for Slot {
        fn encode_zio(&self, out: &mut dyn ZioWrite) -> io::Result<()> {
            out.write_i32(self.0)
        }
    }

    impl ZioLoad for Slot {
        fn load_zio(&mut self, input: &mut dyn ZioRead) -> io::Result<()> {
            self.0 = input.read_i32()?;
            Ok(())
        }
    }

    fn stream_of(write: impl FnOnce(&mut dyn ZioWrite) -> io::Result<()>) -> MemoryInput {
        let mut out = ZioOutput::memory(&StreamConfig::default());
        write(&mut out).unwrap();
        ZioInput::from_bytes(out.into_bytes().unwrap(), &StreamConfig::default())
    }

    #[test]
    fn test_slice_roundtrip_fresh() {
        let items = vec![Slot(1), Slot(-2), Slot(3)];
        let mut input = stream_of(|out| write_slice(out, &items));
        assert_eq!(read_vec_loaded::<Slot>(&mut input).unwrap(), items);
    }

    #[test]
    fn test_preloaded_slice_count_mismatch_leaves_items() {
        let mut input = stream_of(|out| write_slice(out, &[Slot(7), Slot(8), Slot(9)]));
        let mut preloaded = [Slot(1), Slot(2)];

        let err = read_into_slice(&mut input, &mut preloaded).unwrap_err();
        assert!(matches!(
            error_of(&err),
            Some(ZioError::CountMismatch {
                expected: 2,
                found: 3
            })
        ));
        assert_eq!(preloaded, [Slot(1), Slot(2)]);
    }

    #[test]
    fn test_preloaded_slice_is_filled() {
        let mut input = stream_of(|out| write_slice(out, &[Slot(1), Slot(2)]));
        let mut preloaded = [Slot(0), Slot(0)];

        read_into_slice(&mut input, &mut preloaded).unwrap();
        assert_eq!(preloaded, [Slot(1), Slot(2)]);
        assert_eq!(input.position().unwrap(), 12);
    }

    #[test]
    fn test_preloaded_map_in_order() {
        let mut stored = IndexMap::new();
        stored.insert("width".to_string(), Slot(640));
        stored.insert("height".to_string(), Slot(480));
        let mut input = stream_of(|out| write_map(out, &stored));

        let mut preloaded = IndexMap::new();
        preloaded.insert("width".to_string(), Slot::default());
        preloaded.insert("height".to_string(), Slot::default());
        read_into_map(&mut input, &mut preloaded).unwrap();
        assert_eq!(preloaded, stored);
    }

    #[test]
    fn test_preloaded_map_key_order_mismatch() {
        let mut stored = IndexMap::new();
        stored.insert("a".to_string(), Slot(1));
        stored.insert("b".to_string(), Slot(2));
        let mut input = stream_of(|out| write_map(out, &stored));

        let mut preloaded = IndexMap::new();
        preloaded.insert("b".to_string(), Slot::default());
        preloaded.insert("a".to_string(), Slot::default());
        let err = read_into_map(&mut input, &mut preloaded).unwrap_err();
        assert!(matches!(
            error_of(&err),
            Some(ZioError::KeyMismatch { index: 0, .. })
        ));
        assert_eq!(preloaded["b"], Slot::default());
    }

    #[test]
    fn test_fresh_map_keeps_insertion_order() {
        let mut stored = IndexMap::new();
        for key in ["zeta", "alpha", "mid"] {
            stored.insert(key.to_string(), key.len() as i64);
        }
        let mut input = stream_of(|out| write_map(out, &stored));
        let back: IndexMap<String, i64> = read_map(&mut input).unwrap();
        assert_eq!(back.keys().collect::<Vec<_>>(), ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_nullable_mutable_item() {
        let mut input = stream_of(|out| {
            write_nullable::<Slot>(out, None)?;
            write_nullable(out, Some(&Slot(42)))
        });
        assert_eq!(read_nullable::<Slot>(&mut input).unwrap(), None);
        assert_eq!(read_nullable::<Slot>(&mut input).unwrap(), Some(Slot(42)));
    }

    #[test]
    fn test_nullable_into_existing_slot() {
        let mut input = stream_of(|out| {
            write_nullable(out, Some(&Slot(5)))?;
            write_nullable(out, Some(&Slot(6)))?;
            write_nullable::<Slot>(out, None)
        });

        let mut slot = Some(Slot(1));
        read_nullable_into(&mut input, &mut slot).unwrap();
        assert_eq!(slot, Some(Slot(5)));

        let mut empty: Option<Slot> = None;
        read_nullable_into(&mut input, &mut empty).unwrap();
        assert_eq!(empty, Some(Slot(6)));

        read_nullable_into(&mut input, &mut slot).unwrap();
        assert_eq!(slot, None);
    }

    #[test]
    fn test_negative_count_rejected() {
        let mut input = stream_of(|out| out.write_i32(-1));
        let err = read_vec::<i32>(&mut input).unwrap_err();
        assert!(matches!(error_of(&err), Some(ZioError::NegativeCount(-1))));
    }
}
