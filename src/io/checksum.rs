//! Incremental checksum accumulators
//!
//! Streams feed an [`Accumulator`] with exactly the bytes that crossed a
//! primitive read or write, and render snapshots as lowercase hex.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};

/// Hash used for stream checksums
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    /// No accumulator; `checksum()` yields `None`
    None,
    #[default]
    Sha256,
    Sha512,
}

impl ChecksumAlgorithm {
    /// Length of the hex rendering, zero when disabled
    pub fn hex_len(self) -> usize {
        match self {
            ChecksumAlgorithm::None => 0,
            ChecksumAlgorithm::Sha256 => 64,
            ChecksumAlgorithm::Sha512 => 128,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) enum Accumulator {
    Sha256(Sha256),
    Sha512(Sha512),
}

impl Accumulator {
    pub(crate) fn new(algorithm: ChecksumAlgorithm) -> Option<Self> {
        match algorithm {
            ChecksumAlgorithm::None => None,
            ChecksumAlgorithm::Sha256 => Some(Accumulator::Sha256(Sha256::new())),
            ChecksumAlgorithm::Sha512 => Some(Accumulator::Sha512(Sha512::new())),
        }
    }

    pub(crate) fn update(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        match self {
            Accumulator::Sha256(h) => h.update(bytes),
            Accumulator::Sha512(h) => h.update(bytes),
        }
    }

    /// Hex digest of everything fed so far; the accumulator keeps running.
    pub(crate) fn snapshot_hex(&self) -> String {
        match self {
            Accumulator::Sha256(h) => hex::encode(h.clone().finalize()),
            Accumulator::Sha512(h) => hex::encode(h.clone().finalize()),
        }
    }
}

/// Checksum of a complete byte slice, as a stream over those bytes would report it.
///
/// # Examples
/// ```
/// use zio::{checksum_of, ChecksumAlgorithm};
///
/// let sum = checksum_of(ChecksumAlgorithm::Sha256, b"").unwrap();
/// assert!(sum.starts_with("e3b0c442"));
/// assert_eq!(checksum_of(ChecksumAlgorithm::None, b"abc"), None);
/// ```
pub fn checksum_of(algorithm: ChecksumAlgorithm, bytes: &[u8]) -> Option<String> {
    let mut acc = Accumulator::new(algorithm)?;
    acc.update(bytes);
    Some(acc.snapshot_hex())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incremental_matches_one_shot() {
        let mut acc = Accumulator::new(ChecksumAlgorithm::Sha256).unwrap();
        acc.update(b"hello ");
        let partial = acc.snapshot_hex();
        acc.update(b"world");

        assert_eq!(
            acc.snapshot_hex(),
            checksum_of(ChecksumAlgorithm::Sha256, b"hello world").unwrap()
        );
        assert_eq!(
            partial,
            checksum_of(ChecksumAlgorithm::Sha256, b"hello ").unwrap()
        );
    }

    #[test]
    fn test_hex_is_fixed_length() {
        for alg in [ChecksumAlgorithm::Sha256, ChecksumAlgorithm::Sha512] {
            let sum = checksum_of(alg, b"x").unwrap();
            assert_eq!(sum.len(), alg.hex_len());
            assert!(sum.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }
}
