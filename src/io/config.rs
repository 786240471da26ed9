//! Stream construction options

use serde::{Deserialize, Serialize};

use super::buffer::{BufferPlan, MIN_EXPLICIT_BUFFER};
use super::checksum::ChecksumAlgorithm;

/// Options shared by every buffered zio stream.
///
/// # Examples
/// ```
/// use zio::{ChecksumAlgorithm, StreamConfig};
///
/// let config = StreamConfig::default()
///     .with_buffer_capacity(1024)
///     .with_checksum(ChecksumAlgorithm::Sha512);
/// assert_eq!(config.buffer_plan().capacity(), 1024);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Expected total stream length in bytes, 0 when unknown
    pub size_hint: u64,
    /// Fixed working buffer size, overriding the size-hint heuristic
    pub buffer_capacity: Option<usize>,
    /// Checksum accumulated over the stream's bytes
    pub checksum: ChecksumAlgorithm,
    /// `sync_all` file outputs when they close
    pub sync_on_close: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            size_hint: 0,
            buffer_capacity: None,
            checksum: ChecksumAlgorithm::Sha256,
            sync_on_close: false,
        }
    }
}

impl StreamConfig {
    pub fn with_size_hint(mut self, size_hint: u64) -> Self {
        self.size_hint = size_hint;
        self
    }

    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = Some(capacity);
        self
    }

    pub fn with_checksum(mut self, checksum: ChecksumAlgorithm) -> Self {
        self.checksum = checksum;
        self
    }

    pub fn with_sync_on_close(mut self, sync: bool) -> Self {
        self.sync_on_close = sync;
        self
    }

    /// Buffer the stream will allocate
    pub fn buffer_plan(&self) -> BufferPlan {
        match self.buffer_capacity {
            Some(capacity) => BufferPlan::Heap(capacity.max(MIN_EXPLICIT_BUFFER)),
            None => BufferPlan::for_size_hint(self.size_hint),
        }
    }

    /// Fill in a size hint when the caller left it unknown
    pub(crate) fn hinted(&self, size_hint: u64) -> Self {
        let mut config = self.clone();
        if config.size_hint == 0 {
            config.size_hint = size_hint;
        }
        config
    }
}
