//! Working buffer and buffer sizing
//!
//! Every byte a stream hands to or takes from its caller passes through a
//! [`WorkingBuffer`]. The buffer tracks three cursors:
//!
//! - `pos`: next byte to hand out (input) or next free slot (output)
//! - `limit`: end of valid data (input only)
//! - `digest_pos`: how far the checksum accumulator has consumed
//!
//! `digest_pos <= pos <= limit <= capacity` holds at all times.

/// Smallest heap buffer picked by the sizing heuristic (1KB)
pub const MIN_HEAP_BUFFER: usize = 1024;

/// Largest heap buffer picked by the sizing heuristic (16KB)
pub const MAX_HEAP_BUFFER: usize = 16 * 1024;

/// Buffer used when the eventual stream length is unknown
pub const DEFAULT_BUFFER_SIZE: usize = MAX_HEAP_BUFFER;

/// Single bulk buffer for very large streams (512KB)
pub const BULK_BUFFER_SIZE: usize = 512 * 1024;

/// Size hints above this switch to the bulk buffer (25MB)
pub const BULK_THRESHOLD: u64 = 25 * 1024 * 1024;

/// Floor for explicitly configured capacities; every fixed-width primitive fits.
pub const MIN_EXPLICIT_BUFFER: usize = 16;

/// Buffer allocation chosen for a stream at construction time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferPlan {
    /// Ordinary heap buffer of the given size
    Heap(usize),
    /// One large buffer for bulk transfer to the backing store
    Bulk,
}

impl BufferPlan {
    /// Pick a buffer for a stream expected to carry `hint` bytes.
    ///
    /// A hint of zero means the size is unknown.
    ///
    /// # Examples
    /// ```
    /// use zio::BufferPlan;
    ///
    /// assert_eq!(BufferPlan::for_size_hint(0), BufferPlan::Heap(16 * 1024));
    /// assert_eq!(BufferPlan::for_size_hint(100), BufferPlan::Heap(1024));
    /// assert_eq!(BufferPlan::for_size_hint(3000), BufferPlan::Heap(4096));
    /// assert_eq!(BufferPlan::for_size_hint(64 * 1024 * 1024), BufferPlan::Bulk);
    /// ```
    pub fn for_size_hint(hint: u64) -> Self {
        if hint == 0 {
            return BufferPlan::Heap(DEFAULT_BUFFER_SIZE);
        }
        if hint > BULK_THRESHOLD {
            return BufferPlan::Bulk;
        }
        // hint <= 25MB, so the cast cannot truncate
        let near = (hint as usize).next_power_of_two();
        BufferPlan::Heap(near.clamp(MIN_HEAP_BUFFER, MAX_HEAP_BUFFER))
    }

    /// Number of bytes the plan allocates
    pub fn capacity(self) -> usize {
        match self {
            BufferPlan::Heap(size) => size,
            BufferPlan::Bulk => BULK_BUFFER_SIZE,
        }
    }
}

#[derive(Debug)]
pub(crate) struct WorkingBuffer {
    data: Vec<u8>,
    pos: usize,
    limit: usize,
    digest_pos: usize,
}

impl WorkingBuffer {
    pub(crate) fn new(plan: BufferPlan) -> Self {
        Self {
            data: vec![0u8; plan.capacity()],
            pos: 0,
            limit: 0,
            digest_pos: 0,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Position of the cursor inside the buffer
    pub(crate) fn offset(&self) -> usize {
        self.pos
    }

    /// Unconsumed bytes (input side)
    pub(crate) fn available(&self) -> usize {
        self.limit - self.pos
    }

    /// Free slots (output side)
    pub(crate) fn free(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Copy `dst.len()` unconsumed bytes out. Caller guarantees availability.
    pub(crate) fn take_into(&mut self, dst: &mut [u8]) {
        let end = self.pos + dst.len();
        debug_assert!(end <= self.limit);
        dst.copy_from_slice(&self.data[self.pos..end]);
        self.pos = end;
    }

    /// Append `src` at the cursor. Caller guarantees free space.
    pub(crate) fn put(&mut self, src: &[u8]) {
        let end = self.pos + src.len();
        debug_assert!(end <= self.data.len());
        self.data[self.pos..end].copy_from_slice(src);
        self.pos = end;
    }

    /// Bytes handed over but not yet hashed
    pub(crate) fn undigested(&self) -> &[u8] {
        &self.data[self.digest_pos..self.pos]
    }

    pub(crate) fn mark_digested(&mut self) {
        self.digest_pos = self.pos;
    }

    /// Bytes written since the last reset (output side)
    pub(crate) fn pending(&self) -> &[u8] {
        &self.data[..self.pos]
    }

    /// Forget flushed output
    pub(crate) fn reset(&mut self) {
        self.pos = 0;
        self.digest_pos = 0;
        self.limit = 0;
    }

    /// Drop the consumed prefix and move unconsumed bytes to the front.
    ///
    /// Returns the number of bytes dropped. The consumed prefix must already
    /// be digested.
    pub(crate) fn compact(&mut self) -> usize {
        debug_assert_eq!(self.digest_pos, self.pos);
        let consumed = self.pos;
        if consumed > 0 {
            self.data.copy_within(consumed..self.limit, 0);
            self.limit -= consumed;
            self.pos = 0;
            self.digest_pos = 0;
        }
        consumed
    }

    /// Room after the valid data, for a refill to land in
    pub(crate) fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.limit..]
    }

    pub(crate) fn advance_limit(&mut self, n: usize) {
        debug_assert!(self.limit + n <= self.data.len());
        self.limit += n;
    }

    /// Give the allocation back; the buffer is unusable afterwards.
    pub(crate) fn release(&mut self) {
        self.data = Vec::new();
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_hint_heuristic() {
        assert_eq!(BufferPlan::for_size_hint(0).capacity(), DEFAULT_BUFFER_SIZE);
        assert_eq!(BufferPlan::for_size_hint(1).capacity(), MIN_HEAP_BUFFER);
        assert_eq!(BufferPlan::for_size_hint(1024).capacity(), 1024);
        assert_eq!(BufferPlan::for_size_hint(1025).capacity(), 2048);
        assert_eq!(BufferPlan::for_size_hint(BULK_THRESHOLD).capacity(), MAX_HEAP_BUFFER);
        assert_eq!(BufferPlan::for_size_hint(BULK_THRESHOLD + 1), BufferPlan::Bulk);
        assert_eq!(BufferPlan::Bulk.capacity(), BULK_BUFFER_SIZE);
    }

    #[test]
    fn test_compact_keeps_unconsumed_tail() {
        let mut buf = WorkingBuffer::new(BufferPlan::Heap(8));
        buf.spare_mut()[..5].copy_from_slice(b"abcde");
        buf.advance_limit(5);

        let mut head = [0u8; 3];
        buf.take_into(&mut head);
        assert_eq!(&head, b"abc");
        assert_eq!(buf.undigested(), b"abc");

        buf.mark_digested();
        assert_eq!(buf.compact(), 3);
        assert_eq!(buf.available(), 2);
        assert_eq!(buf.spare_mut().len(), 6);

        let mut tail = [0u8; 2];
        buf.take_into(&mut tail);
        assert_eq!(&tail, b"de");
    }

    #[test]
    fn test_output_cursor() {
        let mut buf = WorkingBuffer::new(BufferPlan::Heap(4));
        buf.put(b"xy");
        assert_eq!(buf.free(), 2);
        assert_eq!(buf.pending(), b"xy");
        buf.mark_digested();
        assert!(buf.undigested().is_empty());
        buf.reset();
        assert_eq!(buf.free(), 4);
        assert_eq!(buf.offset(), 0);
    }
}
