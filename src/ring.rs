//! Bounded FIFO of bytes, single-writer / single-reader.
//!
//! The prefetch worker is the only writer, the caller's read path is the
//! only reader; `http.rs` serializes both sides through one mutex, so this
//! type itself does no locking or blocking. Blocking semantics live one
//! layer up, expressed with a condition variable.

pub struct RingBuffer {
    buf: Vec<u8>,
    head: usize,
    len: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity.max(1)],
            head: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Resize the backing storage. Idempotent when `capacity` already
    /// matches. Resizing to a different capacity drops any buffered bytes
    /// — callers only do this before first use or right after a `clear()`.
    pub fn resize(&mut self, capacity: usize) {
        let capacity = capacity.max(1);
        if capacity == self.buf.len() {
            return;
        }
        self.buf = vec![0u8; capacity];
        self.head = 0;
        self.len = 0;
    }

    pub fn space_left(&self) -> usize {
        self.buf.len() - self.len
    }

    pub fn readable(&self) -> usize {
        self.len
    }

    /// Append up to `space_left()` bytes. Returns the count actually
    /// written; the caller must not hand over more than `space_left()`
    /// allows, an overfull write is silently truncated rather than UB.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        let n = bytes.len().min(self.space_left());
        if n == 0 {
            return 0;
        }

        let cap = self.buf.len();
        let tail = (self.head + self.len) % cap;
        let first = n.min(cap - tail);
        self.buf[tail..tail + first].copy_from_slice(&bytes[..first]);
        if first < n {
            self.buf[..n - first].copy_from_slice(&bytes[first..n]);
        }

        self.len += n;
        n
    }

    /// Copy up to `min(out.len(), readable())` bytes into `out`. When
    /// `advance` is false the bytes are copied but not consumed (a peek).
    pub fn read(&mut self, out: &mut [u8], advance: bool) -> usize {
        let n = out.len().min(self.len);
        if n == 0 {
            return 0;
        }

        let cap = self.buf.len();
        let first = n.min(cap - self.head);
        out[..first].copy_from_slice(&self.buf[self.head..self.head + first]);
        if first < n {
            out[first..n].copy_from_slice(&self.buf[..n - first]);
        }

        if advance {
            self.head = (self.head + n) % cap;
            self.len -= n;
        }

        n
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let mut ring = RingBuffer::new(8);
        assert_eq!(ring.write(b"hello"), 5);
        assert_eq!(ring.readable(), 5);
        assert_eq!(ring.space_left(), 3);

        let mut out = [0u8; 5];
        assert_eq!(ring.read(&mut out, true), 5);
        assert_eq!(&out, b"hello");
        assert_eq!(ring.readable(), 0);
        assert_eq!(ring.space_left(), 8);
    }

    #[test]
    fn write_caps_at_space_left() {
        let mut ring = RingBuffer::new(4);
        assert_eq!(ring.write(b"abcdef"), 4);
        assert_eq!(ring.space_left(), 0);
    }

    #[test]
    fn wraps_around_the_backing_storage() {
        let mut ring = RingBuffer::new(4);
        assert_eq!(ring.write(b"ab"), 2);
        let mut out = [0u8; 2];
        assert_eq!(ring.read(&mut out, true), 2);
        assert_eq!(&out, b"ab");

        // head is now at index 2; this write straddles the end of the
        // backing vec and must wrap into the low indices.
        assert_eq!(ring.write(b"cdef"), 4);
        let mut out = [0u8; 4];
        assert_eq!(ring.read(&mut out, true), 4);
        assert_eq!(&out, b"cdef");
    }

    #[test]
    fn non_advancing_read_is_a_peek() {
        let mut ring = RingBuffer::new(8);
        ring.write(b"peek");
        let mut out = [0u8; 4];
        assert_eq!(ring.read(&mut out, false), 4);
        assert_eq!(ring.readable(), 4);
        assert_eq!(ring.read(&mut out, true), 4);
        assert_eq!(ring.readable(), 0);
    }

    #[test]
    fn clear_drops_buffered_bytes() {
        let mut ring = RingBuffer::new(8);
        ring.write(b"data");
        ring.clear();
        assert_eq!(ring.readable(), 0);
        assert_eq!(ring.space_left(), 8);
    }

    #[test]
    fn resize_is_idempotent_at_same_capacity() {
        let mut ring = RingBuffer::new(8);
        ring.write(b"ab");
        ring.resize(8);
        assert_eq!(ring.readable(), 2);
    }

    #[test]
    fn resize_to_new_capacity_drops_data() {
        let mut ring = RingBuffer::new(8);
        ring.write(b"ab");
        ring.resize(16);
        assert_eq!(ring.readable(), 0);
        assert_eq!(ring.capacity(), 16);
    }
}
