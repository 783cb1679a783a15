use bytes::{Bytes, BytesMut};

/// A write sink that accepts bytes into an in-memory buffer until a byte cap
/// is reached, then silently drops the remainder and sets a sticky
/// `exceeded` flag. Always reports the full input length as written, so a
/// caller's client-facing copy loop is never aborted by the cap.
pub struct BoundedTee {
    buffer: BytesMut,
    cap: usize,
    written: usize,
    exceeded: bool,
}

impl BoundedTee {
    pub fn new(cap: usize) -> Self {
        Self { buffer: BytesMut::new(), cap, written: 0, exceeded: false }
    }

    /// Offer `chunk` to the sink. Always returns `chunk.len()`.
    pub fn write(&mut self, chunk: &[u8]) -> usize {
        let n = chunk.len();

        if self.exceeded {
            return n;
        }

        let remaining = self.cap - self.written;
        if n <= remaining {
            self.buffer.extend_from_slice(chunk);
            self.written += n;
        } else {
            self.exceeded = true;
            self.buffer.extend_from_slice(&chunk[..remaining]);
            self.written += remaining;
        }

        n
    }

    pub fn exceeded(&self) -> bool {
        self.exceeded
    }

    /// Consume the sink, returning the buffered bytes and whether the cap
    /// was exceeded at any point.
    pub fn into_parts(self) -> (Bytes, bool) {
        (self.buffer.freeze(), self.exceeded)
    }
}
