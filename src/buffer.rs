use std::io;

/// What happened during [`StreamBuf::append_from`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Append {
    /// This many bytes were appended.
    Read(usize),
    /// The reader had nothing ready. Not an error; try again on the next
    /// readiness cycle.
    WouldBlock,
    /// The buffer is saturated: physically full with nothing drained yet.
    /// The reader was not invoked. Drain before appending again.
    Full,
    /// The reader reached end-of-stream.
    Eof,
}

/// A fixed-capacity byte buffer between a reader and a writer.
///
/// Unread bytes live between the `head` and `tail` cursors. When the tail
/// hits the end of storage while drained bytes linger at the front, the
/// unread region is compacted down to offset zero, so a fixed allocation
/// keeps up with an endless stream as long as the writer keeps draining.
///
/// The buffer moves bytes, nothing else: it never decides when to read or
/// write, and it never blocks.
#[derive(Debug)]
pub struct StreamBuf {
    storage: Box<[u8]>,
    head: usize,
    tail: usize,
}

impl StreamBuf {
    /// A buffer holding at most `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "a zero-capacity buffer cannot make progress");

        Self {
            storage: vec![0; capacity].into_boxed_slice(),
            head: 0,
            tail: 0,
        }
    }

    /// How many bytes are buffered and unread.
    pub fn available(&self) -> usize {
        self.tail - self.head
    }

    /// True when nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// The fixed capacity.
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// The buffered, unread bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.storage[self.head..self.tail]
    }

    // An empty buffer always rests at offset zero, so cursors cannot creep
    // towards the end of storage while the buffer is logically empty.
    fn normalize(&mut self) {
        if self.head >= self.tail {
            self.head = 0;
            self.tail = 0;
        }
    }

    /// Append bytes produced by `read`, which is handed the free region at
    /// the tail and returns how many bytes it placed there.
    ///
    /// Compacts first if the tail has hit the end of storage but drained
    /// bytes at the front can be reclaimed. Refuses with [`Append::Full`]
    /// if there is no slack at all.
    ///
    /// A reader error of kind [`io::ErrorKind::WouldBlock`] or
    /// [`io::ErrorKind::Interrupted`] maps to [`Append::WouldBlock`]; a
    /// zero-byte read maps to [`Append::Eof`]. Anything else is a real
    /// error and is passed through.
    pub fn append_from<F>(&mut self, read: F) -> io::Result<Append>
    where
        F: FnOnce(&mut [u8]) -> io::Result<usize>,
    {
        if self.tail == self.storage.len() {
            if self.head == 0 {
                return Ok(Append::Full);
            }

            let count = self.available();
            self.storage.copy_within(self.head..self.tail, 0);
            self.head = 0;
            self.tail = count;
        }

        match read(&mut self.storage[self.tail..]) {
            Ok(0) => Ok(Append::Eof),
            Ok(count) => {
                debug_assert!(count <= self.storage.len() - self.tail);
                self.tail += count;
                Ok(Append::Read(count))
            }
            Err(e) if matches!(
                e.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
            ) =>
            {
                Ok(Append::WouldBlock)
            }
            Err(e) => Err(e),
        }
    }

    /// Drain up to `limit` buffered bytes (all of them if `None`) through
    /// `write`, which returns how many bytes it accepted per call.
    ///
    /// The head only advances past bytes the writer actually took, so a
    /// writer that stops accepting loses nothing. A writer error of kind
    /// [`io::ErrorKind::WouldBlock`] ends the drain, `Interrupted` retries,
    /// anything else is passed through. Returns the total written.
    pub fn drain_to<F>(&mut self, limit: Option<usize>, mut write: F) -> io::Result<usize>
    where
        F: FnMut(&[u8]) -> io::Result<usize>,
    {
        let mut remaining = match limit {
            Some(limit) => limit.min(self.available()),
            None => self.available(),
        };
        let mut written = 0;

        while remaining > 0 {
            match write(&self.storage[self.head..self.head + remaining]) {
                Ok(0) => break,
                Ok(count) => {
                    self.head += count;
                    written += count;
                    remaining -= count;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e),
            }
        }

        self.normalize();
        Ok(written)
    }

    /// First index `p` (absolute, `head <= p <= tail - pattern.len()`) at
    /// which `pattern` occurs, scanning left to right. Never mutates.
    ///
    /// The index is only meaningful until the next append, since appending
    /// may compact the storage underneath it.
    pub fn find(&self, pattern: &[u8]) -> Option<usize> {
        if pattern.is_empty() || self.available() < pattern.len() {
            return None;
        }

        self.as_slice()
            .windows(pattern.len())
            .position(|window| window == pattern)
            .map(|position| self.head + position)
    }

    /// Consume `count` bytes without delivering them anywhere.
    pub fn discard(&mut self, count: usize) {
        self.head = (self.head + count).min(self.tail);
        self.normalize();
    }

    /// Throw away everything except the newest `count` bytes.
    ///
    /// A no-op when fewer than `count` bytes are buffered.
    pub fn retain_last(&mut self, count: usize) {
        if count < self.available() {
            self.head = self.tail - count;
        }
        self.normalize();
    }

    /// Move the head directly to `pos`, an absolute index previously
    /// obtained from [`find`](Self::find). Everything before it is gone.
    pub fn seek(&mut self, pos: usize) {
        debug_assert!(pos >= self.head, "seek cannot rewind past drained bytes");
        self.head = pos.min(self.tail);
        self.normalize();
    }
}

#[cfg(test)]
pub(crate) fn feed(buf: &mut StreamBuf, bytes: &[u8]) -> Append {
    buf.append_from(|free| {
        let count = bytes.len().min(free.len());
        free[..count].copy_from_slice(&bytes[..count]);
        Ok(count)
    })
    .unwrap()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn no_bytes_lost_across_compaction() {
        let mut buf = StreamBuf::with_capacity(16);
        let mut next: u8 = 0;
        let mut drained = Vec::new();

        // Append in sevens, drain in fives; the mismatch forces compaction
        // over and over.
        for _ in 0..100 {
            buf.append_from(|free| {
                let count = free.len().min(7);
                for slot in &mut free[..count] {
                    *slot = next;
                    next = next.wrapping_add(1);
                }
                Ok(count)
            })
            .unwrap();

            buf.drain_to(Some(5), |chunk| {
                drained.extend_from_slice(chunk);
                Ok(chunk.len())
            })
            .unwrap();
        }

        buf.drain_to(None, |chunk| {
            drained.extend_from_slice(chunk);
            Ok(chunk.len())
        })
        .unwrap();

        let expected: Vec<u8> = (0..drained.len()).map(|i| i as u8).collect();
        assert_eq!(drained, expected);
    }

    #[test]
    fn append_is_refused_at_capacity() {
        let mut buf = StreamBuf::with_capacity(8);

        assert_eq!(feed(&mut buf, &[1; 8]), Append::Read(8));
        assert_eq!(feed(&mut buf, &[2; 1]), Append::Full);

        assert_eq!(buf.available(), 8);
        assert_eq!(buf.as_slice(), &[1; 8]);
    }

    #[test]
    fn append_compacts_before_refusing() {
        let mut buf = StreamBuf::with_capacity(8);

        feed(&mut buf, &[1, 2, 3, 4, 5, 6, 7, 8]);
        buf.discard(3);

        // Physically full, but compaction reclaims the discarded front.
        assert_eq!(feed(&mut buf, &[9, 9, 9]), Append::Read(3));
        assert_eq!(buf.as_slice(), &[4, 5, 6, 7, 8, 9, 9, 9]);
    }

    #[test]
    fn would_block_and_interrupted_are_not_errors() {
        let mut buf = StreamBuf::with_capacity(8);

        let appended = buf
            .append_from(|_| Err(io::ErrorKind::WouldBlock.into()))
            .unwrap();
        assert_eq!(appended, Append::WouldBlock);

        let appended = buf
            .append_from(|_| Err(io::ErrorKind::Interrupted.into()))
            .unwrap();
        assert_eq!(appended, Append::WouldBlock);

        assert!(buf.is_empty());
    }

    #[test]
    fn zero_byte_read_is_end_of_stream() {
        let mut buf = StreamBuf::with_capacity(8);

        let appended = buf.append_from(|_| Ok(0)).unwrap();
        assert_eq!(appended, Append::Eof);
        assert!(buf.is_empty());
    }

    #[test]
    fn genuine_read_errors_propagate() {
        let mut buf = StreamBuf::with_capacity(8);

        let err = buf
            .append_from(|_| Err(io::ErrorKind::PermissionDenied.into()))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn find_returns_earliest_match() {
        let mut buf = StreamBuf::with_capacity(32);
        feed(&mut buf, b"..ab..ab");

        assert_eq!(buf.find(b"ab"), Some(2));
    }

    #[test]
    fn find_reaches_the_very_end() {
        let mut buf = StreamBuf::with_capacity(32);
        feed(&mut buf, b"xxxxab");

        assert_eq!(buf.find(b"ab"), Some(4));
    }

    #[test]
    fn find_miss_does_not_mutate() {
        let mut buf = StreamBuf::with_capacity(32);
        feed(&mut buf, b"abcdef");

        assert_eq!(buf.find(b"zz"), None);
        assert_eq!(buf.as_slice(), b"abcdef");
    }

    #[test]
    fn find_honors_the_head_cursor() {
        let mut buf = StreamBuf::with_capacity(32);
        feed(&mut buf, b"ab..ab");
        buf.discard(1);

        assert_eq!(buf.find(b"ab"), Some(4));
    }

    #[test]
    fn seek_discards_everything_before_a_match() {
        let mut buf = StreamBuf::with_capacity(32);
        feed(&mut buf, b"..abXY");

        let pos = buf.find(b"ab").unwrap();
        buf.seek(pos);

        assert_eq!(buf.as_slice(), b"abXY");
    }

    #[test]
    fn retain_last_keeps_newest_bytes_in_order() {
        let mut buf = StreamBuf::with_capacity(32);
        feed(&mut buf, b"abcdefg");

        buf.retain_last(3);
        assert_eq!(buf.as_slice(), b"efg");
    }

    #[test]
    fn retain_last_of_a_short_buffer_is_a_noop() {
        let mut buf = StreamBuf::with_capacity(32);
        feed(&mut buf, b"ab");

        buf.retain_last(3);
        assert_eq!(buf.as_slice(), b"ab");
    }

    #[test]
    fn emptied_buffer_rests_at_offset_zero() {
        let mut buf = StreamBuf::with_capacity(8);

        feed(&mut buf, &[7; 8]);
        buf.drain_to(None, |chunk| Ok(chunk.len())).unwrap();
        assert!(buf.is_empty());

        // The cursors went back to the start, so absolute positions
        // start over too.
        feed(&mut buf, b"ab");
        assert_eq!(buf.find(b"ab"), Some(0));
    }

    #[test]
    fn blocked_writer_keeps_bytes_buffered() {
        let mut buf = StreamBuf::with_capacity(32);
        feed(&mut buf, b"abcdef");

        let mut calls = 0;
        let written = buf
            .drain_to(None, |chunk| {
                calls += 1;
                if calls == 1 {
                    assert_eq!(&chunk[..2], b"ab");
                    Ok(2)
                } else {
                    Err(io::ErrorKind::WouldBlock.into())
                }
            })
            .unwrap();

        assert_eq!(written, 2);
        assert_eq!(buf.as_slice(), b"cdef");

        // Once the writer recovers the rest comes out, still in order.
        let mut rest = Vec::new();
        buf.drain_to(None, |chunk| {
            rest.extend_from_slice(chunk);
            Ok(chunk.len())
        })
        .unwrap();
        assert_eq!(rest, b"cdef");
    }

    #[test]
    fn interrupted_writes_are_retried() {
        let mut buf = StreamBuf::with_capacity(32);
        feed(&mut buf, b"abcdef");

        let mut calls = 0;
        let mut out = Vec::new();
        let written = buf
            .drain_to(None, |chunk| {
                calls += 1;
                if calls == 1 {
                    Err(io::ErrorKind::Interrupted.into())
                } else {
                    out.extend_from_slice(chunk);
                    Ok(chunk.len())
                }
            })
            .unwrap();

        assert_eq!(written, 6);
        assert_eq!(out, b"abcdef");
        assert!(buf.is_empty());
    }

    #[test]
    fn drain_respects_the_limit() {
        let mut buf = StreamBuf::with_capacity(32);
        feed(&mut buf, b"abcdef");

        let mut out = Vec::new();
        let written = buf
            .drain_to(Some(4), |chunk| {
                out.extend_from_slice(chunk);
                Ok(chunk.len())
            })
            .unwrap();

        assert_eq!(written, 4);
        assert_eq!(out, b"abcd");
        assert_eq!(buf.as_slice(), b"ef");
    }
}
