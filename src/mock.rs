//! A mock, useful to test session behavior without an actual serial port.

use std::collections::VecDeque;
use std::future;
use std::io;
use std::sync::{Arc, Mutex};

use tracing::trace;

use crate::session::WirePort;

/// Builder for a [`MockWire`].
#[derive(Debug, Default)]
pub struct MockWireBuilder {
    chunks: VecDeque<Vec<u8>>,
    disconnect_when_drained: bool,
    write_limit: Option<usize>,
    refuse_writes: usize,
}

impl MockWireBuilder {
    /// Queue `bytes` as one read burst. Each burst is handed out by a
    /// single `try_read` call, so chunk boundaries model how bytes arrive
    /// off the wire.
    pub fn chunk(mut self, bytes: &[u8]) -> Self {
        self.chunks.push_back(bytes.to_vec());
        self
    }

    /// Report end-of-stream once every chunk has been read, like a device
    /// that got unplugged. Without this the wire stays open and idle.
    pub fn disconnect_when_drained(mut self) -> Self {
        self.disconnect_when_drained = true;
        self
    }

    /// Accept at most `limit` bytes per `try_write` call, forcing the
    /// session through its partial-write handling.
    pub fn write_limit(mut self, limit: usize) -> Self {
        self.write_limit = Some(limit);
        self
    }

    /// Refuse the first `count` writes with a would-block condition.
    pub fn refuse_first_writes(mut self, count: usize) -> Self {
        self.refuse_writes = count;
        self
    }

    /// Finish the script.
    #[must_use]
    pub fn build(self) -> MockWire {
        MockWire {
            incoming: self.chunks,
            disconnect_when_drained: self.disconnect_when_drained,
            write_limit: self.write_limit,
            refuse_writes: self.refuse_writes,
            written: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// A scripted in-memory wire implementing [`WirePort`].
///
/// The read side replays the chunks queued at build time; the write side
/// records everything the session puts on the wire, retrievable through
/// [`outbox`](Self::outbox) even after the session has consumed the wire.
#[derive(Debug)]
pub struct MockWire {
    incoming: VecDeque<Vec<u8>>,
    disconnect_when_drained: bool,
    write_limit: Option<usize>,
    refuse_writes: usize,
    written: Arc<Mutex<Vec<u8>>>,
}

impl MockWire {
    /// Start scripting a wire.
    pub fn builder() -> MockWireBuilder {
        MockWireBuilder::default()
    }

    /// Handle to the bytes written to the wire so far.
    pub fn outbox(&self) -> Arc<Mutex<Vec<u8>>> {
        Arc::clone(&self.written)
    }
}

impl WirePort for MockWire {
    async fn readable(&self) -> io::Result<()> {
        if self.incoming.is_empty() && !self.disconnect_when_drained {
            // Nothing scripted and no disconnect coming: an idle wire
            // never becomes readable again.
            future::pending::<()>().await;
        }
        Ok(())
    }

    async fn writable(&self) -> io::Result<()> {
        // Write readiness is always granted; refusals are modeled in
        // `try_write` so backpressure handling gets exercised.
        Ok(())
    }

    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(mut chunk) = self.incoming.pop_front() else {
            if self.disconnect_when_drained {
                return Ok(0);
            }
            return Err(io::ErrorKind::WouldBlock.into());
        };

        let count = chunk.len().min(buf.len());
        buf[..count].copy_from_slice(&chunk[..count]);

        // A burst bigger than the free space stays queued for the next
        // read, like bytes left in the driver's own buffer.
        if count < chunk.len() {
            chunk.drain(..count);
            self.incoming.push_front(chunk);
        }

        trace!(count, "mock wire read");
        Ok(count)
    }

    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.refuse_writes > 0 {
            self.refuse_writes -= 1;
            return Err(io::ErrorKind::WouldBlock.into());
        }

        let count = match self.write_limit {
            Some(limit) => limit.min(buf.len()),
            None => buf.len(),
        };

        self.written
            .lock()
            .expect("mock outbox lock cannot be poisoned")
            .extend_from_slice(&buf[..count]);

        trace!(count, "mock wire write");
        Ok(count)
    }
}
