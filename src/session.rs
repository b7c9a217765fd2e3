use std::io::{self, Read, Write};

use tracing::{debug, info, trace};

use crate::{
    buffer::{Append, StreamBuf},
    error::Error,
    frame::FrameSync,
};

/// Bytes queued towards the device before the source is paused.
const OUTBOUND_CAPACITY: usize = 512;

/// The inbound side runs deeper than the outbound one: the device produces
/// at line rate whether or not the sink keeps up.
const INBOUND_CAPACITY: usize = 4 * OUTBOUND_CAPACITY;

/// The readiness and non-blocking transfer contract of the device.
///
/// This is the shape of [`tokio_serial::SerialStream`], and of
/// [`MockWire`](crate::mock::MockWire) for tests: wait for readiness,
/// then move bytes without blocking, reporting would-block when the
/// readiness turned out to be stale.
#[allow(async_fn_in_trait)]
pub trait WirePort {
    /// Wait until at least one byte can be read.
    async fn readable(&self) -> io::Result<()>;

    /// Wait until the device can accept bytes.
    async fn writable(&self) -> io::Result<()>;

    /// Read whatever is pending into `buf`, without blocking.
    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write as much of `buf` as the device accepts, without blocking.
    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize>;
}

impl WirePort for tokio_serial::SerialStream {
    async fn readable(&self) -> io::Result<()> {
        tokio_serial::SerialStream::readable(self).await
    }

    async fn writable(&self) -> io::Result<()> {
        tokio_serial::SerialStream::writable(self).await
    }

    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        tokio_serial::SerialStream::try_read(self, buf)
    }

    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize> {
        tokio_serial::SerialStream::try_write(self, buf)
    }
}

enum Ready {
    Read,
    Write,
}

/// One capture session over an open device.
///
/// Owns the device, both directions' buffers, the synchronizer, and the
/// two file handles for its whole run; everything happens on the one task
/// driving [`run`](Self::run).
pub struct Session<P, R, W> {
    // Declaration order is teardown order: the port goes first (its drop
    // restores the port state), then the sink, then the source.
    port: P,
    sink: W,
    source: Option<R>,
    inbound: StreamBuf,
    outbound: StreamBuf,
    sync: FrameSync,
}

impl<P, R, W> Session<P, R, W>
where
    P: WirePort,
    R: Read,
    W: Write,
{
    /// A session with the default buffer capacities.
    pub fn new(port: P, source: Option<R>, sink: W) -> Self {
        Self::with_capacities(port, source, sink, INBOUND_CAPACITY, OUTBOUND_CAPACITY)
    }

    /// A session with explicit buffer capacities.
    pub fn with_capacities(
        port: P,
        source: Option<R>,
        sink: W,
        inbound_capacity: usize,
        outbound_capacity: usize,
    ) -> Self {
        Self {
            port,
            sink,
            source,
            inbound: StreamBuf::with_capacity(inbound_capacity),
            outbound: StreamBuf::with_capacity(outbound_capacity),
            sync: FrameSync::new(),
        }
    }

    /// Drive the session until the device fails or the task is cancelled.
    ///
    /// Each iteration waits for the device to become ready, then pumps the
    /// ready direction as far as it goes without blocking. The device is
    /// always a read interest; it is a write interest only while there is
    /// something to put on the wire, now or eventually.
    pub async fn run(&mut self) -> Result<(), Error> {
        info!("Session started");

        loop {
            let want_write = !self.outbound.is_empty() || self.source.is_some();

            let ready = tokio::select! {
                r = self.port.readable() => {
                    r?;
                    Ready::Read
                }
                r = self.port.writable(), if want_write => {
                    r?;
                    Ready::Write
                }
            };

            match ready {
                Ready::Read => self.pump_inbound()?,
                Ready::Write => self.pump_outbound()?,
            }
        }
    }

    /// Move bytes device → inbound buffer → sink until the device has
    /// nothing more pending.
    ///
    /// While still searching, fresh bytes go through the synchronizer,
    /// which keeps the buffer trimmed. Once synced, everything buffered is
    /// payload and is drained to the sink ahead of each read, so a burst
    /// is flushed within the readiness cycle that produced it.
    fn pump_inbound(&mut self) -> Result<(), Error> {
        loop {
            if self.sync.is_synced() && !self.inbound.is_empty() {
                let sink = &mut self.sink;
                let written = self.inbound.drain_to(None, |chunk| sink.write(chunk))?;
                trace!(written, "Payload to sink");
            }

            let port = &mut self.port;
            match self.inbound.append_from(|buf| port.try_read(buf))? {
                Append::Read(count) => {
                    trace!(count, "From device");
                    if !self.sync.is_synced() {
                        self.sync.scan(&mut self.inbound);
                    }
                }
                Append::WouldBlock => break,
                Append::Full => {
                    // The sink is behind and the buffer is at capacity.
                    // Leave everything in place; the bytes still pending on
                    // the device keep its readiness set, so the sink gets
                    // retried on the next cycle.
                    trace!("Inbound buffer saturated, stalling reads");
                    break;
                }
                Append::Eof => return Err(Error::Disconnected),
            }
        }

        Ok(())
    }

    /// Move bytes source → outbound buffer → device.
    ///
    /// The outbound buffer is refilled from the source only once it has
    /// fully drained. A source at end-of-stream is closed and never
    /// offered for write interest again. A device that stops accepting
    /// ends the drain; whatever remains buffered goes out on a later
    /// write-ready cycle.
    fn pump_outbound(&mut self) -> Result<(), Error> {
        if self.outbound.is_empty() {
            let Some(source) = self.source.as_mut() else {
                return Ok(());
            };

            match self.outbound.append_from(|buf| source.read(buf))? {
                Append::Read(count) => trace!(count, "From source"),
                Append::Eof => {
                    debug!("Source exhausted, closing");
                    self.source = None;
                    return Ok(());
                }
                Append::WouldBlock | Append::Full => return Ok(()),
            }
        }

        let port = &mut self.port;
        let written = self.outbound.drain_to(None, |chunk| port.try_write(chunk))?;
        trace!(written, "To device");

        Ok(())
    }

    /// Flush what the sink has been handed and release every handle, in a
    /// fixed order, regardless of how the session ended.
    pub fn finish(mut self) -> Result<(), Error> {
        debug!("Session finished");
        self.sink.flush()?;
        Ok(())
    }
}
