use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::debug;

use crate::error::Error;

/// Open `path` at `baud` as a raw 8-N-1 stream with no flow control.
///
/// The returned stream is non-blocking: reads hand over whatever is
/// pending as soon as a single byte is available, and both directions
/// report readiness instead of blocking. The serial stack configures the
/// line discipline on open and restores the port when the stream drops.
pub fn open(path: &str, baud: u32) -> Result<SerialStream, Error> {
    debug!(%path, baud, "Opening port");

    tokio_serial::new(path, baud)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .open_native_async()
        .map_err(|source| Error::PortOpen {
            path: path.to_string(),
            source,
        })
}
