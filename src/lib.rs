#![deny(missing_docs)]

//! This crate captures framed sensor data from a serial port.
//!
//! The port is opened raw and non-blocking. Incoming bytes accumulate in a
//! fixed-size buffer until the start-of-frame marker is located; from the
//! marker onward the stream is written verbatim to a capture file.
//!
//! A local file can be streamed out through the same port concurrently,
//! paced by the port's write readiness. One task drives both directions;
//! nothing here spawns or locks.

/// Fixed-capacity byte buffering between the device and the files.
pub mod buffer;

/// The command line interface.
pub mod cli;

/// Possible errors in this library.
pub mod error;

/// Locating the start-of-frame marker in the inbound stream.
pub mod frame;

/// Logging/tracing setup.
pub mod logging;

/// Mocked wire, useful for tests.
pub mod mock;

/// Serial port opening.
pub mod serial;

/// The capture session: buffers, synchronizer, and the event loop.
pub mod session;
