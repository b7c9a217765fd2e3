use std::{io, path::PathBuf};

use thiserror::Error;

/// Any error this tool might encounter.
#[derive(Debug, Error)]
pub enum Error {
    /// Opening or configuring the serial port failed.
    #[error("cannot open serial port `{path}`")]
    PortOpen {
        /// The device that would not open.
        path: String,

        /// What the serial stack reported.
        #[source]
        source: tokio_serial::Error,
    },

    /// Opening the capture or replay file failed.
    #[error("cannot open `{path}`")]
    FileOpen {
        /// The file that would not open.
        path: PathBuf,

        /// What the filesystem reported.
        #[source]
        source: io::Error,
    },

    /// The device reached end-of-stream, which for a serial port means it
    /// went away underneath us.
    #[error("serial port disconnected")]
    Disconnected,

    /// Underlying IO problem on an already-open handle.
    #[error("underlying IO problem")]
    Io(#[from] io::Error),
}
