use std::path::PathBuf;

use clap::Parser;

/// The command line interface for serial fusion.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Serial device to capture from.
    #[arg(short, long, default_value = "/dev/ttyUSB0")]
    pub device: String,

    /// Line speed, in baud.
    #[arg(short, long, default_value_t = 230_400)]
    pub baud: u32,

    /// File the captured stream is written to. Created if absent,
    /// truncated otherwise.
    #[arg(short, long, default_value = "sensor_data.bin")]
    pub output: PathBuf,

    /// Optional file to stream out through the device while capturing.
    #[arg(short, long)]
    pub input: Option<PathBuf>,
}
