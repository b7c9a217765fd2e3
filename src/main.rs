use std::fs::File;

use clap::Parser;
use color_eyre::Result;
use serial_fusion::{cli, error::Error, logging, serial, session::Session};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init().await;

    let cli = cli::Cli::parse();

    let port = serial::open(&cli.device, cli.baud)?;

    let sink = File::create(&cli.output).map_err(|source| Error::FileOpen {
        path: cli.output.clone(),
        source,
    })?;

    let source = match &cli.input {
        Some(path) => Some(File::open(path).map_err(|source| Error::FileOpen {
            path: path.clone(),
            source,
        })?),
        None => None,
    };

    let mut session = Session::new(port, source, sink);

    let outcome = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C, quitting");
            Ok(())
        }
        res = session.run() => res,
    };

    // Teardown happens either way; a fatal session error is what the
    // process should report.
    let teardown = session.finish();
    outcome?;
    teardown?;

    Ok(())
}
