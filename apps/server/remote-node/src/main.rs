use remote_node::cli::Args;
use remote_node::error::NodeError;
use remote_node::logger::initialize as LoggerInitialize;
use remote_node::node;

use common::ErrorLocation;
use remote_core::CoreError;

use std::fs::create_dir_all;
use std::panic::Location;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), NodeError> {
    create_dir_all(&args.log_dir).map_err(|e| NodeError::Node {
        message: format!(
            "Failed to create log directory {}: {e}",
            args.log_dir.display()
        ),
        location: ErrorLocation::from(Location::caller()),
    })?;

    // Logger first so config errors end up in the log file
    LoggerInitialize(&args.log_dir)?;

    let mut service = node::start(&args.config).await?;
    info!("Press Ctrl-C to stop");

    let signal = tokio::signal::ctrl_c().await.map_err(|e| NodeError::Node {
        message: format!("Failed to wait for Ctrl-C: {e}"),
        location: ErrorLocation::from(Location::caller()),
    });

    info!("Shutting down (force: {})", args.force_stop);
    service
        .stop(args.force_stop)
        .await
        .map_err(CoreError::from)?;

    signal
}
