use std::path::PathBuf;

use clap::Parser;

/// Command-line arguments of the `remote-node` binary.
#[derive(Parser, Debug)]
#[command(name = "remote-node")]
#[command(author, version, about = "Run a server node's whitelist-gated remote service", long_about = None)]
pub struct Args {
    /// Node config file (JSON)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Directory for remote-node.log
    #[arg(long, default_value = "logs")]
    pub log_dir: PathBuf,

    /// Drop open connections on shutdown instead of letting them finish
    #[arg(long)]
    pub force_stop: bool,
}
