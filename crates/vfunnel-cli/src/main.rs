use clap::Parser;
use vfunnel_core::logging;

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.log_stderr {
        logging::init_logging_stderr();
    } else if let Err(err) = logging::init_logging() {
        eprintln!("vfunnel: file logging unavailable ({:#}), logging to stderr", err);
        logging::init_logging_stderr();
    }

    if let Err(err) = cli.run().await {
        tracing::error!("{:#}", err);
        eprintln!("vfunnel error: {:#}", err);
        std::process::exit(1);
    }
}
