//! CLI for the vfunnel range relay.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use vfunnel_core::config::{self, FunnelConfig};

use commands::{run_config, run_serve};

/// Top-level CLI for the vfunnel relay.
#[derive(Debug, Parser)]
#[command(name = "vfunnel")]
#[command(about = "vfunnel: range-aware HTTP relay for media streams", long_about = None)]
pub struct Cli {
    /// Log to stderr instead of the state-dir log file.
    #[arg(long, global = true)]
    pub log_stderr: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run the relay server until Ctrl-C.
    Serve(ServeArgs),

    /// Print the config file location and the effective configuration.
    Config {
        /// Read this file instead of the XDG config file.
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

/// Overrides applied on top of the config file.
#[derive(Debug, Clone, Default, Args)]
pub struct ServeArgs {
    /// Listen address, e.g. 127.0.0.1:9800.
    #[arg(long, value_name = "ADDR")]
    pub addr: Option<String>,

    /// Concurrent block fetches per request.
    #[arg(short = 'p', long, value_name = "N")]
    pub pool_size: Option<usize>,

    /// Bytes per block fetch.
    #[arg(short = 's', long, value_name = "BYTES")]
    pub block_size: Option<u64>,

    /// Read this file instead of the XDG config file.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl ServeArgs {
    pub fn apply(&self, cfg: &mut FunnelConfig) {
        if let Some(addr) = &self.addr {
            cfg.listen_addr = addr.clone();
        }
        if let Some(n) = self.pool_size {
            cfg.pool_size = n;
        }
        if let Some(n) = self.block_size {
            cfg.block_size = n;
        }
    }
}

/// Explicit path if given, else the XDG file (created with defaults when missing).
pub(crate) fn load_config(path: Option<&PathBuf>) -> Result<FunnelConfig> {
    let cfg = match path {
        Some(p) => config::load_from(p)?,
        None => config::load_or_init()?,
    };
    tracing::debug!("loaded config: {:?}", cfg);
    Ok(cfg)
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            CliCommand::Serve(args) => run_serve(&args).await,
            CliCommand::Config { config } => run_config(config.as_ref()),
        }
    }
}

#[cfg(test)]
mod tests;
