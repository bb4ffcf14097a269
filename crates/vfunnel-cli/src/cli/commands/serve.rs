//! `vfunnel serve` – run the relay.

use anyhow::{Context, Result};
use vfunnel_core::server;

use crate::cli::{load_config, ServeArgs};

pub async fn run_serve(args: &ServeArgs) -> Result<()> {
    let mut cfg = load_config(args.config.as_ref())?;
    args.apply(&mut cfg);
    cfg.validate().context("invalid configuration")?;
    server::run(&cfg).await
}
