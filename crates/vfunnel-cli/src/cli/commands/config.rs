//! `vfunnel config` – show where the config lives and what it resolves to.

use anyhow::Result;
use std::path::PathBuf;
use vfunnel_core::config;

use crate::cli::load_config;

pub fn run_config(path: Option<&PathBuf>) -> Result<()> {
    let shown = match path {
        Some(p) => p.clone(),
        None => config::config_path()?,
    };
    let cfg = load_config(path)?;
    println!("# {}", shown.display());
    print!("{}", toml::to_string_pretty(&cfg)?);
    Ok(())
}
