//! CLI command handlers, one per file.

mod config;
mod serve;

pub use config::run_config;
pub use serve::run_serve;
