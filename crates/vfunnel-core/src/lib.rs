pub mod config;
pub mod logging;

pub mod control;
pub mod fetcher;
pub mod planner;
pub mod probe;
pub mod range;
pub mod relay;
pub mod retry;
pub mod server;
pub mod source;
