use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Retry policy parameters for sub-range fetches (optional `[retry]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per block (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 0.25,
            max_delay_secs: 5,
        }
    }
}

/// Global configuration loaded from `~/.config/vfunnel/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelConfig {
    /// Address the proxy listens on.
    pub listen_addr: String,
    /// Concurrent block fetches per client request.
    pub pool_size: usize,
    /// Bytes fetched by one worker per request to upstream.
    pub block_size: u64,
    /// Connect timeout for every upstream request, in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Wall-clock limit for one block fetch (and for the probe), in seconds.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

fn default_connect_timeout_secs() -> u64 {
    15
}

fn default_fetch_timeout_secs() -> u64 {
    60
}

impl Default for FunnelConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9800".to_string(),
            pool_size: 4,
            block_size: 1024 * 1024,
            connect_timeout_secs: default_connect_timeout_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            retry: None,
        }
    }
}

impl FunnelConfig {
    /// Reject values the relay cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            anyhow::bail!("pool_size must be at least 1");
        }
        if self.block_size == 0 {
            anyhow::bail!("block_size must be at least 1 byte");
        }
        if self.fetch_timeout_secs == 0 {
            anyhow::bail!("fetch_timeout_secs must be at least 1");
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("vfunnel")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FunnelConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FunnelConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}

/// Load configuration from an explicit path (no default file is created).
pub fn load_from(path: &Path) -> Result<FunnelConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: FunnelConfig =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}
