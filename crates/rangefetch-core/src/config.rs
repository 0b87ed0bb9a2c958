use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::DownloadError;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/107.0.0.0 Safari/537.36";

/// How requests pick a proxy.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ProxyPolicy {
    /// Never use a proxy, even if `http_proxy`/`https_proxy` are set.
    None,
    /// Honor the standard proxy environment variables.
    #[default]
    Environment,
    /// Use this proxy for every request.
    Url { url: String },
}

impl ProxyPolicy {
    /// Checks that an explicit proxy URL parses.
    pub fn validate(&self) -> Result<(), DownloadError> {
        if let ProxyPolicy::Url { url } = self {
            url::Url::parse(url).map_err(|source| DownloadError::InvalidProxy {
                url: url.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

/// What happens to segment files when a fetch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Close and remove every segment file.
    #[default]
    Delete,
    /// Close the handles but leave the files on disk. Nothing reads them back yet.
    Retain,
}

/// Settings shared by every task. Built once, then passed by value to each
/// [`crate::downloader::DownloadTask`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Directory the final file is written to.
    pub save_dir: PathBuf,
    /// Number of concurrent range workers (at least 1).
    pub workers: usize,
    /// Deadline for the whole fetch phase, in seconds.
    pub timeout_secs: u64,
    /// Sent as `User-Agent`; empty disables the header.
    pub user_agent: String,
    pub proxy: ProxyPolicy,
    pub failure_policy: FailurePolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            save_dir: PathBuf::from("."),
            workers: 4,
            timeout_secs: 60,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            proxy: ProxyPolicy::default(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Rejects values that would only fail later, after network activity.
    pub fn validate(&self) -> Result<(), DownloadError> {
        if self.workers == 0 {
            return Err(DownloadError::InvalidWorkers);
        }
        self.proxy.validate()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("rangefetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FetchConfig> {
    load_or_init_at(&config_path()?)
}

pub fn load_or_init_at(path: &Path) -> Result<FetchConfig> {
    if !path.exists() {
        let default_cfg = FetchConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)
            .with_context(|| format!("failed to write default config {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let cfg: FetchConfig =
        toml::from_str(&data).with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}
