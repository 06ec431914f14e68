use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::executor::ExecutorConfig;
use crate::offload;

/// HTTP transport tunables for the direct-URL source (optional `[http]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Abort when throughput stays below this many bytes per second...
    pub low_speed_limit: u32,
    /// ...for this many seconds.
    pub low_speed_time_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 15,
            low_speed_limit: 1024,
            low_speed_time_secs: 60,
        }
    }
}

/// yt-dlp settings (optional `[ytdlp]` section).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct YtDlpConfig {
    /// Path to the yt-dlp binary; searched in common locations and PATH if unset.
    #[serde(default)]
    pub binary: Option<PathBuf>,
}

/// Which media source resolves targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceBackend {
    /// yt-dlp if it is runnable, otherwise direct HTTP.
    #[default]
    Auto,
    /// Direct http(s) media URLs via libcurl.
    Http,
    /// yt-dlp subprocess.
    #[serde(rename = "ytdlp")]
    YtDlp,
}

/// Global configuration loaded from `~/.config/ytd/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YtdConfig {
    /// Offload worker threads; `None` = `min(32, cpus + 4)`.
    #[serde(default)]
    pub offload_workers: Option<usize>,
    /// Seconds shutdown waits for in-flight jobs before interrupting them.
    pub shutdown_grace_secs: u64,
    /// Default destination directory (None = current directory).
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
    /// Default HTTP proxy, e.g. "http://127.0.0.1:8881".
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default)]
    pub source: SourceBackend,
    #[serde(default)]
    pub http: Option<HttpConfig>,
    #[serde(default)]
    pub ytdlp: Option<YtDlpConfig>,
}

impl Default for YtdConfig {
    fn default() -> Self {
        Self {
            offload_workers: None,
            shutdown_grace_secs: 30,
            download_dir: None,
            proxy: None,
            source: SourceBackend::Auto,
            http: None,
            ytdlp: None,
        }
    }
}

impl YtdConfig {
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            offload_workers: self
                .offload_workers
                .unwrap_or_else(offload::default_worker_count)
                .max(1),
            shutdown_grace: Duration::from_secs(self.shutdown_grace_secs),
        }
    }

    pub fn http_or_default(&self) -> HttpConfig {
        self.http.clone().unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("ytd")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<YtdConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = YtdConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: YtdConfig = toml::from_str(&data)?;
    Ok(cfg)
}
