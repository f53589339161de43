//! Configuration file and settings resolution.
//!
//! Values come from, in order of precedence: command-line flags, the
//! environment, the TOML config file, built-in defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use swupdate_ipc::{
    IpcClient, RetryConfig, DEFAULT_IO_TIMEOUT, DEFAULT_POLL_INTERVAL, DEFAULT_SOCKET_PATH,
};
use tracing::debug;

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub client: ClientSection,
    pub selection: SelectionSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientSection {
    pub socket: Option<PathBuf>,
    /// Attempts to start an installation
    pub retries: Option<u32>,
    pub retry_delay_secs: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub io_timeout_secs: Option<u64>,
    pub post_update: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SelectionSection {
    pub software_set: Option<String>,
    pub running_mode: Option<String>,
}

impl FileConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("swupdateclient").join("config.toml"))
    }

    /// Load `explicit`, or the default file when it exists.
    ///
    /// An explicit path must exist; a missing default file means defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_path(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        debug!("loaded config from {}", path.display());
        text.parse::<Self>()
            .with_context(|| format!("Invalid config: {:?}", path))
    }
}

impl std::str::FromStr for FileConfig {
    type Err = toml::de::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        toml::from_str(s)
    }
}

/// Settings after merging all sources.
#[derive(Debug, Clone)]
pub struct Settings {
    pub socket: PathBuf,
    pub retry: RetryConfig,
    pub poll_interval: Duration,
    pub io_timeout: Duration,
    pub post_update: bool,
    pub software_set: Option<String>,
    pub running_mode: Option<String>,
}

impl Settings {
    /// Merge the config file with the socket from the flag or environment.
    pub fn resolve(file: FileConfig, socket: Option<PathBuf>) -> Self {
        let client = file.client;
        let default_retry = RetryConfig::default();

        Self {
            socket: socket
                .or(client.socket)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SOCKET_PATH)),
            retry: RetryConfig::new(
                client.retries.unwrap_or(default_retry.max_attempts),
                client
                    .retry_delay_secs
                    .map(Duration::from_secs)
                    .unwrap_or(default_retry.delay),
            ),
            poll_interval: client
                .poll_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_POLL_INTERVAL),
            io_timeout: client
                .io_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_IO_TIMEOUT),
            post_update: client.post_update.unwrap_or(true),
            software_set: file.selection.software_set,
            running_mode: file.selection.running_mode,
        }
    }

    pub fn client(&self) -> IpcClient {
        IpcClient::new(&self.socket).with_timeout(self.io_timeout)
    }
}
