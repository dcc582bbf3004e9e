//! Dashboard configuration.
//!
//! Resolution order, lowest to highest priority: built-in defaults, the TOML
//! file at `~/.dealflow/config.toml`, then explicit overrides (environment
//! variables and CLI flags, both resolved by clap).

use crate::client::ClientConfig;
use crate::tracker::PollPolicy;
use dealflow_protocol::defaults::{
    DEFAULT_BASE_URL, DEFAULT_MAX_TRANSIENT_RETRIES, DEFAULT_PAGE_SIZE,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_RETRY_INTERVAL_MS,
};
use dealflow_protocol::paths::default_config_path;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid base_url {value:?}: {reason}")]
    InvalidBaseUrl { value: String, reason: String },
    #[error("table.page_size must be greater than 0")]
    InvalidPageSize,
    #[error("poll.interval_ms must be greater than 0")]
    InvalidPollInterval,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_ms: u64,
    pub retry_interval_ms: u64,
    pub max_transient_retries: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
            retry_interval_ms: DEFAULT_RETRY_INTERVAL_MS,
            max_transient_retries: DEFAULT_MAX_TRANSIENT_RETRIES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub page_size: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_cookie: Option<String>,
    pub request_timeout_secs: u64,
    pub poll: PollConfig,
    pub table: TableConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_dir: Option<PathBuf>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            session_cookie: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            poll: PollConfig::default(),
            table: TableConfig::default(),
            export_dir: None,
        }
    }
}

/// Values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub session_cookie: Option<String>,
    pub page_size: Option<usize>,
}

impl DashboardConfig {
    /// Load from the default location. A missing file yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&default_config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file; using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(base_url) = &overrides.base_url {
            self.base_url = base_url.clone();
        }
        if let Some(cookie) = &overrides.session_cookie {
            self.session_cookie = Some(cookie.clone());
        }
        if let Some(page_size) = overrides.page_size {
            self.table.page_size = page_size;
        }
        self
    }

    /// Check every field and return the parsed base URL.
    pub fn validate(&self) -> Result<Url, ConfigError> {
        let base_url = parse_base_url(&self.base_url)?;
        if self.table.page_size == 0 {
            return Err(ConfigError::InvalidPageSize);
        }
        if self.poll.interval_ms == 0 {
            return Err(ConfigError::InvalidPollInterval);
        }
        Ok(base_url)
    }

    pub fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        Ok(ClientConfig {
            base_url: self.validate()?,
            timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
            session_cookie: self.session_cookie.clone(),
        })
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.poll.interval_ms),
            retry_interval: Duration::from_millis(self.poll.retry_interval_ms),
            max_transient_retries: self.poll.max_transient_retries,
        }
    }

    /// Directory exports land in when no explicit path is given.
    pub fn export_dir(&self) -> PathBuf {
        self.export_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Copy safe to print: the session cookie is masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.session_cookie.is_some() {
            copy.session_cookie = Some("<redacted>".to_string());
        }
        copy
    }
}

fn parse_base_url(value: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        value: value.to_string(),
        reason,
    };

    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(invalid("must not be empty".to_string()));
    }
    let url = Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}
