//! Configuration management for dbx-query.
//!
//! Handles loading configuration from TOML files and environment variables:
//! the workspace endpoint and credential, plus the execution tuning knobs.

use crate::error::{QueryError, Result};
use crate::query::PollPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Default execution timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Workspace endpoint and credential.
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// Execution settings.
    #[serde(default)]
    pub execution: ExecutionConfig,
}

/// Workspace endpoint and credential.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct WorkspaceConfig {
    /// Workspace URL, e.g. `https://<workspace>.cloud.databricks.com`.
    pub host: Option<String>,

    /// Personal access token (not recommended to store in config).
    pub token: Option<String>,

    /// Default SQL warehouse to run statements on.
    pub warehouse_id: Option<String>,
}

impl fmt::Debug for WorkspaceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkspaceConfig")
            .field("host", &self.host)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("warehouse_id", &self.warehouse_id)
            .finish()
    }
}

/// Validated endpoint and bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub host: String,
    pub token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl WorkspaceConfig {
    /// Merges another config into this one, with the other taking precedence.
    pub fn merge(&mut self, other: &WorkspaceConfig) {
        if other.host.is_some() {
            self.host = other.host.clone();
        }
        if other.token.is_some() {
            self.token = other.token.clone();
        }
        if other.warehouse_id.is_some() {
            self.warehouse_id = other.warehouse_id.clone();
        }
    }

    /// Applies environment variables (DATABRICKS_HOST, etc.) as defaults.
    pub fn apply_env_defaults(&mut self) {
        if self.host.is_none() {
            self.host = std::env::var("DATABRICKS_HOST").ok();
        }
        if self.token.is_none() {
            self.token = std::env::var("DATABRICKS_TOKEN").ok();
        }
        if self.warehouse_id.is_none() {
            self.warehouse_id = std::env::var("DATABRICKS_WAREHOUSE_ID").ok();
        }
    }

    /// Validates the endpoint and credential.
    pub fn credentials(&self) -> Result<Credentials> {
        let host = self
            .host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| QueryError::config("DATABRICKS_HOST is required"))?;

        let url = Url::parse(host)
            .map_err(|e| QueryError::config(format!("Invalid workspace host '{}': {e}", host)))?;
        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(QueryError::config(format!(
                "Invalid scheme '{}'. Expected 'https' or 'http'",
                url.scheme()
            )));
        }

        let token = self
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| QueryError::config("DATABRICKS_TOKEN is required"))?;

        Ok(Credentials {
            host: host.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }
}

/// Execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Overall budget for submission and polling.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Wait between status polls.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound on concurrent external link downloads.
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Per-request HTTP timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_max_concurrent_fetches() -> usize {
    4
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ExecutionConfig {
    /// Returns the execution timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns the per-request HTTP timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Returns the polling backoff policy.
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(Duration::from_millis(self.poll_interval_ms))
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dbx-query")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| QueryError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| {
            QueryError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects execution settings that would stall or never poll.
    pub fn validate(&self) -> Result<()> {
        if self.execution.poll_interval_ms == 0 {
            return Err(QueryError::config("execution.poll_interval_ms must be positive"));
        }
        if self.execution.max_concurrent_fetches == 0 {
            return Err(QueryError::config(
                "execution.max_concurrent_fetches must be at least 1",
            ));
        }
        Ok(())
    }
}
