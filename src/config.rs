//! Client configuration.
//!
//! Values are layered: built-in defaults, then `~/.kbchat/config.json`, then
//! `KBCHAT_*` environment variables, then command-line flags (applied by the
//! caller through the `with_*` builders).
//!
//! # Example
//!
//! ```ignore
//! use kbchat::config::ClientConfig;
//!
//! let config = ClientConfig::load()?
//!     .with_base_url("http://127.0.0.1:9000/api")
//!     .with_submit_policy(SubmitPolicy::Reject);
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::api::DEFAULT_BASE_URL;
use crate::error::ConfigError;
use crate::session::{FailurePolicy, SubmitPolicy};

const CONFIG_DIR: &str = ".kbchat";
const CONFIG_FILE: &str = "config.json";

pub const ENV_API_URL: &str = "KBCHAT_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "KBCHAT_TIMEOUT_SECS";
pub const ENV_SUBMIT_POLICY: &str = "KBCHAT_SUBMIT_POLICY";
pub const ENV_FAILURE_POLICY: &str = "KBCHAT_FAILURE_POLICY";

/// Resolved client settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// API root, e.g. `http://localhost:8000/api`
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Applies to plain requests; chat streams are bounded by cancellation
    pub request_timeout: Duration,
    pub submit_policy: SubmitPolicy,
    pub failure_policy: FailurePolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            submit_policy: SubmitPolicy::default(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// On-disk shape; every field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    base_url: Option<String>,
    connect_timeout_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
    submit_policy: Option<SubmitPolicy>,
    failure_policy: Option<FailurePolicy>,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_submit_policy(mut self, policy: SubmitPolicy) -> Self {
        self.submit_policy = policy;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// `~/.kbchat/config.json`, or `None` when there is no home directory.
    pub fn default_path() -> Option<PathBuf> {
        Some(dirs::home_dir()?.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Defaults, the default config file and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        Self::load_from(path.as_deref())?.apply_env()
    }

    /// Defaults overlaid with the file at `path`.
    ///
    /// A missing file is not an error; an unreadable or malformed one is.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = Self::default();
        let Some(path) = path else {
            return Ok(config);
        };
        if !path.exists() {
            debug!(path = %path.display(), "No config file");
            return Ok(config);
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(config.merge(file))
    }

    fn merge(mut self, file: ConfigFile) -> Self {
        if let Some(url) = file.base_url {
            self.base_url = url;
        }
        if let Some(secs) = file.connect_timeout_secs {
            self.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = file.request_timeout_secs {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(policy) = file.submit_policy {
            self.submit_policy = policy;
        }
        if let Some(policy) = file.failure_policy {
            self.failure_policy = policy;
        }
        self
    }

    /// Overlay `KBCHAT_*` variables from the process environment.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Overlay `KBCHAT_*` variables read through `lookup`.
    ///
    /// Empty values are ignored.
    pub fn apply_env_with<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_API_URL) {
            self.base_url = url.trim().to_string();
        }
        if let Some(value) = get(ENV_TIMEOUT_SECS) {
            let secs: u64 = value
                .trim()
                .parse()
                .map_err(|_| invalid(ENV_TIMEOUT_SECS, &value))?;
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(value) = get(ENV_SUBMIT_POLICY) {
            self.submit_policy = value
                .parse()
                .map_err(|_| invalid(ENV_SUBMIT_POLICY, &value))?;
        }
        if let Some(value) = get(ENV_FAILURE_POLICY) {
            self.failure_policy = value
                .parse()
                .map_err(|_| invalid(ENV_FAILURE_POLICY, &value))?;
        }
        Ok(self)
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}
