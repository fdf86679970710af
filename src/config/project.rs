use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ModulesConfig;

/// File picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "tool-hub.toml";

const DEFAULT_CALL_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SEED: &str = "tool-hub";

/// Hub-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Upper bound on a single tool call; `0` disables the bound
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,

    /// Seed for the synthetic data sources
    #[serde(default = "default_seed")]
    pub seed: String,

    /// Retry behaviour for data-source fetches
    #[serde(default)]
    pub retry: RetrySettings,

    /// Per-module settings
    #[serde(default)]
    pub modules: ModulesConfig,
}

fn default_call_timeout() -> u64 {
    DEFAULT_CALL_TIMEOUT_SECS
}

fn default_seed() -> String {
    DEFAULT_SEED.to_string()
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: DEFAULT_CALL_TIMEOUT_SECS,
            seed: default_seed(),
            retry: RetrySettings::default(),
            modules: ModulesConfig::default(),
        }
    }
}

impl HubConfig {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, `./tool-hub.toml` is used when
    /// present, otherwise the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Self::from_file(&local);
        }

        debug!("no configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Read and parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config = Self::from_toml_str(&raw)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// The hub-wide call timeout, if enabled
    pub fn call_timeout(&self) -> Option<Duration> {
        (self.call_timeout_secs > 0).then(|| Duration::from_secs(self.call_timeout_secs))
    }
}

/// Retry settings for transient data-source failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

fn default_max_retries() -> u32 {
    2
}

fn default_base_delay_ms() -> u64 {
    200
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}
