use serde::{Deserialize, Serialize};

/// Per-module settings, handed to each module when it is constructed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Whether the module is registered at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Credential for a network-backed data source
    #[serde(default)]
    pub api_key: Option<String>,

    /// Overrides the hub-wide call timeout for this module's tools
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_enabled() -> bool {
    true
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            timeout_secs: None,
        }
    }
}

/// Settings for the four built-in modules
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModulesConfig {
    #[serde(default)]
    pub agricultural: ModuleConfig,

    #[serde(default)]
    pub trade: ModuleConfig,

    #[serde(default)]
    pub culture: ModuleConfig,

    #[serde(default)]
    pub finance: ModuleConfig,
}
