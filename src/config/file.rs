// Optional TOML configuration file
//
// Every field is optional; anything left out falls back to CLI/env or the
// built-in defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::ConfigError;
use crate::push::Locale;

/// Partial configuration as read from disk
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub server: Option<ServerSection>,
    #[serde(default)]
    pub firebase: Option<FirebaseSection>,
    #[serde(default)]
    pub limits: Option<LimitsSection>,
    #[serde(default)]
    pub cors: Option<CorsSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub api_key: Option<String>,
    pub locale: Option<Locale>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct FirebaseSection {
    pub credentials: Option<String>,
    pub project_id: Option<String>,
    pub collection: Option<String>,
    pub firestore_base_url: Option<String>,
    pub fcm_base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct LimitsSection {
    pub rate_limit: Option<usize>,
    pub rate_window_secs: Option<u64>,
    pub max_tokens: Option<usize>,
    pub send_concurrency: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct CorsSection {
    pub origins: Option<Vec<String>>,
    pub origin_suffix: Option<String>,
}

impl FileConfig {
    /// Load a config file. A missing file is an error; the caller asked for it.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            ConfigError::File(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        Self::parse(&contents)
            .map_err(|e| ConfigError::File(format!("Failed to parse '{}': {}", path.display(), e)))
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}
