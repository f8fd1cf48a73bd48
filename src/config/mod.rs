//! Server configuration
//!
//! Settings come from three layers: built-in defaults, an optional TOML
//! file, and CLI flags / environment variables (highest priority).

pub mod credentials;
pub mod file;
pub mod merger;

pub use file::FileConfig;
pub use merger::{ConfigMerger, ConfigOverrides};

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::admission::{DEFAULT_RATE_LIMIT, DEFAULT_RATE_WINDOW};
use crate::push::{Locale, DEFAULT_SEND_CONCURRENCY};
use crate::resolver::{DEFAULT_TOKENS_COLLECTION, MAX_TOKENS_PER_REQUEST};

/// Origins allowed by default (local frontend dev/preview servers)
pub const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:5173",
    "http://localhost:4173",
    "http://127.0.0.1:5173",
    "http://127.0.0.1:4173",
];

/// Host suffix of preview deployments allowed over https
pub const DEFAULT_CORS_ORIGIN_SUFFIX: &str = ".vercel.app";

#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Config file error: {0}")]
    File(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Fully resolved server configuration
#[derive(Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Shared secret for `X-API-Key`; `None` disables the check
    pub api_key: Option<String>,
    /// Service-account key file; `None` means ambient credentials
    pub credentials_path: Option<PathBuf>,
    pub project_id: Option<String>,
    pub collection: String,
    pub max_tokens: usize,
    pub rate_limit: usize,
    pub rate_window: Duration,
    pub send_concurrency: usize,
    pub request_timeout: Duration,
    pub cors_origins: Vec<String>,
    pub cors_origin_suffix: Option<String>,
    pub locale: Locale,
    pub firestore_base_url: Option<String>,
    pub fcm_base_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8000,
            api_key: None,
            credentials_path: None,
            project_id: None,
            collection: DEFAULT_TOKENS_COLLECTION.to_string(),
            max_tokens: MAX_TOKENS_PER_REQUEST,
            rate_limit: DEFAULT_RATE_LIMIT,
            rate_window: DEFAULT_RATE_WINDOW,
            send_concurrency: DEFAULT_SEND_CONCURRENCY,
            request_timeout: Duration::from_secs(10),
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
            cors_origin_suffix: Some(DEFAULT_CORS_ORIGIN_SUFFIX.to_string()),
            locale: Locale::default(),
            firestore_base_url: None,
            fcm_base_url: None,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit == 0 {
            return Err(ConfigError::Invalid("rate_limit must be at least 1".to_string()));
        }
        if self.rate_window.is_zero() {
            return Err(ConfigError::Invalid(
                "rate_window_secs must be at least 1".to_string(),
            ));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::Invalid("max_tokens must be at least 1".to_string()));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.collection.trim().is_empty() {
            return Err(ConfigError::Invalid("collection must not be empty".to_string()));
        }
        Ok(())
    }

    /// Endpoints are overridden and no key file was found: talk to local
    /// Firebase emulators with their fixed admin token instead of Google OAuth.
    pub fn uses_emulator(&self) -> bool {
        self.credentials_path.is_none()
            && (self.firestore_base_url.is_some() || self.fcm_base_url.is_some())
    }
}

// Keep the API key out of logs
impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind", &self.bind)
            .field("port", &self.port)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("credentials_path", &self.credentials_path)
            .field("project_id", &self.project_id)
            .field("collection", &self.collection)
            .field("max_tokens", &self.max_tokens)
            .field("rate_limit", &self.rate_limit)
            .field("rate_window", &self.rate_window)
            .field("send_concurrency", &self.send_concurrency)
            .field("cors_origins", &self.cors_origins)
            .field("cors_origin_suffix", &self.cors_origin_suffix)
            .field("locale", &self.locale)
            .finish_non_exhaustive()
    }
}
