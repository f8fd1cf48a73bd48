// Configuration merging with priority
//
// Priority order: CLI/env overrides -> config file -> defaults

use std::path::Path;
use std::time::Duration;

use super::credentials::locate_credentials;
use super::file::FileConfig;
use super::{ConfigError, ServerConfig};
use crate::push::Locale;

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub api_key: Option<String>,
    /// Credential path candidates in priority order
    pub credentials: Vec<Option<String>>,
    pub project_id: Option<String>,
    pub cors_origins: Vec<String>,
    pub locale: Option<Locale>,
}

/// Configuration merger
pub struct ConfigMerger {
    defaults: ServerConfig,
    file: Option<FileConfig>,
    overrides: Option<ConfigOverrides>,
}

impl ConfigMerger {
    pub fn new() -> Self {
        Self {
            defaults: ServerConfig::default(),
            file: None,
            overrides: None,
        }
    }

    pub fn with_file(mut self, file: Option<FileConfig>) -> Self {
        self.file = file;
        self
    }

    pub fn with_overrides(mut self, overrides: Option<ConfigOverrides>) -> Self {
        self.overrides = overrides;
        self
    }

    /// Merge all layers and validate the result.
    ///
    /// `base_dir` is where relative credential paths are tried first.
    pub fn merge(&self, base_dir: Option<&Path>) -> Result<ServerConfig, ConfigError> {
        let mut result = self.defaults.clone();
        let mut credential_candidates: Vec<Option<String>> = Vec::new();

        if let Some(ref file) = self.file {
            if let Some(ref server) = file.server {
                merge_opt(&mut result.bind, &server.bind);
                merge_opt(&mut result.port, &server.port);
                if server.api_key.is_some() {
                    result.api_key = server.api_key.clone();
                }
                merge_opt(&mut result.locale, &server.locale);
            }
            if let Some(ref firebase) = file.firebase {
                credential_candidates.push(firebase.credentials.clone());
                if firebase.project_id.is_some() {
                    result.project_id = firebase.project_id.clone();
                }
                merge_opt(&mut result.collection, &firebase.collection);
                if firebase.firestore_base_url.is_some() {
                    result.firestore_base_url = firebase.firestore_base_url.clone();
                }
                if firebase.fcm_base_url.is_some() {
                    result.fcm_base_url = firebase.fcm_base_url.clone();
                }
                if let Some(secs) = firebase.request_timeout_secs {
                    result.request_timeout = Duration::from_secs(secs);
                }
            }
            if let Some(ref limits) = file.limits {
                merge_opt(&mut result.rate_limit, &limits.rate_limit);
                if let Some(secs) = limits.rate_window_secs {
                    result.rate_window = Duration::from_secs(secs);
                }
                merge_opt(&mut result.max_tokens, &limits.max_tokens);
                merge_opt(&mut result.send_concurrency, &limits.send_concurrency);
            }
            if let Some(ref cors) = file.cors {
                merge_opt(&mut result.cors_origins, &cors.origins);
                if cors.origin_suffix.is_some() {
                    result.cors_origin_suffix = cors.origin_suffix.clone();
                }
            }
        }

        if let Some(ref overrides) = self.overrides {
            merge_opt(&mut result.bind, &overrides.bind);
            merge_opt(&mut result.port, &overrides.port);
            if overrides.api_key.is_some() {
                result.api_key = overrides.api_key.clone();
            }
            if overrides.project_id.is_some() {
                result.project_id = overrides.project_id.clone();
            }
            if !overrides.cors_origins.is_empty() {
                result.cors_origins = overrides.cors_origins.clone();
            }
            merge_opt(&mut result.locale, &overrides.locale);

            // CLI/env candidates outrank the file
            let mut ordered = overrides.credentials.clone();
            ordered.extend(credential_candidates);
            credential_candidates = ordered;
        }

        result.api_key = result
            .api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        result.project_id = result
            .project_id
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        result.credentials_path = locate_credentials(&credential_candidates, base_dir);

        result.validate()?;
        Ok(result)
    }
}

impl Default for ConfigMerger {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_opt<T: Clone>(target: &mut T, value: &Option<T>) {
    if let Some(v) = value {
        *target = v.clone();
    }
}
