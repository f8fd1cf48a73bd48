//! OAuth access tokens for Firestore and FCM
//!
//! Tokens come either from a service-account JWT exchange or, when no key
//! file is configured, from the GCE metadata server. They are cached and
//! refreshed shortly before they expire.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::service_account::ServiceAccountKey;
use super::AuthError;

/// Scopes needed to read Firestore and send through FCM
pub const GOOGLE_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/cloud-platform",
    "https://www.googleapis.com/auth/firebase.messaging",
];

const METADATA_BASE: &str = "http://metadata.google.internal/computeMetadata/v1";

/// Refresh this long before the reported expiry
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Something that can hand out bearer tokens
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, AuthError>;
}

/// Bearer token the Firebase emulators accept as an admin credential
pub const EMULATOR_TOKEN: &str = "owner";

/// Fixed token, for emulators and tests
#[derive(Debug, Clone)]
pub struct StaticTokenSource(pub String);

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn access_token(&self) -> Result<String, AuthError> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now + REFRESH_MARGIN < self.expires_at
    }
}

enum TokenOrigin {
    ServiceAccount(ServiceAccountKey),
    Metadata,
}

/// Google OAuth token source with caching
pub struct GoogleTokenSource {
    http: reqwest::Client,
    origin: TokenOrigin,
    cache: Mutex<Option<CachedToken>>,
}

impl GoogleTokenSource {
    pub fn from_service_account(http: reqwest::Client, key: ServiceAccountKey) -> Self {
        Self {
            http,
            origin: TokenOrigin::ServiceAccount(key),
            cache: Mutex::new(None),
        }
    }

    pub fn from_metadata_server(http: reqwest::Client) -> Self {
        Self {
            http,
            origin: TokenOrigin::Metadata,
            cache: Mutex::new(None),
        }
    }

    /// Human-readable description of where tokens come from
    pub fn describe(&self) -> String {
        match &self.origin {
            TokenOrigin::ServiceAccount(key) => format!("service account {}", key.client_email),
            TokenOrigin::Metadata => "GCE metadata server".to_string(),
        }
    }

    async fn fetch(&self) -> Result<TokenResponse, AuthError> {
        match &self.origin {
            TokenOrigin::ServiceAccount(key) => {
                let assertion = key.sign_assertion(GOOGLE_SCOPES, chrono::Utc::now().timestamp())?;
                let response = self
                    .http
                    .post(&key.token_uri)
                    .form(&[
                        ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                        ("assertion", assertion.as_str()),
                    ])
                    .send()
                    .await
                    .map_err(|e| AuthError::Unavailable(format!("Token request failed: {}", e)))?;
                parse_token_response(response).await
            }
            TokenOrigin::Metadata => {
                let url = format!(
                    "{}/instance/service-accounts/default/token?scopes={}",
                    METADATA_BASE,
                    GOOGLE_SCOPES.join(",")
                );
                let response = self
                    .http
                    .get(url)
                    .header("Metadata-Flavor", "Google")
                    .send()
                    .await
                    .map_err(|e| {
                        AuthError::Unavailable(format!("Metadata server unreachable: {}", e))
                    })?;
                parse_token_response(response).await
            }
        }
    }
}

async fn parse_token_response(response: reqwest::Response) -> Result<TokenResponse, AuthError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AuthError::Rejected(format!("{}: {}", status, body)));
    }
    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| AuthError::Unavailable(format!("Malformed token response: {}", e)))
}

#[async_trait]
impl TokenSource for GoogleTokenSource {
    async fn access_token(&self) -> Result<String, AuthError> {
        let mut cache = self.cache.lock().await;
        let now = Instant::now();

        if let Some(cached) = cache.as_ref() {
            if cached.is_fresh(now) {
                return Ok(cached.token.clone());
            }
        }

        log::debug!("Fetching Google access token from {}", self.describe());
        let fetched = self.fetch().await?;
        let token = fetched.access_token.clone();
        *cache = Some(CachedToken {
            token: fetched.access_token,
            expires_at: now + Duration::from_secs(fetched.expires_in),
        });
        Ok(token)
    }
}

/// Ask the metadata server which project this instance runs in
pub async fn fetch_metadata_project_id(http: &reqwest::Client) -> Result<String, AuthError> {
    let response = http
        .get(format!("{}/project/project-id", METADATA_BASE))
        .header("Metadata-Flavor", "Google")
        .send()
        .await
        .map_err(|e| AuthError::Unavailable(format!("Metadata server unreachable: {}", e)))?;

    if !response.status().is_success() {
        return Err(AuthError::Rejected(format!(
            "Metadata server returned {}",
            response.status()
        )));
    }

    let project = response
        .text()
        .await
        .map_err(|e| AuthError::Unavailable(e.to_string()))?;
    Ok(project.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token_source() {
        let source = StaticTokenSource("ya29.test".to_string());
        assert_eq!(source.access_token().await.unwrap(), "ya29.test");
    }

    #[test]
    fn test_cached_token_refreshes_before_expiry() {
        let now = Instant::now();
        let token = CachedToken {
            token: "t".to_string(),
            expires_at: now + Duration::from_secs(120),
        };
        assert!(token.is_fresh(now));
        assert!(!token.is_fresh(now + Duration::from_secs(60)));
        assert!(!token.is_fresh(now + Duration::from_secs(200)));
    }

    #[test]
    fn test_token_response_defaults_expiry() {
        let parsed: TokenResponse = serde_json::from_str(r#"{"access_token": "abc"}"#).unwrap();
        assert_eq!(parsed.access_token, "abc");
        assert_eq!(parsed.expires_in, 3600);
    }

    #[test]
    fn test_describe_origin() {
        let source = GoogleTokenSource::from_metadata_server(reqwest::Client::new());
        assert_eq!(source.describe(), "GCE metadata server");
    }
}
