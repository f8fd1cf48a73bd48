// Optional shared-secret check for the send-push API

use axum::http::HeaderMap;

/// Header clients use to present the shared secret
pub const API_KEY_HEADER: &str = "x-api-key";

/// Static API key guard. An empty key disables the check.
#[derive(Clone, Default)]
pub struct ApiKeyGuard {
    key: Option<String>,
}

impl ApiKeyGuard {
    pub fn new(key: Option<String>) -> Self {
        let key = key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        Self { key }
    }

    /// Whether a key is configured
    pub fn is_enabled(&self) -> bool {
        self.key.is_some()
    }

    /// Returns `true` if the headers carry the configured key, or no key is configured
    pub fn verify(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = self.key.as_deref() else {
            return true;
        };

        headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(|provided| provided == expected)
            .unwrap_or(false)
    }
}

// Keep the configured key out of Debug output
impl std::fmt::Debug for ApiKeyGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyGuard")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_key(key: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_str(key).unwrap());
        headers
    }

    #[test]
    fn test_disabled_guard_accepts_everything() {
        let guard = ApiKeyGuard::new(None);
        assert!(!guard.is_enabled());
        assert!(guard.verify(&HeaderMap::new()));
        assert!(guard.verify(&headers_with_key("anything")));
    }

    #[test]
    fn test_blank_key_disables_guard() {
        let guard = ApiKeyGuard::new(Some("   ".to_string()));
        assert!(!guard.is_enabled());
        assert!(guard.verify(&HeaderMap::new()));
    }

    #[test]
    fn test_configured_key_is_trimmed() {
        let guard = ApiKeyGuard::new(Some("  s3cret\n".to_string()));
        assert!(guard.verify(&headers_with_key("s3cret")));
        assert!(!guard.verify(&headers_with_key(" s3cret")));
    }

    #[test]
    fn test_missing_or_wrong_key_is_rejected() {
        let guard = ApiKeyGuard::new(Some("s3cret".to_string()));
        assert!(!guard.verify(&HeaderMap::new()));
        assert!(!guard.verify(&headers_with_key("S3CRET")));
        assert!(guard.verify(&headers_with_key("s3cret")));
    }

    #[test]
    fn test_header_name_is_case_insensitive() {
        let guard = ApiKeyGuard::new(Some("s3cret".to_string()));
        let mut headers = HeaderMap::new();
        let name = axum::http::HeaderName::from_bytes(b"X-API-Key").unwrap();
        headers.insert(name, HeaderValue::from_static("s3cret"));
        assert!(guard.verify(&headers));
    }

    #[test]
    fn test_debug_hides_key() {
        let guard = ApiKeyGuard::new(Some("s3cret".to_string()));
        let rendered = format!("{:?}", guard);
        assert!(!rendered.contains("s3cret"));
    }
}
