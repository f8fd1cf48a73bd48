//! Types for push notifications

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::messages::Locale;
use crate::google::AuthError;

/// Provider limit on notification titles, in characters
pub const MAX_TITLE_CHARS: usize = 200;

/// Provider limit on notification bodies, in characters
pub const MAX_BODY_CHARS: usize = 1000;

/// Characters of a token that may appear in diagnostics
pub const TOKEN_LOG_PREFIX_CHARS: usize = 16;

/// Title and body of one notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
}

impl NotificationPayload {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    /// Copy cut down to the provider's title/body limits
    pub fn truncated(&self) -> Self {
        Self {
            title: truncate_chars(&self.title, MAX_TITLE_CHARS).to_string(),
            body: truncate_chars(&self.body, MAX_BODY_CHARS).to_string(),
        }
    }
}

/// First `max` characters of `s`, never splitting a character
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Token prefix safe to log
pub fn token_prefix(token: &str) -> &str {
    truncate_chars(token, TOKEN_LOG_PREFIX_CHARS)
}

/// Why a single token could not be delivered to
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The provider no longer recognises the token
    #[error("token not registered")]
    Unregistered,
    /// The provider refused the message
    #[error("rejected by provider ({status}): {reason}")]
    Rejected { status: u16, reason: String },
    /// The send never got an answer
    #[error("transport error: {0}")]
    Transport(String),
}

/// The provider cannot send anything at all
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Push provider unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Aggregate result of one fan-out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub success_count: usize,
    pub failure_count: usize,
    pub total: usize,
    pub message: String,
}

impl DispatchResult {
    pub fn from_counts(success_count: usize, failure_count: usize, locale: Locale) -> Self {
        let total = success_count + failure_count;
        Self {
            success_count,
            failure_count,
            total,
            message: locale.summary(success_count, failure_count, total),
        }
    }

    /// Zero-count result for a request that matched no tokens
    pub fn no_tokens(locale: Locale) -> Self {
        Self {
            success_count: 0,
            failure_count: 0,
            total: 0,
            message: locale.no_tokens().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_leaves_short_strings_alone() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 5), "hello");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_truncate_counts_characters_not_bytes() {
        let korean = "안녕하세요";
        assert_eq!(truncate_chars(korean, 2), "안녕");
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }

    #[test]
    fn test_payload_truncated_to_provider_limits() {
        let payload = NotificationPayload::new("t".repeat(500), "b".repeat(5000));
        let truncated = payload.truncated();
        assert_eq!(truncated.title.chars().count(), MAX_TITLE_CHARS);
        assert_eq!(truncated.body.chars().count(), MAX_BODY_CHARS);
        assert_eq!(truncated.body, "b".repeat(1000));
        // The original is untouched
        assert_eq!(payload.body.len(), 5000);
    }

    #[test]
    fn test_token_prefix_is_sixteen_chars() {
        let token = "abcdefghijklmnopqrstuvwxyz";
        assert_eq!(token_prefix(token), "abcdefghijklmnop");
        assert_eq!(token_prefix("short"), "short");
    }

    #[test]
    fn test_result_totals() {
        let result = DispatchResult::from_counts(2, 1, Locale::En);
        assert_eq!(result.total, 3);
        assert_eq!(result.success_count + result.failure_count, result.total);
    }

    #[test]
    fn test_no_tokens_result() {
        let result = DispatchResult::no_tokens(Locale::Ko);
        assert_eq!((result.success_count, result.failure_count, result.total), (0, 0, 0));
        assert_eq!(result.message, Locale::Ko.no_tokens());
    }
}
