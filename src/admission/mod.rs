//! Request admission for the send-push API
//!
//! Combines the per-client sliding-window rate limiter with the optional
//! static API key. Rate limiting always runs first, so requests without a
//! valid key still consume quota.

pub mod api_key;
pub mod rate_limiter;

pub use api_key::{ApiKeyGuard, API_KEY_HEADER};
pub use rate_limiter::{RateLimiter, DEFAULT_RATE_LIMIT, DEFAULT_RATE_WINDOW};

use axum::http::HeaderMap;
use std::time::Instant;
use thiserror::Error;

/// Client identifier used when the peer address is unavailable
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Reasons a request is turned away before any work is done
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("Too many requests. Try again later.")]
    RateLimited,
    #[error("Invalid or missing API key.")]
    Unauthorized,
}

/// Admission controller shared by all request handlers
#[derive(Clone, Debug)]
pub struct AdmissionController {
    limiter: RateLimiter,
    api_key: ApiKeyGuard,
}

impl AdmissionController {
    pub fn new(limiter: RateLimiter, api_key: ApiKeyGuard) -> Self {
        Self { limiter, api_key }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn requires_api_key(&self) -> bool {
        self.api_key.is_enabled()
    }

    /// Rate-limit check, then API key check
    pub fn admit(
        &self,
        client_id: &str,
        headers: &HeaderMap,
        now: Instant,
    ) -> Result<(), AdmissionError> {
        if !self.limiter.check(client_id, now) {
            log::warn!("Rate limit exceeded for client {}", client_id);
            return Err(AdmissionError::RateLimited);
        }

        if !self.api_key.verify(headers) {
            log::warn!("Rejected request from {}: invalid or missing API key", client_id);
            return Err(AdmissionError::Unauthorized);
        }

        Ok(())
    }
}
