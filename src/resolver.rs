//! Collects the push tokens a notification should be sent to

use serde_json::Value;
use std::sync::Arc;

use crate::store::{Document, DocumentStore, StoreError};

/// Collection holding FCM registration documents
pub const DEFAULT_TOKENS_COLLECTION: &str = "fcmTokens";

/// Upper bound on tokens fanned out per request
pub const MAX_TOKENS_PER_REQUEST: usize = 100;

/// Document field carrying the push token
pub const TOKEN_FIELD: &str = "token";

/// Document field carrying the device label
pub const DEVICE_NAME_FIELD: &str = "deviceName";

/// Resolves device filters to push tokens through a document store
#[derive(Clone)]
pub struct TokenResolver {
    store: Arc<dyn DocumentStore>,
    collection: String,
    max_tokens: usize,
}

impl TokenResolver {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
            max_tokens: MAX_TOKENS_PER_REQUEST,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Tokens for the given device filter, at most `max_tokens`.
    ///
    /// A blank filter means every registered device. Documents without a
    /// usable token are skipped. An empty result is not an error.
    pub async fn resolve(&self, device_filter: Option<&str>) -> Result<Vec<String>, StoreError> {
        let filter = device_filter.map(str::trim).filter(|f| !f.is_empty());

        let documents = match filter {
            Some(device_name) => {
                log::debug!(
                    "Querying {} for deviceName == {:?}",
                    self.collection,
                    device_name
                );
                self.store
                    .query_by_field(&self.collection, DEVICE_NAME_FIELD, device_name, self.max_tokens)
                    .await?
            }
            None => {
                log::debug!("Querying all of {}", self.collection);
                self.store.query_all(&self.collection, self.max_tokens).await?
            }
        };

        let tokens: Vec<String> = documents
            .iter()
            .filter_map(extract_token)
            .take(self.max_tokens)
            .collect();

        log::debug!(
            "Resolved {} tokens from {} documents",
            tokens.len(),
            documents.len()
        );
        Ok(tokens)
    }
}

fn extract_token(document: &Document) -> Option<String> {
    match document.get(TOKEN_FIELD) {
        Some(Value::String(token)) => {
            let token = token.trim();
            (!token.is_empty()).then(|| token.to_string())
        }
        _ => None,
    }
}
