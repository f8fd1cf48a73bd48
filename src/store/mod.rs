//! Document store access for registered push tokens
//!
//! The store is a keyed lookup service: collections of JSON-like documents
//! that can be listed or filtered by field equality. Firestore is the
//! production backend; the in-memory store backs tests and local runs.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::google::AuthError;

/// A stored document: field name to value
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Failures reaching or reading the document store
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Document store unavailable: {0}")]
    Unavailable(String),
    #[error("Unexpected document store response: {0}")]
    BadResponse(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Read-only query interface over a document store
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Documents in `collection` whose `field` equals `value`, at most `limit`
    async fn query_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
        limit: usize,
    ) -> Result<Vec<Document>, StoreError>;

    /// Up to `limit` documents of `collection`, in store order
    async fn query_all(&self, collection: &str, limit: usize) -> Result<Vec<Document>, StoreError>;
}
