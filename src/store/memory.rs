// In-memory document store

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use super::{Document, DocumentStore, StoreError};

/// Document store kept in process memory, in insertion order per collection
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    unavailable: AtomicBool,
    queries: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document to a collection
    pub fn insert(&self, collection: &str, document: Document) {
        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        collections
            .entry(collection.to_string())
            .or_default()
            .push(document);
    }

    /// Builder-style insert from a JSON object literal; non-objects are ignored
    pub fn with_document(self, collection: &str, document: Value) -> Self {
        if let Value::Object(map) = document {
            self.insert(collection, map);
        }
        self
    }

    /// Make every query fail as if the store were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of queries served so far
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn select<F>(&self, collection: &str, limit: usize, keep: F) -> Result<Vec<Document>, StoreError>
    where
        F: Fn(&Document) -> bool,
    {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }

        let collections = self
            .collections
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| keep(d)).take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn query_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
        limit: usize,
    ) -> Result<Vec<Document>, StoreError> {
        self.select(collection, limit, |doc| {
            matches!(doc.get(field), Some(Value::String(s)) if s == value)
        })
    }

    async fn query_all(&self, collection: &str, limit: usize) -> Result<Vec<Document>, StoreError> {
        self.select(collection, limit, |_| true)
    }
}
