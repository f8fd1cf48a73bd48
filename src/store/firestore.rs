//! Cloud Firestore backend using the REST `runQuery` endpoint
//!
//! Firestore returns typed values (`{"stringValue": "..."}`); they are
//! flattened into plain JSON so callers can treat documents as ordinary maps.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::{Document, DocumentStore, StoreError};
use crate::google::TokenSource;

/// Production Firestore REST endpoint
pub const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Firestore store for one project's default database
pub struct FirestoreStore {
    http: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
    base_url: String,
    project_id: String,
    database: String,
}

impl FirestoreStore {
    pub fn new(http: reqwest::Client, tokens: Arc<dyn TokenSource>, project_id: &str) -> Self {
        Self {
            http,
            tokens,
            base_url: FIRESTORE_BASE_URL.to_string(),
            project_id: project_id.to_string(),
            database: "(default)".to_string(),
        }
    }

    /// Point at another endpoint, e.g. the Firestore emulator
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn run_query_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/{}/documents:runQuery",
            self.base_url, self.project_id, self.database
        )
    }

    async fn run_query(&self, structured_query: Value) -> Result<Vec<Document>, StoreError> {
        let token = self.tokens.access_token().await?;
        let response = self
            .http
            .post(self.run_query_url())
            .bearer_auth(token)
            .json(&json!({ "structuredQuery": structured_query }))
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(if status.is_server_error() {
                StoreError::Unavailable(format!("{}: {}", status, body))
            } else {
                StoreError::BadResponse(format!("{}: {}", status, body))
            });
        }

        let rows: Vec<Value> = response
            .json()
            .await
            .map_err(|e| StoreError::BadResponse(format!("Invalid runQuery body: {}", e)))?;

        Ok(parse_run_query_rows(&rows))
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn query_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
        limit: usize,
    ) -> Result<Vec<Document>, StoreError> {
        self.run_query(build_structured_query(collection, Some((field, value)), limit))
            .await
    }

    async fn query_all(&self, collection: &str, limit: usize) -> Result<Vec<Document>, StoreError> {
        self.run_query(build_structured_query(collection, None, limit))
            .await
    }
}

/// Build a `StructuredQuery` body with an optional string equality filter
pub fn build_structured_query(collection: &str, filter: Option<(&str, &str)>, limit: usize) -> Value {
    let mut query = json!({
        "from": [{ "collectionId": collection }],
        "limit": limit,
    });

    if let Some((field, value)) = filter {
        query["where"] = json!({
            "fieldFilter": {
                "field": { "fieldPath": field },
                "op": "EQUAL",
                "value": { "stringValue": value },
            }
        });
    }

    query
}

/// Extract documents from a `runQuery` response stream.
///
/// Rows without a `document` (progress markers carrying only `readTime`) are skipped.
pub fn parse_run_query_rows(rows: &[Value]) -> Vec<Document> {
    rows.iter()
        .filter_map(|row| row.get("document"))
        .map(|doc| {
            doc.get("fields")
                .and_then(Value::as_object)
                .map(decode_fields)
                .unwrap_or_default()
        })
        .collect()
}

fn decode_fields(fields: &Map<String, Value>) -> Document {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), decode_value(value)))
        .collect()
}

/// Flatten one Firestore typed value into plain JSON
pub fn decode_value(value: &Value) -> Value {
    let Some(obj) = value.as_object() else {
        return Value::Null;
    };
    let Some((kind, inner)) = obj.iter().next() else {
        return Value::Null;
    };

    match kind.as_str() {
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "booleanValue" => inner.clone(),
        // Firestore sends 64-bit integers as strings
        "integerValue" => inner
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .map(Value::from)
            .unwrap_or_else(|| inner.clone()),
        "doubleValue" => inner.clone(),
        "mapValue" => inner
            .get("fields")
            .and_then(Value::as_object)
            .map(|f| Value::Object(decode_fields(f)))
            .unwrap_or_else(|| Value::Object(Map::new())),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|vals| vals.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        "geoPointValue" => inner.clone(),
        _ => Value::Null,
    }
}
