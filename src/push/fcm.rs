//! Firebase Cloud Messaging sender (HTTP v1 API)

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::provider::PushProvider;
use super::types::{DeliveryError, NotificationPayload, ProviderError};
use crate::google::TokenSource;

/// Production FCM endpoint
pub const FCM_BASE_URL: &str = "https://fcm.googleapis.com/v1";

/// Sends notifications through FCM for one Firebase project
pub struct FcmProvider {
    http: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
    base_url: String,
    project_id: String,
}

impl FcmProvider {
    pub fn new(http: reqwest::Client, tokens: Arc<dyn TokenSource>, project_id: &str) -> Self {
        Self {
            http,
            tokens,
            base_url: FCM_BASE_URL.to_string(),
            project_id: project_id.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn send_url(&self) -> String {
        format!("{}/projects/{}/messages:send", self.base_url, self.project_id)
    }
}

/// Request body for `messages:send`
pub fn build_message(token: &str, payload: &NotificationPayload) -> Value {
    json!({
        "message": {
            "token": token,
            "notification": {
                "title": payload.title,
                "body": payload.body,
            }
        }
    })
}

/// Map an FCM error response to a delivery error
pub fn classify_error(status: u16, body: &str) -> DeliveryError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));

    let fcm_code = error
        .and_then(|e| e.get("details"))
        .and_then(Value::as_array)
        .and_then(|details| {
            details
                .iter()
                .find_map(|d| d.get("errorCode").and_then(Value::as_str))
        });

    if fcm_code == Some("UNREGISTERED") || status == 404 {
        return DeliveryError::Unregistered;
    }

    let reason = fcm_code
        .or_else(|| error.and_then(|e| e.get("status")).and_then(Value::as_str))
        .or_else(|| error.and_then(|e| e.get("message")).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| body.chars().take(200).collect());

    DeliveryError::Rejected { status, reason }
}

#[async_trait]
impl PushProvider for FcmProvider {
    async fn prepare(&self) -> Result<(), ProviderError> {
        self.tokens.access_token().await?;
        Ok(())
    }

    async fn send(&self, token: &str, payload: &NotificationPayload) -> Result<(), DeliveryError> {
        let access_token = self
            .tokens
            .access_token()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let response = self
            .http
            .post(self.send_url())
            .bearer_auth(access_token)
            .json(&build_message(token, payload))
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_error(status.as_u16(), &body))
    }

    fn name(&self) -> &'static str {
        "fcm"
    }
}
