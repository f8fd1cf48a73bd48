//! HTTP handlers

use axum::{
    async_trait,
    extract::{connect_info::ConnectInfo, FromRequest, Request, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Instant;

use super::error::ApiError;
use super::ServerAppState;
use crate::admission::UNKNOWN_CLIENT;
use crate::push::{DispatchResult, NotificationPayload, MAX_BODY_CHARS, MAX_TITLE_CHARS};

/// Longest accepted device-name filter, in characters
pub const MAX_DEVICE_NAME_CHARS: usize = 100;

/// Request body for `POST /api/send-push`
#[derive(Debug, Clone, Deserialize)]
pub struct SendPushRequest {
    pub title: String,
    pub body: String,
    /// Only send to devices registered under this name
    #[serde(default, rename = "deviceName", alias = "device_name")]
    pub device_name: Option<String>,
}

impl SendPushRequest {
    pub fn validate(&self) -> Result<(), String> {
        check_length("title", &self.title, 1, MAX_TITLE_CHARS)?;
        check_length("body", &self.body, 1, MAX_BODY_CHARS)?;
        if let Some(device_name) = &self.device_name {
            check_length("deviceName", device_name, 0, MAX_DEVICE_NAME_CHARS)?;
        }
        Ok(())
    }
}

fn check_length(field: &str, value: &str, min: usize, max: usize) -> Result<(), String> {
    let len = value.chars().count();
    if len < min {
        return Err(format!("{} must be at least {} characters", field, min));
    }
    if len > max {
        return Err(format!("{} must be at most {} characters", field, max));
    }
    Ok(())
}

/// A send-push body that parsed and passed validation.
///
/// Extraction fails with 4xx before any admission work is done, so a bad
/// body never spends rate-limit quota.
#[derive(Debug)]
pub struct ValidatedPush(pub SendPushRequest);

#[async_trait]
impl<S> FromRequest<S> for ValidatedPush
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<SendPushRequest>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::Rejected {
                status: rejection.status(),
                detail: rejection.body_text(),
            })?;
        body.validate().map_err(ApiError::Validation)?;
        Ok(Self(body))
    }
}

/// Client identifier for rate limiting: the peer IP, or `"unknown"`
pub fn client_id(connect_info: Option<&ConnectInfo<SocketAddr>>) -> String {
    connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Health check endpoint
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Fan a notification out to the matching registered devices.
///
/// Order: body validation, rate limit, API key, token lookup, dispatch.
pub async fn send_push_handler(
    State(state): State<ServerAppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    ValidatedPush(req): ValidatedPush,
) -> Result<Json<DispatchResult>, ApiError> {
    let client = client_id(connect_info.as_ref());
    state.admission.admit(&client, &headers, Instant::now())?;

    let request_id = uuid::Uuid::new_v4();
    log::info!(
        "[{}] send-push requested by {} (deviceName: {:?})",
        request_id,
        client,
        req.device_name.as_deref().unwrap_or("<all>")
    );

    let tokens = state.resolver.resolve(req.device_name.as_deref()).await?;

    if tokens.is_empty() {
        log::info!("[{}] No push tokens matched, nothing sent", request_id);
        return Ok(Json(DispatchResult::no_tokens(state.dispatcher.locale())));
    }

    let payload = NotificationPayload::new(req.title, req.body);
    let result = state.dispatcher.dispatch(&tokens, &payload).await?;

    log::info!(
        "[{}] send-push finished: {} ok, {} failed of {}",
        request_id,
        result.success_count,
        result.failure_count,
        result.total
    );
    Ok(Json(result))
}
