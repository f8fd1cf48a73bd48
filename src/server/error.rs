//! Error responses for the HTTP API
//!
//! Every error is rendered as `{"detail": "..."}` with a matching status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::admission::AdmissionError;
use crate::push::ProviderError;
use crate::store::StoreError;

/// Body of every error response
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug)]
pub enum ApiError {
    Admission(AdmissionError),
    /// Request body failed validation
    Validation(String),
    /// Body could not be read as JSON at all
    Rejected { status: StatusCode, detail: String },
    Store(StoreError),
    Provider(ProviderError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Admission(AdmissionError::RateLimited) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Admission(AdmissionError::Unauthorized) => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Rejected { status, .. } => *status,
            ApiError::Store(_) | ApiError::Provider(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Message shown to the caller. Store/provider internals stay in the logs.
    pub fn detail(&self) -> String {
        match self {
            ApiError::Admission(e) => e.to_string(),
            ApiError::Validation(msg) => msg.clone(),
            ApiError::Rejected { detail, .. } => detail.clone(),
            ApiError::Store(_) => "Token store unavailable. Try again later.".to_string(),
            ApiError::Provider(_) => "Push provider unavailable. Try again later.".to_string(),
        }
    }
}

impl From<AdmissionError> for ApiError {
    fn from(e: AdmissionError) -> Self {
        ApiError::Admission(e)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Store(e)
    }
}

impl From<ProviderError> for ApiError {
    fn from(e: ProviderError) -> Self {
        ApiError::Provider(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Store(e) => log::error!("Token lookup failed: {}", e),
            ApiError::Provider(e) => log::error!("Push provider not ready: {}", e),
            _ => {}
        }
        let body = ErrorBody {
            detail: self.detail(),
        };
        (self.status(), Json(body)).into_response()
    }
}
