//! Google Cloud authentication shared by the Firestore store and the FCM provider

pub mod service_account;
pub mod token;

pub use service_account::ServiceAccountKey;
pub use token::{
    fetch_metadata_project_id, GoogleTokenSource, StaticTokenSource, TokenSource, EMULATOR_TOKEN,
};

use thiserror::Error;

/// Failures obtaining Google credentials or access tokens
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The key material itself is unusable
    #[error("Invalid credentials: {0}")]
    Credentials(String),
    /// The token endpoint could not be reached or answered garbage
    #[error("Token endpoint unavailable: {0}")]
    Unavailable(String),
    /// The token endpoint refused the request
    #[error("Token request rejected: {0}")]
    Rejected(String),
}
