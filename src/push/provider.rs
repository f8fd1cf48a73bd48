// Push provider seam

use async_trait::async_trait;

use super::types::{DeliveryError, NotificationPayload, ProviderError};

/// Delivers one notification to one device token
#[async_trait]
pub trait PushProvider: Send + Sync {
    /// Get ready to send (e.g. obtain credentials). Called once per fan-out.
    async fn prepare(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Send `payload` to `token`. A rejection is final for this request.
    async fn send(&self, token: &str, payload: &NotificationPayload) -> Result<(), DeliveryError>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}
