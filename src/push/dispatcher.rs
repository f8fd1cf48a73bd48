//! Fan-out of one notification to many device tokens
//!
//! Every token gets its own send attempt. Failures are counted, never
//! propagated, so one bad token cannot stop the rest of the batch.

use futures_util::stream::{self, StreamExt};
use std::sync::Arc;

use super::messages::Locale;
use super::provider::PushProvider;
use super::types::{token_prefix, DeliveryError, DispatchResult, NotificationPayload, ProviderError};

/// Default number of sends in flight at once
pub const DEFAULT_SEND_CONCURRENCY: usize = 8;

/// Sends notifications through a push provider
#[derive(Clone)]
pub struct Dispatcher {
    provider: Arc<dyn PushProvider>,
    concurrency: usize,
    locale: Locale,
}

impl Dispatcher {
    pub fn new(provider: Arc<dyn PushProvider>, locale: Locale) -> Self {
        Self {
            provider,
            concurrency: DEFAULT_SEND_CONCURRENCY,
            locale,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Send `payload` to every token and aggregate the outcomes.
    ///
    /// Fails only if the provider cannot get ready before the first send.
    pub async fn dispatch(
        &self,
        tokens: &[String],
        payload: &NotificationPayload,
    ) -> Result<DispatchResult, ProviderError> {
        self.provider.prepare().await?;

        // Each send owns its inputs so the stream holds no borrows of the caller
        let sends: Vec<_> = tokens
            .iter()
            .cloned()
            .map(|token| {
                let provider = Arc::clone(&self.provider);
                let payload = payload.clone();
                async move { send_one(provider.as_ref(), &token, &payload).await }
            })
            .collect();
        let outcomes: Vec<Result<(), DeliveryError>> = stream::iter(sends)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let success = outcomes.iter().filter(|o| o.is_ok()).count();
        let failure = outcomes.len() - success;

        log::info!(
            "Push dispatch via {}: {} sent, {} failed, {} total",
            self.provider.name(),
            success,
            failure,
            tokens.len()
        );

        Ok(DispatchResult::from_counts(success, failure, self.locale))
    }
}

async fn send_one(
    provider: &dyn PushProvider,
    token: &str,
    payload: &NotificationPayload,
) -> Result<(), DeliveryError> {
    // Truncate on every send; callers may hand over anything
    let payload = payload.truncated();
    let result = provider.send(token, &payload).await;

    match &result {
        Ok(()) => log::debug!("Sent push to token {}...", token_prefix(token)),
        Err(e) => log::warn!("Push send failed for token {}...: {}", token_prefix(token), e),
    }
    result
}
