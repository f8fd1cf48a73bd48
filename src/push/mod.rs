//! Push notification delivery
//!
//! Wraps the push provider behind a trait and fans one notification out to
//! many device tokens, aggregating per-token outcomes.

pub mod dispatcher;
pub mod fcm;
pub mod messages;
pub mod provider;
pub mod types;

pub use dispatcher::{Dispatcher, DEFAULT_SEND_CONCURRENCY};
pub use fcm::FcmProvider;
pub use messages::Locale;
pub use provider::PushProvider;
pub use types::{
    token_prefix, truncate_chars, DeliveryError, DispatchResult, NotificationPayload,
    ProviderError, MAX_BODY_CHARS, MAX_TITLE_CHARS,
};
