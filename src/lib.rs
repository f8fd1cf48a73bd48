// Clippy allows for reasonable defaults
#![allow(clippy::new_without_default)] // Default not always appropriate for stateful types
#![allow(clippy::derivable_impls)] // Explicit Default impls can be clearer
#![allow(clippy::field_reassign_with_default)] // Builder pattern is clearer

// Module declarations
pub mod admission;
pub mod config;
pub mod google;
pub mod push;
pub mod resolver;
pub mod shutdown;
pub mod store;

// Server module (HTTP API)
pub mod server;

pub use admission::{AdmissionController, AdmissionError, ApiKeyGuard, RateLimiter};
pub use config::{ConfigMerger, ServerConfig};
pub use push::{DispatchResult, Dispatcher, Locale, NotificationPayload, PushProvider};
pub use resolver::TokenResolver;
pub use store::{DocumentStore, MemoryStore};
