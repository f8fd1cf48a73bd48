//! Server application state shared across handlers

use crate::admission::AdmissionController;
use crate::push::Dispatcher;
use crate::resolver::TokenResolver;
use crate::shutdown::ShutdownState;

/// Everything a request needs, built once at startup and injected into the router
#[derive(Clone)]
pub struct ServerAppState {
    /// Rate limiting and API key check
    pub admission: AdmissionController,

    /// Token lookup
    pub resolver: TokenResolver,

    /// Notification fan-out
    pub dispatcher: Dispatcher,

    /// Shutdown state
    pub shutdown_state: ShutdownState,
}

impl ServerAppState {
    pub fn new(
        admission: AdmissionController,
        resolver: TokenResolver,
        dispatcher: Dispatcher,
        shutdown_state: ShutdownState,
    ) -> Self {
        Self {
            admission,
            resolver,
            dispatcher,
            shutdown_state,
        }
    }
}
