// Graceful shutdown: OS signals flip a shared flag the server waits on

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::watch;

/// Shared "stop serving" flag.
///
/// Set from a signal thread, awaited by the server's graceful-shutdown future.
#[derive(Clone)]
pub struct ShutdownState {
    requested: Arc<watch::Sender<bool>>,
}

impl ShutdownState {
    pub fn new() -> Self {
        let (requested, _) = watch::channel(false);
        Self {
            requested: Arc::new(requested),
        }
    }

    /// Ask the server to stop. Safe to call from any thread, any number of times.
    pub fn request_shutdown(&self) {
        if !self.requested.send_replace(true) {
            log::info!("Shutdown requested");
        }
    }

    pub fn is_shutdown_requested(&self) -> bool {
        *self.requested.borrow()
    }
}

impl Default for ShutdownState {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves once a shutdown has been requested (immediately if it already was)
pub async fn wait_for_shutdown(state: ShutdownState) {
    let mut rx = state.requested.subscribe();
    // The sender lives in `state`, so the channel cannot close while we wait
    let _ = rx.wait_for(|requested| *requested).await;
    log::info!("Shutdown signal received, stopping server...");
}

/// Request shutdown on SIGINT (Ctrl+C), SIGTERM or SIGHUP
#[cfg(unix)]
pub fn register_signal_handlers(state: ShutdownState) -> Result<()> {
    use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])
        .map_err(|e| anyhow::anyhow!("Failed to register signal handlers: {}", e))?;

    std::thread::spawn(move || {
        for signal in signals.forever() {
            let name = match signal {
                SIGINT => "SIGINT",
                SIGTERM => "SIGTERM",
                SIGHUP => "SIGHUP",
                _ => continue,
            };
            log::info!("Received {}", name);
            state.request_shutdown();
        }
    });

    log::info!("Signal handlers registered (SIGINT, SIGTERM, SIGHUP)");
    Ok(())
}

/// Request shutdown on Ctrl+C
#[cfg(windows)]
pub fn register_signal_handlers(state: ShutdownState) -> Result<()> {
    ctrlc::set_handler(move || {
        log::info!("Received Ctrl+C");
        state.request_shutdown();
    })
    .map_err(|e| anyhow::anyhow!("Failed to register Ctrl+C handler: {}", e))?;

    log::info!("Signal handler registered (Ctrl+C)");
    Ok(())
}
