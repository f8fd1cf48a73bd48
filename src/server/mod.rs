//! HTTP server for push notification dispatch
//!
//! Exposes `GET /health` and `POST /api/send-push`. The send-push body is
//! validated first; only a valid request goes through admission (rate
//! limit, then API key).

pub mod error;
pub mod handlers;
pub mod state;

pub use error::{ApiError, ErrorBody};
pub use handlers::{client_id, health_handler, send_push_handler, SendPushRequest, ValidatedPush};
pub use state::ServerAppState;

use axum::{
    http::{request::Parts, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};

use crate::config::ServerConfig;
use crate::shutdown::wait_for_shutdown;

/// Whether a browser origin may call the API.
///
/// Exact matches against the configured list, plus any `https://` origin
/// whose host ends with the configured suffix.
pub fn origin_allowed(origin: &str, allowed: &[String], suffix: Option<&str>) -> bool {
    if allowed.iter().any(|o| o == origin) {
        return true;
    }
    match (suffix, origin.strip_prefix("https://")) {
        (Some(suffix), Some(host)) => host.ends_with(suffix) && host.len() > suffix.len(),
        _ => false,
    }
}

/// Build the CORS layer from configuration
pub fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let allowed = config.cors_origins.clone();
    let suffix = config.cors_origin_suffix.clone();

    // Credentials are allowed, so tower-http refuses wildcard headers;
    // mirroring the requested headers has the same effect.
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| {
                origin
                    .to_str()
                    .map(|o| origin_allowed(o, &allowed, suffix.as_deref()))
                    .unwrap_or(false)
            },
        ))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Assemble the router.
///
/// CORS is the outer layer, so preflight requests never reach a handler.
pub fn build_router(state: ServerAppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/send-push", post(send_push_handler))
        .layer(cors)
        .with_state(state)
}

/// Run the HTTP server until a shutdown is requested
pub async fn run_server(config: &ServerConfig, state: ServerAppState) -> Result<(), String> {
    let addr: SocketAddr = format!("{}:{}", config.bind, config.port)
        .parse()
        .map_err(|e| format!("Invalid address: {}", e))?;

    let app = build_router(state.clone(), cors_layer(config));

    let auth_display = if state.admission.requires_api_key() {
        "X-API-Key required"
    } else {
        "disabled"
    };
    let limiter = state.admission.limiter();
    let rate_display = format!(
        "{} req / {}s per IP",
        limiter.limit(),
        limiter.window().as_secs()
    );
    let suffix_display = config
        .cors_origin_suffix
        .as_deref()
        .map(|s| format!("https://*{}", s))
        .unwrap_or_else(|| "-".to_string());

    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║                       Push Relay                             ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  Server URL:  http://{}:{:<24}║", config.bind, config.port);
    println!("║  API key:     {:<47}║", auth_display);
    println!("║  Rate limit:  {:<47}║", rate_display);
    println!("║  Collection:  {:<47}║", state.resolver.collection());
    println!("║  CORS:        {:<47}║", config.cors_origins.join(", "));
    println!("║               {:<47}║", suffix_display);
    println!("║                                                              ║");
    println!("║  Endpoints:                                                  ║");
    println!("║    GET  /health          - Health check                      ║");
    println!("║    POST /api/send-push   - Send a notification               ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    log::info!("Server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(wait_for_shutdown(state.shutdown_state.clone()))
    .await
    .map_err(|e| format!("Server error: {}", e))?;

    log::info!("Server stopped");
    Ok(())
}
