// End-to-end tests of the HTTP API against an in-memory store and a recording provider

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::connect_info::ConnectInfo,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

use push_relay::admission::{AdmissionController, ApiKeyGuard, RateLimiter};
use push_relay::config::ServerConfig;
use push_relay::push::{
    DeliveryError, Dispatcher, Locale, NotificationPayload, ProviderError, PushProvider,
};
use push_relay::resolver::TokenResolver;
use push_relay::server::{build_router, cors_layer, ServerAppState};
use push_relay::shutdown::ShutdownState;
use push_relay::store::MemoryStore;

const COLLECTION: &str = "fcmTokens";

/// Provider that records every send and fails the tokens it was told to
#[derive(Default)]
struct RecordingProvider {
    sent: Mutex<Vec<(String, NotificationPayload)>>,
    failing: HashSet<String>,
    unavailable: bool,
}

impl RecordingProvider {
    fn failing(tokens: &[&str]) -> Self {
        Self {
            failing: tokens.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    fn sent(&self) -> Vec<(String, NotificationPayload)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushProvider for RecordingProvider {
    async fn prepare(&self) -> Result<(), ProviderError> {
        if self.unavailable {
            return Err(ProviderError::Unavailable("no credentials".to_string()));
        }
        Ok(())
    }

    async fn send(&self, token: &str, payload: &NotificationPayload) -> Result<(), DeliveryError> {
        self.sent
            .lock()
            .unwrap()
            .push((token.to_string(), payload.clone()));
        if self.failing.contains(token) {
            return Err(DeliveryError::Unregistered);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

fn phone_store() -> MemoryStore {
    MemoryStore::new()
        .with_document(COLLECTION, json!({"token": "A", "deviceName": "phone"}))
        .with_document(COLLECTION, json!({"token": "B", "deviceName": "tablet"}))
        .with_document(COLLECTION, json!({"token": "C", "deviceName": "phone"}))
}

fn app(store: Arc<MemoryStore>, provider: Arc<RecordingProvider>, api_key: Option<&str>) -> Router {
    let limiter = RateLimiter::new(30, Duration::from_secs(60));
    let admission =
        AdmissionController::new(limiter, ApiKeyGuard::new(api_key.map(str::to_string)));
    let resolver = TokenResolver::new(store, COLLECTION);
    let dispatcher = Dispatcher::new(provider, Locale::Ko);
    let state = ServerAppState::new(admission, resolver, dispatcher, ShutdownState::new());
    build_router(state, cors_layer(&ServerConfig::default()))
}

fn send_push(body: Value, api_key: Option<&str>, ip: [u8; 4]) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/send-push")
        .header("content-type", "application/json");
    if let Some(key) = api_key {
        builder = builder.header("X-API-Key", key);
    }
    let mut req = builder.body(Body::from(body.to_string())).unwrap();
    req.extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((ip, 40000))));
    req
}

async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

const CLIENT: [u8; 4] = [203, 0, 113, 7];

#[tokio::test]
async fn test_health() {
    let app = app(
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingProvider::default()),
        Some("secret"),
    );
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_partial_failure_is_counted() {
    let provider = Arc::new(RecordingProvider::failing(&["B"]));
    let app = app(Arc::new(phone_store()), provider.clone(), None);

    let (status, body) = call(
        &app,
        send_push(json!({"title": "Hi", "body": "There"}), None, CLIENT),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success_count"], 2);
    assert_eq!(body["failure_count"], 1);
    assert_eq!(body["total"], 3);
    assert_eq!(body["message"], "발송 완료: 성공 2, 실패 1 (총 3개 기기)");
    assert_eq!(provider.sent().len(), 3);
}

#[tokio::test]
async fn test_device_filter_selects_matching_tokens() {
    let provider = Arc::new(RecordingProvider::default());
    let app = app(Arc::new(phone_store()), provider.clone(), None);

    let (status, body) = call(
        &app,
        send_push(
            json!({"title": "Hi", "body": "There", "deviceName": "  phone "}),
            None,
            CLIENT,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    let mut tokens: Vec<String> = provider.sent().into_iter().map(|(t, _)| t).collect();
    tokens.sort();
    assert_eq!(tokens, vec!["A", "C"]);
}

#[tokio::test]
async fn test_no_tokens_returns_guidance_without_sending() {
    let provider = Arc::new(RecordingProvider::default());
    let app = app(Arc::new(phone_store()), provider.clone(), None);

    let (status, body) = call(
        &app,
        send_push(
            json!({"title": "Hi", "body": "There", "deviceName": "watch"}),
            None,
            CLIENT,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success_count"], 0);
    assert_eq!(body["failure_count"], 0);
    assert_eq!(body["total"], 0);
    assert_eq!(body["message"], Locale::Ko.no_tokens());
    assert!(provider.sent().is_empty());
}

#[tokio::test]
async fn test_empty_store() {
    let app = app(
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingProvider::default()),
        None,
    );

    let (status, body) = call(
        &app,
        send_push(json!({"title": "Hi", "body": "There"}), None, CLIENT),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_missing_or_wrong_api_key_rejected() {
    let provider = Arc::new(RecordingProvider::default());
    let store = Arc::new(phone_store());
    let app = app(store.clone(), provider.clone(), Some("secret"));

    let (status, body) = call(
        &app,
        send_push(json!({"title": "Hi", "body": "There"}), None, CLIENT),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"detail": "Invalid or missing API key."}));

    let (status, _) = call(
        &app,
        send_push(json!({"title": "Hi", "body": "There"}), Some("wrong"), CLIENT),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Nothing past admission ran
    assert_eq!(store.query_count(), 0);
    assert!(provider.sent().is_empty());
}

#[tokio::test]
async fn test_correct_api_key_accepted() {
    let app = app(
        Arc::new(phone_store()),
        Arc::new(RecordingProvider::default()),
        Some("secret"),
    );

    let (status, body) = call(
        &app,
        send_push(json!({"title": "Hi", "body": "There"}), Some("secret"), CLIENT),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
}

#[tokio::test]
async fn test_rate_limit_checked_before_api_key() {
    let app = app(
        Arc::new(phone_store()),
        Arc::new(RecordingProvider::default()),
        Some("secret"),
    );

    for _ in 0..30 {
        let (status, _) = call(
            &app,
            send_push(json!({"title": "Hi", "body": "There"}), None, CLIENT),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    // Over the limit: 429 even with the right key
    let (status, body) = call(
        &app,
        send_push(json!({"title": "Hi", "body": "There"}), Some("secret"), CLIENT),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body, json!({"detail": "Too many requests. Try again later."}));

    // Another client still has its own quota
    let (status, _) = call(
        &app,
        send_push(
            json!({"title": "Hi", "body": "There"}),
            Some("secret"),
            [198, 51, 100, 1],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_health_not_rate_limited() {
    let app = app(
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingProvider::default()),
        None,
    );

    for _ in 0..40 {
        let mut req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((CLIENT, 40000))));
        let (status, _) = call(&app, req).await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_store_unavailable_returns_503() {
    let store = Arc::new(phone_store());
    store.set_unavailable(true);
    let provider = Arc::new(RecordingProvider::default());
    let app = app(store, provider.clone(), None);

    let (status, body) = call(
        &app,
        send_push(json!({"title": "Hi", "body": "There"}), None, CLIENT),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["detail"].is_string());
    assert!(provider.sent().is_empty());
}

#[tokio::test]
async fn test_provider_unavailable_returns_503() {
    let provider = Arc::new(RecordingProvider {
        unavailable: true,
        ..Default::default()
    });
    let app = app(Arc::new(phone_store()), provider.clone(), None);

    let (status, _) = call(
        &app,
        send_push(json!({"title": "Hi", "body": "There"}), None, CLIENT),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(provider.sent().is_empty());
}

#[tokio::test]
async fn test_validation_errors() {
    let provider = Arc::new(RecordingProvider::default());
    let app = app(Arc::new(phone_store()), provider.clone(), None);

    let cases = [
        json!({"title": "", "body": "There"}),
        json!({"title": "Hi", "body": ""}),
        json!({"title": "t".repeat(201), "body": "There"}),
        json!({"title": "Hi", "body": "b".repeat(1001)}),
        json!({"title": "Hi", "body": "There", "deviceName": "d".repeat(101)}),
        json!({"body": "There"}),
    ];
    for case in cases {
        let (status, _) = call(&app, send_push(case.clone(), None, CLIENT)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "case: {}", case);
    }
    assert!(provider.sent().is_empty());
}

#[tokio::test]
async fn test_invalid_bodies_do_not_spend_quota() {
    let app = app(
        Arc::new(phone_store()),
        Arc::new(RecordingProvider::default()),
        None,
    );

    for _ in 0..30 {
        let (status, _) = call(
            &app,
            send_push(json!({"title": "", "body": "x"}), None, CLIENT),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    let (status, body) = call(
        &app,
        send_push(json!({"title": "Hi", "body": "There"}), None, CLIENT),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
}

#[tokio::test]
async fn test_invalid_body_reported_before_missing_api_key() {
    let store = Arc::new(phone_store());
    let app = app(store.clone(), Arc::new(RecordingProvider::default()), Some("secret"));

    let (status, body) = call(
        &app,
        send_push(json!({"title": "", "body": "x"}), None, CLIENT),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("title"));
    assert_eq!(store.query_count(), 0);
}

#[tokio::test]
async fn test_malformed_json_rejected() {
    let app = app(
        Arc::new(phone_store()),
        Arc::new(RecordingProvider::default()),
        None,
    );
    let mut req = Request::builder()
        .method("POST")
        .uri("/api/send-push")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    req.extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((CLIENT, 40000))));

    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_preflight_from_allowed_origin() {
    let app = app(
        Arc::new(phone_store()),
        Arc::new(RecordingProvider::default()),
        Some("secret"),
    );
    let req = Request::builder()
        .method("OPTIONS")
        .uri("/api/send-push")
        .header("origin", "https://my-app.vercel.app")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "x-api-key,content-type")
        .body(Body::empty())
        .unwrap();

    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "https://my-app.vercel.app"
    );
    assert_eq!(response.headers()["access-control-allow-credentials"], "true");
}

#[tokio::test]
async fn test_disallowed_origin_gets_no_cors_headers() {
    let app = app(
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingProvider::default()),
        None,
    );
    let req = Request::builder()
        .uri("/health")
        .header("origin", "https://evil.example.com")
        .body(Body::empty())
        .unwrap();

    let response = app.clone().oneshot(req).await.unwrap();
    assert!(response
        .headers()
        .get("access-control-allow-origin")
        .is_none());
}
