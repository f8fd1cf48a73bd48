use anyhow::{anyhow, Context};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use push_relay::admission::{AdmissionController, ApiKeyGuard, RateLimiter};
use push_relay::config::{
    credentials::executable_dir, ConfigMerger, ConfigOverrides, FileConfig, ServerConfig,
};
use push_relay::google::{
    fetch_metadata_project_id, GoogleTokenSource, ServiceAccountKey, StaticTokenSource,
    TokenSource, EMULATOR_TOKEN,
};
use push_relay::push::{Dispatcher, FcmProvider, Locale};
use push_relay::resolver::TokenResolver;
use push_relay::server::{self, ServerAppState};
use push_relay::shutdown::{register_signal_handlers, ShutdownState};
use push_relay::store::FirestoreStore;

/// Push Relay - send push notifications to devices registered in Firestore
#[derive(Parser, Debug)]
#[command(name = "push-relay")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to bind the server to
    #[arg(long, env = "PUSH_RELAY_BIND")]
    bind: Option<String>,

    /// Port to bind the server to
    #[arg(long, env = "PUSH_RELAY_PORT")]
    port: Option<u16>,

    /// Shared secret expected in X-API-Key. Unset disables the check.
    #[arg(long, env = "PUSH_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Service-account key file (falls back to FIREBASE_SERVICE_ACCOUNT_PATH)
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    credentials: Option<String>,

    /// Firebase / Google Cloud project id
    #[arg(long, env = "GOOGLE_CLOUD_PROJECT")]
    project_id: Option<String>,

    /// Allowed CORS origin (repeatable). Replaces the default list.
    #[arg(long = "cors-origin")]
    cors_origins: Vec<String>,

    /// Language of response messages (ko, en)
    #[arg(long, env = "PUSH_RELAY_LOCALE")]
    locale: Option<Locale>,

    /// TOML config file
    #[arg(long, env = "PUSH_RELAY_CONFIG")]
    config: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            bind: self.bind.clone(),
            port: self.port,
            api_key: self.api_key.clone(),
            credentials: vec![
                self.credentials.clone(),
                std::env::var("FIREBASE_SERVICE_ACCOUNT_PATH").ok(),
            ],
            project_id: self.project_id.clone(),
            cors_origins: self.cors_origins.clone(),
            locale: self.locale,
        }
    }
}

/// Project id and token source: emulator token, service-account key, or metadata server
async fn google_access(
    config: &ServerConfig,
    http: &reqwest::Client,
) -> anyhow::Result<(String, Arc<dyn TokenSource>)> {
    if config.uses_emulator() {
        let project_id = config
            .project_id
            .clone()
            .ok_or_else(|| anyhow!("Emulator endpoints need an explicit --project-id"))?;
        log::info!(
            "Using project '{}' against emulator endpoints (static token)",
            project_id
        );
        let tokens: Arc<dyn TokenSource> = Arc::new(StaticTokenSource(EMULATOR_TOKEN.to_string()));
        return Ok((project_id, tokens));
    }

    // Service-account key when one was found, otherwise ambient credentials
    let key = match &config.credentials_path {
        Some(path) => Some(ServiceAccountKey::from_file(path)?),
        None => None,
    };
    let project_id = match config
        .project_id
        .clone()
        .or_else(|| key.as_ref().and_then(|k| k.project_id.clone()))
    {
        Some(id) => id,
        None => fetch_metadata_project_id(http).await.map_err(|e| {
            anyhow!(
                "No project id configured and the metadata server did not provide one: {}",
                e
            )
        })?,
    };
    let token_source = match key {
        Some(key) => GoogleTokenSource::from_service_account(http.clone(), key),
        None => GoogleTokenSource::from_metadata_server(http.clone()),
    };
    log::info!(
        "Using project '{}' with credentials from {}",
        project_id,
        token_source.describe()
    );
    Ok((project_id, Arc::new(token_source)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let file = cli
        .config
        .as_deref()
        .map(FileConfig::load)
        .transpose()?;
    let base_dir = executable_dir();
    let config = ConfigMerger::new()
        .with_file(file)
        .with_overrides(Some(cli.overrides()))
        .merge(base_dir.as_deref())?;
    log::debug!("Resolved configuration: {:?}", config);

    let http = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .context("Failed to build HTTP client")?;

    let (project_id, tokens) = google_access(&config, &http).await?;

    let mut store = FirestoreStore::new(http.clone(), tokens.clone(), &project_id);
    if let Some(url) = &config.firestore_base_url {
        store = store.with_base_url(url);
    }
    let mut provider = FcmProvider::new(http, tokens, &project_id);
    if let Some(url) = &config.fcm_base_url {
        provider = provider.with_base_url(url);
    }

    let limiter = RateLimiter::new(config.rate_limit, config.rate_window);
    let _cleanup = RateLimiter::start_cleanup_task(limiter.clone());
    let admission = AdmissionController::new(limiter, ApiKeyGuard::new(config.api_key.clone()));
    if !admission.requires_api_key() {
        log::warn!("PUSH_API_KEY is not set; /api/send-push accepts unauthenticated requests");
    }

    let resolver = TokenResolver::new(Arc::new(store), config.collection.clone())
        .with_max_tokens(config.max_tokens);
    let dispatcher = Dispatcher::new(Arc::new(provider), config.locale)
        .with_concurrency(config.send_concurrency);

    let shutdown_state = ShutdownState::new();
    if let Err(e) = register_signal_handlers(shutdown_state.clone()) {
        log::warn!("Failed to register signal handlers: {}", e);
    }

    let state = ServerAppState::new(admission, resolver, dispatcher, shutdown_state);

    server::run_server(&config, state)
        .await
        .map_err(|e| anyhow!(e))
}
