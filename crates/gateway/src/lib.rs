//! HTTP API gateway for Aura.
//!
//! Exposes the REST surface for conversations, messages, uploads, feedback,
//! and analytics. Built on Axum; the heavy lifting happens in `aura-chat`'s
//! pipeline and `aura-store`.

pub mod api;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::info;

use aura_chat::{ChatPipeline, RateLimiter};
use aura_providers::GeminiProvider;
use aura_store::Store;

/// Shared application state for the gateway.
pub struct AppState {
    pub store: Arc<Store>,
    pub pipeline: Arc<ChatPipeline>,
}

pub type SharedState = Arc<AppState>;

/// Maximum request body size — uploads included.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Build the Axum router with all gateway routes and layers.
///
/// Layers applied: permissive CORS (the API serves a separate frontend),
/// request body size limit, and HTTP trace logging.
pub fn build_router(state: SharedState) -> Router {
    api::api_router(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Build the full state from configuration: store, provider, rate limiter,
/// and pipeline are each constructed once and shared via `Arc`.
pub async fn build_state(
    config: &aura_config::AppConfig,
) -> Result<SharedState, Box<dyn std::error::Error>> {
    let store = Arc::new(Store::new(&config.database.path).await?);
    let provider = Arc::new(GeminiProvider::new(config.api_key.clone()));
    let limiter = Arc::new(RateLimiter::new(
        config.rate_limit.max_requests,
        Duration::from_secs(config.rate_limit.window_secs),
    ));
    let pipeline = Arc::new(ChatPipeline::new(store.clone(), provider, limiter));

    Ok(Arc::new(AppState { store, pipeline }))
}

/// Start the gateway HTTP server.
pub async fn serve(config: aura_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.server.host, config.server.port);

    if !config.has_api_key() {
        info!("No provider API key configured — responses use the mock engine");
    }

    let state = build_state(&config).await?;
    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
