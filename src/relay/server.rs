use anyhow::{Context, Result};
use axum::{
    extract::{State, WebSocketUpgrade},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::bridge;
use crate::config::Config;
use crate::providers::{AssemblyAiAdapter, DeepgramAdapter, UpstreamAdapter};

/// Shared state for the relay endpoints: one adapter per provider path.
#[derive(Clone)]
pub struct AppState {
    pub deepgram: Arc<dyn UpstreamAdapter>,
    pub assemblyai: Arc<dyn UpstreamAdapter>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let sample_rate = config.audio.sample_rate;
        Self {
            deepgram: Arc::new(DeepgramAdapter::new(
                config.providers.deepgram.clone(),
                sample_rate,
            )),
            assemblyai: Arc::new(AssemblyAiAdapter::new(
                config.providers.assemblyai.clone(),
                sample_rate,
            )),
        }
    }
}

/// Create the relay router: two fixed WebSocket paths, each deterministically
/// bound to one provider adapter, plus a health check.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ws/deepgram", get(deepgram_upgrade))
        .route("/ws/assemblyai", get(assemblyai_upgrade))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the relay server until it fails or is shut down.
pub async fn serve(config: Config) -> Result<()> {
    let addr = format!(
        "{}:{}",
        config.service.relay.bind, config.service.relay.port
    );

    let state = AppState::new(&config);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("{} relay listening on {}", config.service.name, addr);
    info!("WebSocket endpoints: /ws/deepgram, /ws/assemblyai");

    axum::serve(listener, app).await.context("Relay server failed")?;

    Ok(())
}

async fn deepgram_upgrade(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let adapter = Arc::clone(&state.deepgram);
    ws.on_upgrade(move |socket| bridge::run(socket, adapter))
}

async fn assemblyai_upgrade(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let adapter = Arc::clone(&state.assemblyai);
    ws.on_upgrade(move |socket| bridge::run(socket, adapter))
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
