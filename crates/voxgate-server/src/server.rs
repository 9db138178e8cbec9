use std::sync::Arc;
use std::time::Duration;

use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;
use tower_http::trace::TraceLayer;

use voxgate_agents::VoiceAgent;
use voxgate_store::ConversationStore;

use crate::authorize;
use crate::config::ServerConfig;
use crate::webhook;

/// Shared application state passed to Axum handlers. Built once at startup;
/// the agent and store live for the process lifetime.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub store: Arc<ConversationStore>,
    pub agent: Arc<dyn VoiceAgent>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: ServerConfig, agent: Arc<dyn VoiceAgent>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            config: Arc::new(config),
            store: Arc::new(ConversationStore::new()),
            agent,
            http,
        })
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(&state.config.agent_route, post(webhook::webhook_handler))
        .route(&state.config.authorize_route, post(authorize::authorize_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

/// Handle returned by `start()`. The serve task runs until the handle is
/// dropped, which aborts it and closes the listener.
pub struct ServerHandle {
    pub port: u16,
    server: tokio::task::JoinHandle<()>,
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Create and start the gateway. Binds the configured host/port (port 0
/// picks an ephemeral port, used by tests) and serves until dropped.
pub async fn start(config: ServerConfig, agent: Arc<dyn VoiceAgent>) -> anyhow::Result<ServerHandle> {
    let host = config.host.clone();
    let port = config.port;
    let state = AppState::new(config, agent)?;
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(port = local_addr.port(), "voxgate server started");

    let server = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        server,
    })
}
