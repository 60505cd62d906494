//! HTTP API gateway for agentchat.
//!
//! Endpoints:
//!
//! - `POST /chat`: Run the agent; JSON response or SSE stream
//! - `GET  /tools`: List registered tool schemas
//! - `GET  /health`: Liveness probe
//!
//! Built on Axum. Each request gets its own run; nothing is shared between
//! requests except the read-only orchestrator.

pub mod chat;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::State,
    http::{Method, header},
    response::Json,
    routing::{get, post},
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use agentchat_agent::Orchestrator;
use agentchat_config::AppConfig;
use agentchat_core::provider::ToolDefinition;

/// Default request body limit (1 MB).
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub orchestrator: Arc<Orchestrator>,
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
///
/// Layers applied:
/// - CORS for any origin (`GET`, `POST`, `Content-Type`)
/// - Request body size limit
/// - HTTP trace logging
pub fn build_router(state: SharedState, body_limit: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_handler))
        .route("/tools", get(list_tools_handler))
        .route("/chat", post(chat::chat_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
///
/// Builds the provider, the tool registry, and the orchestrator once and
/// shares them across requests.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let provider = agentchat_providers::build_from_config(&config)?;
    let tools = Arc::new(agentchat_tools::default_registry(&config.search)?);
    let orchestrator = Arc::new(Orchestrator::from_config(provider, tools, &config));

    info!(
        model = %orchestrator.model(),
        tools = ?orchestrator.tools().names(),
        max_iterations = orchestrator.max_iterations(),
        "Agent ready"
    );

    let state = Arc::new(GatewayState { orchestrator });
    let app = build_router(state, config.gateway.body_limit_bytes);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Gateway listening");
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
struct ToolListResponse {
    tools: Vec<ToolDefinition>,
    count: usize,
}

async fn list_tools_handler(State(state): State<SharedState>) -> Json<ToolListResponse> {
    let tools = state.orchestrator.tools().definitions();
    Json(ToolListResponse {
        count: tools.len(),
        tools,
    })
}
