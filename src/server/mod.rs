//! HTTP server - REST + SSE surface for the council
//!
//! Endpoints:
//! - GET  /api/models  - model directory
//! - GET  /api/history - recent run summaries, newest first
//! - POST /api/ask     - single-model, non-streaming
//! - POST /api/stream  - single-model SSE stream
//! - POST /api/council - full three-stage council SSE stream

pub mod handlers;

use anyhow::Result;
use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::council::HistoryRing;
use crate::llm::ModelClient;

#[derive(Clone)]
pub struct AppState {
    pub client: Arc<dyn ModelClient>,
    pub history: Arc<Mutex<HistoryRing>>,
    /// Hard cap on models per council run.
    pub max_models: usize,
    /// Model used by the single-model endpoints.
    pub default_model: String,
}

/// Create the router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/models", get(handlers::models_handler))
        .route("/api/history", get(handlers::history_handler))
        .route("/api/ask", post(handlers::ask_handler))
        .route("/api/stream", post(handlers::stream_handler))
        .route("/api/council", post(handlers::council_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until shutdown.
pub async fn run(host: &str, port: u16, state: AppState) -> Result<()> {
    let app = create_router(state);
    let bind_address = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    tracing::info!("council server listening on http://{}", bind_address);
    axum::serve(listener, app).await?;

    Ok(())
}
