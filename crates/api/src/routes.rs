use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, Json},
    routing::get,
    Router,
};
use chrono::Datelike;
use orbital_services::{IngestMetrics, IngestStats};
use orbital_stream::{BroadcastHub, SubscriberInfo};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::stream::stream_events;

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");

#[derive(Clone)]
pub struct AppState {
    pub hub: BroadcastHub,
    pub metrics: Arc<IngestMetrics>,
    pub shutdown: CancellationToken,
    /// Public address of `/stream`, embedded in the landing page.
    pub stream_url: String,
    pub keep_alive: Option<Duration>,
}

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub version: String,
    pub timestamp: String,
    pub subscribers: usize,
    pub buffer_capacity: usize,
    pub events_broadcast: u64,
    pub ingest: IngestStats,
    pub connections: Vec<SubscriberInfo>,
}

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(health_check))
        .route("/stream", get(stream_events))
        .route("/api/v1/status", get(get_status))
}

/// Full application: routes, static assets and request tracing.
pub fn create_app(state: AppState, static_dir: &Path) -> Router {
    create_routes()
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render_index(&state.stream_url, chrono::Utc::now().year()))
}

pub fn render_index(stream_url: &str, year: i32) -> String {
    // The URL lands inside a <script> block as a JS string literal.
    let stream_url = serde_json::to_string(stream_url)
        .unwrap_or_else(|_| "\"/stream\"".to_string())
        .replace('<', "\\u003c");

    INDEX_TEMPLATE
        .replace("{{ stream_url }}", &stream_url)
        .replace("{{ year }}", &year.to_string())
}

async fn get_status(State(state): State<AppState>) -> Json<ApiResponse<StatusResponse>> {
    let status = StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        subscribers: state.hub.subscriber_count(),
        buffer_capacity: state.hub.buffer_capacity(),
        events_broadcast: state.hub.published(),
        ingest: state.metrics.snapshot(),
        connections: state.hub.subscribers(),
    };

    Json(ApiResponse {
        success: true,
        data: Some(status),
        message: Some("System operational".to_string()),
    })
}
