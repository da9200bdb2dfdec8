// HTTP and WebSocket APIs

pub mod analysis;
pub mod cameras;
mod error;
mod extract;
pub mod incidents;
pub mod websocket;

pub use analysis::create_analysis_router;
pub use cameras::create_camera_router;
pub use error::ApiError;
pub use extract::{ApiJson, ApiPath, ApiQuery};
pub use incidents::create_incident_router;
pub use websocket::{create_ws_router, ws_handler};

use crate::analyzer::Analyzer;
use crate::hub::BroadcastHub;
use crate::store::SqliteStore;
use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

/// State shared by every route
pub struct ApiState {
    pub store: Arc<SqliteStore>,
    pub hub: Arc<BroadcastHub>,
    pub analyzer: Arc<dyn Analyzer>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    /// Live real-time connections
    pub connections: usize,
}

/// Create health router
pub fn create_health_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .with_state(state)
}

/// GET /api/health
async fn health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "watchpost",
        connections: state.hub.len(),
    })
}

/// Full application: every router merged, with CORS for `cors_origins`.
///
/// Origins that are not valid header values are skipped with a warning.
/// An empty list disables the CORS layer.
pub fn create_app(state: Arc<ApiState>, cors_origins: &[String]) -> Router {
    let app = Router::new()
        .merge(create_health_router(state.clone()))
        .merge(create_incident_router(state.clone()))
        .merge(create_camera_router(state.clone()))
        .merge(create_analysis_router(state.clone()))
        .merge(create_ws_router(state));

    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return app;
    }

    app.layer(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
            .allow_credentials(true),
    )
}
