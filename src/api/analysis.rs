use super::extract::ApiQuery;
use super::{ApiError, ApiState};
use crate::analyzer::AnalysisResult;
use axum::{
    extract::State,
    response::Json,
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[derive(Deserialize)]
pub struct ProcessParams {
    pub camera_id: String,
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub camera_id: String,
    pub analysis: AnalysisResult,
}

/// Create analysis trigger router
pub fn create_analysis_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/ai/process", post(process_feed))
        .with_state(state)
}

/// POST /api/ai/process?camera_id= - run the analyzer once, no incident is stored
async fn process_feed(
    State(state): State<Arc<ApiState>>,
    ApiQuery(params): ApiQuery<ProcessParams>,
) -> Result<Json<ProcessResponse>, ApiError> {
    if params.camera_id.trim().is_empty() {
        return Err(ApiError::BadRequest("camera_id is required".to_string()));
    }

    let analysis = state.analyzer.analyze(&params.camera_id).await;
    debug!(
        camera_id = %params.camera_id,
        count = analysis.count,
        crowd_alert = analysis.crowd_alert,
        "On-demand analysis"
    );

    Ok(Json(ProcessResponse {
        camera_id: params.camera_id,
        analysis,
    }))
}
