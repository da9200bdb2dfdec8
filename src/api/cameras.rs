use super::incidents::parse_optional;
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::{ApiError, ApiState};
use crate::camera::{Camera, CameraKind, CameraStatus, NewCamera};
use axum::{
    extract::State,
    response::Json,
    routing::{get, patch},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Deserialize)]
pub struct CameraQueryParams {
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct CameraStatusParams {
    pub status: String,
}

/// Camera response
#[derive(Debug, Serialize)]
pub struct CameraResponse {
    pub id: String,
    pub name: String,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub status: CameraStatus,
    #[serde(rename = "type")]
    pub kind: CameraKind,
    #[serde(rename = "streamUrl")]
    pub stream_url: String,
}

impl From<Camera> for CameraResponse {
    fn from(camera: Camera) -> Self {
        Self {
            id: camera.id.to_string(),
            name: camera.name,
            location: camera.location,
            latitude: camera.latitude,
            longitude: camera.longitude,
            status: camera.status,
            kind: camera.kind,
            stream_url: camera.stream_url,
        }
    }
}

/// Create cameras router
pub fn create_camera_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/cameras", get(list_cameras).post(create_camera))
        .route("/api/cameras/:id", get(get_camera))
        .route("/api/cameras/:id/status", patch(update_camera_status))
        .with_state(state)
}

/// GET /api/cameras?status=
async fn list_cameras(
    State(state): State<Arc<ApiState>>,
    ApiQuery(params): ApiQuery<CameraQueryParams>,
) -> Result<Json<Vec<CameraResponse>>, ApiError> {
    let status = parse_optional::<CameraStatus>(params.status)?;
    let cameras = state.store.list_cameras(status)?;
    Ok(Json(cameras.into_iter().map(CameraResponse::from).collect()))
}

/// GET /api/cameras/:id
async fn get_camera(
    State(state): State<Arc<ApiState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<CameraResponse>, ApiError> {
    let camera = state
        .store
        .get_camera(id)?
        .ok_or(ApiError::NotFound("Camera"))?;
    Ok(Json(camera.into()))
}

/// POST /api/cameras
async fn create_camera(
    State(state): State<Arc<ApiState>>,
    ApiJson(request): ApiJson<NewCamera>,
) -> Result<Json<CameraResponse>, ApiError> {
    let camera = state.store.insert_camera(&request)?;
    info!(id = camera.id, name = %camera.name, "Camera registered");
    Ok(Json(camera.into()))
}

/// PATCH /api/cameras/:id/status?status=
async fn update_camera_status(
    State(state): State<Arc<ApiState>>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(params): ApiQuery<CameraStatusParams>,
) -> Result<Json<CameraResponse>, ApiError> {
    let status: CameraStatus = params
        .status
        .parse()
        .map_err(|e: crate::incident::ParseEnumError| ApiError::BadRequest(e.to_string()))?;

    let camera = state
        .store
        .update_camera_status(id, status)?
        .ok_or(ApiError::NotFound("Camera"))?;

    info!(id, status = status.as_str(), "Camera status updated");
    Ok(Json(camera.into()))
}
