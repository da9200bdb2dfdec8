use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::{ApiError, ApiState};
use crate::event::IncidentPayload;
use crate::incident::{Incident, IncidentStatus, NewIncident, Severity};
use crate::store::{IncidentFilter, IncidentStore, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use axum::{
    extract::State,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Query parameters for incident listing
#[derive(Debug, Default, Deserialize)]
pub struct IncidentQueryParams {
    pub status: Option<String>,
    pub severity: Option<String>,
    pub limit: Option<usize>,
}

impl IncidentQueryParams {
    fn into_filter(self) -> Result<IncidentFilter, ApiError> {
        let limit = self.limit.unwrap_or(DEFAULT_LIST_LIMIT);
        if limit > MAX_LIST_LIMIT {
            return Err(ApiError::BadRequest(format!(
                "limit must be at most {}",
                MAX_LIST_LIMIT
            )));
        }

        Ok(IncidentFilter {
            status: parse_optional::<IncidentStatus>(self.status)?,
            severity: parse_optional::<Severity>(self.severity)?,
            limit,
        })
    }
}

/// Empty strings count as "no filter"
pub(crate) fn parse_optional<T>(raw: Option<String>) -> Result<Option<T>, ApiError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ApiError::BadRequest(e.to_string())),
    }
}

/// Incident as returned by the REST API: the real-time payload plus the
/// clip link.
#[derive(Debug, Serialize)]
pub struct IncidentResponse {
    #[serde(flatten)]
    pub payload: IncidentPayload,
    #[serde(rename = "videoClipUrl")]
    pub video_clip_url: Option<String>,
}

impl From<Incident> for IncidentResponse {
    fn from(incident: Incident) -> Self {
        Self {
            payload: IncidentPayload::from(&incident),
            video_clip_url: incident.video_clip_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateIncidentRequest {
    pub status: Option<IncidentStatus>,
}

/// Create incidents router
pub fn create_incident_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/incidents", get(list_incidents).post(create_incident))
        .route("/api/incidents/:id", get(get_incident).patch(update_incident))
        .with_state(state)
}

/// GET /api/incidents - newest first
///
/// Query parameters:
/// - `status`, `severity`: exact match
/// - `limit`: default 100, at most 500
async fn list_incidents(
    State(state): State<Arc<ApiState>>,
    ApiQuery(params): ApiQuery<IncidentQueryParams>,
) -> Result<Json<Vec<IncidentResponse>>, ApiError> {
    let filter = params.into_filter()?;
    let incidents = state.store.list(&filter).await?;
    Ok(Json(incidents.into_iter().map(IncidentResponse::from).collect()))
}

/// GET /api/incidents/:id
async fn get_incident(
    State(state): State<Arc<ApiState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<IncidentResponse>, ApiError> {
    let incident = state
        .store
        .get(id)
        .await?
        .ok_or(ApiError::NotFound("Incident"))?;
    Ok(Json(incident.into()))
}

/// POST /api/incidents - manual report, always starts active
async fn create_incident(
    State(state): State<Arc<ApiState>>,
    ApiJson(mut request): ApiJson<NewIncident>,
) -> Result<Json<IncidentResponse>, ApiError> {
    request.status = IncidentStatus::Active;
    let incident = state.store.insert(request).await?;

    info!(
        id = incident.id,
        incident_type = %incident.incident_type,
        severity = %incident.severity,
        "Incident reported via API"
    );
    Ok(Json(incident.into()))
}

/// PATCH /api/incidents/:id - `{"status": ...}`; an absent status leaves the record unchanged
async fn update_incident(
    State(state): State<Arc<ApiState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(update): ApiJson<UpdateIncidentRequest>,
) -> Result<Json<IncidentResponse>, ApiError> {
    let incident = match update.status {
        Some(status) => {
            let updated = state.store.update_status(id, status).await?;
            if updated.is_some() {
                info!(id, status = %status, "Incident status updated");
            }
            updated
        }
        None => state.store.get(id).await?,
    };

    incident
        .map(|i| Json(i.into()))
        .ok_or(ApiError::NotFound("Incident"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_defaults() {
        let filter = IncidentQueryParams::default().into_filter().unwrap();
        assert_eq!(filter, IncidentFilter::default());
    }

    #[test]
    fn test_filter_rejects_large_limit() {
        let params = IncidentQueryParams {
            limit: Some(501),
            ..Default::default()
        };
        assert!(matches!(params.into_filter(), Err(ApiError::BadRequest(_))));

        let params = IncidentQueryParams {
            limit: Some(500),
            ..Default::default()
        };
        assert_eq!(params.into_filter().unwrap().limit, 500);
    }

    #[test]
    fn test_filter_parses_enums() {
        let params = IncidentQueryParams {
            status: Some("resolved".to_string()),
            severity: Some(String::new()),
            limit: None,
        };
        let filter = params.into_filter().unwrap();
        assert_eq!(filter.status, Some(IncidentStatus::Resolved));
        assert_eq!(filter.severity, None);

        let params = IncidentQueryParams {
            severity: Some("extreme".to_string()),
            ..Default::default()
        };
        match params.into_filter() {
            Err(ApiError::BadRequest(msg)) => assert_eq!(msg, "unknown severity 'extreme'"),
            other => panic!("expected bad request, got {:?}", other),
        }
    }
}
