use crate::incident::{Incident, IncidentStatus, IncidentType, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(test)]
mod tests;

/// Server → client real-time message.
///
/// Serialized as `{"type": "<variant>", "data": {...}}`. The tag is the
/// schema discriminator; new message kinds are added as new variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
#[serde(rename_all = "snake_case")]
pub enum RealtimeEvent {
    NewIncident(IncidentPayload),
}

impl RealtimeEvent {
    /// Tag value as it appears on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            RealtimeEvent::NewIncident(_) => "new_incident",
        }
    }
}

impl From<&Incident> for RealtimeEvent {
    fn from(incident: &Incident) -> Self {
        RealtimeEvent::NewIncident(IncidentPayload::from(incident))
    }
}

/// Incident as presented to clients
///
/// `id` and `timestamp` always come from the stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentPayload {
    pub id: String,
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    pub severity: Severity,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub confidence: f64,
    #[serde(rename = "cameraId")]
    pub camera_id: String,
    pub status: IncidentStatus,
}

impl From<&Incident> for IncidentPayload {
    fn from(incident: &Incident) -> Self {
        Self {
            id: incident.id.to_string(),
            incident_type: incident.incident_type,
            severity: incident.severity,
            location: incident.location.clone(),
            latitude: incident.latitude,
            longitude: incident.longitude,
            timestamp: incident.created_at,
            description: incident.description.clone(),
            confidence: incident.confidence,
            camera_id: incident.camera_id.clone(),
            status: incident.status,
        }
    }
}
