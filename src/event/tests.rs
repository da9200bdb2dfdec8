use super::*;
use chrono::TimeZone;
use serde_json::Value;

fn sample_incident() -> Incident {
    Incident {
        id: 42,
        incident_type: IncidentType::CrowdDetection,
        severity: Severity::High,
        location: "Ring Road".to_string(),
        latitude: 6.3391,
        longitude: 5.6012,
        description: "Crowd Detection detected at Ring Road. AI Confidence: 0 persons found."
            .to_string(),
        confidence: 0.8,
        camera_id: "CAM-003".to_string(),
        status: IncidentStatus::Active,
        video_clip_url: None,
        created_at: Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap(),
        updated_at: None,
    }
}

#[test]
fn test_new_incident_wire_shape() {
    let event = RealtimeEvent::from(&sample_incident());
    let json: Value = serde_json::to_value(&event).unwrap();

    assert_eq!(json["type"], "new_incident");
    let data = &json["data"];
    assert_eq!(data["id"], "42");
    assert_eq!(data["type"], "crowd_detection");
    assert_eq!(data["severity"], "high");
    assert_eq!(data["location"], "Ring Road");
    assert_eq!(data["latitude"], 6.3391);
    assert_eq!(data["longitude"], 5.6012);
    assert_eq!(data["timestamp"], "2026-03-14T09:26:53Z");
    assert_eq!(data["confidence"], 0.8);
    assert_eq!(data["cameraId"], "CAM-003");
    assert_eq!(data["status"], "active");
    assert!(data.get("camera_id").is_none());

    let fields = data.as_object().unwrap();
    assert_eq!(fields.len(), 11);
}

#[test]
fn test_event_decodes_to_same_value() {
    let event = RealtimeEvent::from(&sample_incident());
    let encoded = serde_json::to_string(&event).unwrap();
    let decoded: RealtimeEvent = serde_json::from_str(&encoded).unwrap();

    assert_eq!(decoded, event);
}

#[test]
fn test_timestamp_is_store_assigned_created_at() {
    let incident = sample_incident();
    let payload = IncidentPayload::from(&incident);
    assert_eq!(payload.timestamp, incident.created_at);
    assert_eq!(payload.id, incident.id.to_string());
}

#[test]
fn test_unknown_tag_rejected() {
    let raw = r#"{"type":"incident_deleted","data":{"id":"1"}}"#;
    assert!(serde_json::from_str::<RealtimeEvent>(raw).is_err());
}

#[test]
fn test_kind() {
    let event = RealtimeEvent::from(&sample_incident());
    assert_eq!(event.kind(), "new_incident");
}
