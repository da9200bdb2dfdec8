use super::*;

#[test]
fn test_incident_type_string_roundtrip() {
    for t in IncidentType::ALL {
        assert_eq!(t.as_str().parse::<IncidentType>().unwrap(), t);
    }
}

#[test]
fn test_unknown_strings_rejected() {
    assert!("fire".parse::<IncidentType>().is_err());
    assert!("urgent".parse::<Severity>().is_err());
    assert!("closed".parse::<IncidentStatus>().is_err());

    let err = "urgent".parse::<Severity>().unwrap_err();
    assert_eq!(err.to_string(), "unknown severity 'urgent'");
}

#[test]
fn test_type_title() {
    assert_eq!(IncidentType::CrowdDetection.title(), "Crowd Detection");
    assert_eq!(IncidentType::RestrictedArea.title(), "Restricted Area");
}

#[test]
fn test_severity_ordering() {
    assert!(Severity::Low < Severity::Medium);
    assert!(Severity::High < Severity::Critical);
}

#[test]
fn test_serde_uses_snake_case() {
    let json = serde_json::to_string(&IncidentType::NightActivity).unwrap();
    assert_eq!(json, "\"night_activity\"");

    let status: IncidentStatus = serde_json::from_str("\"acknowledged\"").unwrap();
    assert_eq!(status, IncidentStatus::Acknowledged);
}

#[test]
fn test_new_incident_status_defaults_to_active() {
    let json = serde_json::json!({
        "type": "person_detection",
        "severity": "high",
        "location": "GRA",
        "latitude": 6.329,
        "longitude": 5.635,
        "description": "Person Detection detected at GRA",
        "confidence": 0.91,
        "camera_id": "CAM-005"
    });

    let incident: NewIncident = serde_json::from_value(json).unwrap();
    assert_eq!(incident.status, IncidentStatus::Active);
    assert_eq!(incident.incident_type, IncidentType::PersonDetection);
}
