//! Demo data for a fresh database.

use super::SqliteStore;
use crate::camera::{CameraKind, CameraStatus, NewCamera};
use crate::incident::{IncidentStatus, IncidentType, NewIncident, Severity};
use anyhow::Result;
use chrono::{Duration, Utc};
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;

const DEMO_CAMERAS: [(&str, &str, f64, f64); 8] = [
    ("CAM-001", "Ring Road, Benin City", 6.3350, 5.6037),
    ("CAM-002", "Sapele Road Junction", 6.3180, 5.6120),
    ("CAM-003", "Airport Road Entrance", 6.3050, 5.5990),
    ("CAM-004", "New Benin Market Area", 6.3420, 5.6280),
    ("CAM-005", "GRA Main Gate", 6.3290, 5.6350),
    ("CAM-006", "Uselu Market", 6.3580, 5.6180),
    ("CAM-007", "Third Circular Junction", 6.3150, 5.6400),
    ("CAM-008", "Akpakpava Road", 6.3380, 5.6150),
];

const DEMO_LOCATIONS: [(&str, f64, f64); 7] = [
    ("Ring Road", 6.3350, 5.6037),
    ("Sapele Road", 6.3180, 5.6120),
    ("Airport Road", 6.3050, 5.5990),
    ("New Benin", 6.3420, 5.6280),
    ("GRA", 6.3290, 5.6350),
    ("Uselu", 6.3580, 5.6180),
    ("Akpakpava", 6.3380, 5.6150),
];

const BACKLOG_SIZE: usize = 25;

/// Populate an empty database with demo cameras and an incident backlog.
///
/// Skips entirely if any camera already exists. Returns whether data was
/// written.
pub fn seed_demo_data<R: Rng>(store: &SqliteStore, rng: &mut R) -> Result<bool> {
    if store.camera_count()? > 0 {
        info!("Demo data already exists, skipping seed");
        return Ok(false);
    }

    let camera_statuses = [
        CameraStatus::Online,
        CameraStatus::Offline,
        CameraStatus::Maintenance,
    ];
    let camera_weights = WeightedIndex::new([8, 1, 1])?;

    for (name, location, latitude, longitude) in DEMO_CAMERAS {
        store.insert_camera(&NewCamera {
            name: name.to_string(),
            location: location.to_string(),
            latitude,
            longitude,
            status: camera_statuses[camera_weights.sample(rng)],
            kind: CameraKind::Cctv,
            stream_url: format!("/streams/{}", name.to_lowercase()),
        })?;
    }

    let severity_weights = WeightedIndex::new([4, 3, 2, 1])?;
    let statuses = [
        IncidentStatus::Active,
        IncidentStatus::Acknowledged,
        IncidentStatus::Resolved,
    ];
    let status_weights = WeightedIndex::new([3, 2, 5])?;
    let now = Utc::now();

    for _ in 0..BACKLOG_SIZE {
        let (location, base_lat, base_lon) = DEMO_LOCATIONS[rng.gen_range(0..DEMO_LOCATIONS.len())];
        let incident_type = *IncidentType::ALL
            .choose(rng)
            .unwrap_or(&IncidentType::PersonDetection);
        let created_at = now - Duration::hours(rng.gen_range(1..=168));

        let incident = NewIncident {
            incident_type,
            severity: Severity::ALL[severity_weights.sample(rng)],
            location: location.to_string(),
            latitude: base_lat + rng.gen_range(-0.005..=0.005),
            longitude: base_lon + rng.gen_range(-0.005..=0.005),
            description: format!("{} detected at {}", incident_type.title(), location),
            confidence: rng.gen_range(0.70..=0.98),
            camera_id: format!("CAM-{:03}", rng.gen_range(1..=8)),
            status: statuses[status_weights.sample(rng)],
        };
        store.insert_incident_at(&incident, created_at)?;
    }

    info!(
        cameras = DEMO_CAMERAS.len(),
        incidents = BACKLOG_SIZE,
        "Demo data seeded"
    );
    Ok(true)
}
