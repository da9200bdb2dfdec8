//! SQLite-backed incident and camera storage.
//!
//! Timestamps are stored as RFC 3339 text with millisecond precision so
//! that lexical order matches chronological order.

use super::{IncidentFilter, IncidentStore};
use crate::camera::{Camera, CameraStatus, NewCamera};
use crate::incident::{Incident, IncidentStatus, NewIncident};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS incidents (
        id             INTEGER PRIMARY KEY AUTOINCREMENT,
        type           TEXT NOT NULL,
        severity       TEXT NOT NULL,
        location       TEXT NOT NULL,
        latitude       REAL NOT NULL,
        longitude      REAL NOT NULL,
        description    TEXT NOT NULL,
        confidence     REAL NOT NULL,
        camera_id      TEXT NOT NULL,
        status         TEXT NOT NULL DEFAULT 'active',
        video_clip_url TEXT,
        created_at     TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        updated_at     TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_incidents_created_at ON incidents(created_at);

    CREATE TABLE IF NOT EXISTS cameras (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        name       TEXT NOT NULL,
        location   TEXT NOT NULL,
        latitude   REAL NOT NULL,
        longitude  REAL NOT NULL,
        status     TEXT NOT NULL DEFAULT 'online',
        type       TEXT NOT NULL DEFAULT 'cctv',
        stream_url TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    );
"#;

const INCIDENT_COLUMNS: &str = "id, type, severity, location, latitude, longitude, description, \
     confidence, camera_id, status, video_clip_url, created_at, updated_at";

const CAMERA_COLUMNS: &str =
    "id, name, location, latitude, longitude, status, type, stream_url, created_at";

/// Incident and camera tables in one SQLite database.
///
/// # Thread Safety
/// - Connection is wrapped in Mutex; every write is a single statement
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database and ensures the tables exist.
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database at {}", db_path))?;
        conn.execute_batch(SCHEMA)
            .context("Failed to create schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Database connection lock poisoned"))
    }

    /// Inserts an incident; `created_at` is assigned by the database.
    pub fn insert_incident(&self, incident: &NewIncident) -> Result<Incident> {
        let conn = self.conn()?;
        let (id, created_at): (i64, String) = conn
            .query_row(
                r#"
                INSERT INTO incidents (
                    type, severity, location, latitude, longitude,
                    description, confidence, camera_id, status
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                RETURNING id, created_at
                "#,
                params![
                    incident.incident_type.as_str(),
                    incident.severity.as_str(),
                    incident.location,
                    incident.latitude,
                    incident.longitude,
                    incident.description,
                    incident.confidence,
                    incident.camera_id,
                    incident.status.as_str(),
                ],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .context("Failed to insert incident")?;

        Ok(Incident {
            id,
            incident_type: incident.incident_type,
            severity: incident.severity,
            location: incident.location.clone(),
            latitude: incident.latitude,
            longitude: incident.longitude,
            description: incident.description.clone(),
            confidence: incident.confidence,
            camera_id: incident.camera_id.clone(),
            status: incident.status,
            video_clip_url: None,
            created_at: parse_timestamp(&created_at)?,
            updated_at: None,
        })
    }

    /// Inserts an incident with an explicit creation time (demo backfill).
    pub fn insert_incident_at(
        &self,
        incident: &NewIncident,
        created_at: DateTime<Utc>,
    ) -> Result<Incident> {
        let id = {
            let conn = self.conn()?;
            conn.execute(
                r#"
                INSERT INTO incidents (
                    type, severity, location, latitude, longitude,
                    description, confidence, camera_id, status, created_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
                params![
                    incident.incident_type.as_str(),
                    incident.severity.as_str(),
                    incident.location,
                    incident.latitude,
                    incident.longitude,
                    incident.description,
                    incident.confidence,
                    incident.camera_id,
                    incident.status.as_str(),
                    format_timestamp(&created_at),
                ],
            )
            .context("Failed to insert backdated incident")?;
            conn.last_insert_rowid()
        };

        self.get_incident(id)?
            .ok_or_else(|| anyhow!("Incident {} missing after insert", id))
    }

    pub fn get_incident(&self, id: i64) -> Result<Option<Incident>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {} FROM incidents WHERE id = ?1", INCIDENT_COLUMNS),
                params![id],
                IncidentRow::read,
            )
            .optional()
            .context("Failed to query incident")?;

        row.map(IncidentRow::into_incident).transpose()
    }

    pub fn list_incidents(&self, filter: &IncidentFilter) -> Result<Vec<Incident>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                r#"
                SELECT {} FROM incidents
                WHERE (?1 IS NULL OR status = ?1)
                  AND (?2 IS NULL OR severity = ?2)
                ORDER BY created_at DESC, id DESC
                LIMIT ?3
                "#,
                INCIDENT_COLUMNS
            ))
            .context("Failed to prepare incident listing")?;

        let rows = stmt
            .query_map(
                params![
                    filter.status.map(|s| s.as_str()),
                    filter.severity.map(|s| s.as_str()),
                    filter.limit as i64,
                ],
                IncidentRow::read,
            )
            .context("Failed to list incidents")?;

        let mut incidents = Vec::new();
        for row in rows {
            let row = row.context("Failed to read incident row")?;
            incidents.push(row.into_incident()?);
        }
        Ok(incidents)
    }

    pub fn update_incident_status(
        &self,
        id: i64,
        status: IncidentStatus,
    ) -> Result<Option<Incident>> {
        let rows_affected = self
            .conn()?
            .execute(
                "UPDATE incidents SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.as_str(), format_timestamp(&Utc::now()), id],
            )
            .context("Failed to update incident status")?;

        if rows_affected == 0 {
            return Ok(None);
        }
        self.get_incident(id)
    }

    pub fn incident_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM incidents", [], |row| row.get(0))
            .context("Failed to count incidents")?;
        Ok(count as usize)
    }

    pub fn insert_camera(&self, camera: &NewCamera) -> Result<Camera> {
        let conn = self.conn()?;
        let (id, created_at): (i64, String) = conn
            .query_row(
                r#"
                INSERT INTO cameras (name, location, latitude, longitude, status, type, stream_url)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                RETURNING id, created_at
                "#,
                params![
                    camera.name,
                    camera.location,
                    camera.latitude,
                    camera.longitude,
                    camera.status.as_str(),
                    camera.kind.as_str(),
                    camera.stream_url,
                ],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .context("Failed to insert camera")?;

        Ok(Camera {
            id,
            name: camera.name.clone(),
            location: camera.location.clone(),
            latitude: camera.latitude,
            longitude: camera.longitude,
            status: camera.status,
            kind: camera.kind,
            stream_url: camera.stream_url.clone(),
            created_at: parse_timestamp(&created_at)?,
        })
    }

    pub fn get_camera(&self, id: i64) -> Result<Option<Camera>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {} FROM cameras WHERE id = ?1", CAMERA_COLUMNS),
                params![id],
                CameraRow::read,
            )
            .optional()
            .context("Failed to query camera")?;

        row.map(CameraRow::into_camera).transpose()
    }

    pub fn list_cameras(&self, status: Option<CameraStatus>) -> Result<Vec<Camera>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM cameras WHERE (?1 IS NULL OR status = ?1) ORDER BY id ASC",
                CAMERA_COLUMNS
            ))
            .context("Failed to prepare camera listing")?;

        let rows = stmt
            .query_map(params![status.map(|s| s.as_str())], CameraRow::read)
            .context("Failed to list cameras")?;

        let mut cameras = Vec::new();
        for row in rows {
            let row = row.context("Failed to read camera row")?;
            cameras.push(row.into_camera()?);
        }
        Ok(cameras)
    }

    pub fn update_camera_status(&self, id: i64, status: CameraStatus) -> Result<Option<Camera>> {
        let rows_affected = self
            .conn()?
            .execute(
                "UPDATE cameras SET status = ?1 WHERE id = ?2",
                params![status.as_str(), id],
            )
            .context("Failed to update camera status")?;

        if rows_affected == 0 {
            return Ok(None);
        }
        self.get_camera(id)
    }

    pub fn camera_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM cameras", [], |row| row.get(0))
            .context("Failed to count cameras")?;
        Ok(count as usize)
    }
}

#[async_trait]
impl IncidentStore for SqliteStore {
    async fn insert(&self, incident: NewIncident) -> Result<Incident> {
        self.insert_incident(&incident)
    }

    async fn get(&self, id: i64) -> Result<Option<Incident>> {
        self.get_incident(id)
    }

    async fn list(&self, filter: &IncidentFilter) -> Result<Vec<Incident>> {
        self.list_incidents(filter)
    }

    async fn update_status(&self, id: i64, status: IncidentStatus) -> Result<Option<Incident>> {
        self.update_incident_status(id, status)
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .with_context(|| format!("Failed to parse timestamp '{}'", raw))
}

/// Raw incident columns, converted after the statement completes
struct IncidentRow {
    id: i64,
    incident_type: String,
    severity: String,
    location: String,
    latitude: f64,
    longitude: f64,
    description: String,
    confidence: f64,
    camera_id: String,
    status: String,
    video_clip_url: Option<String>,
    created_at: String,
    updated_at: Option<String>,
}

impl IncidentRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            incident_type: row.get(1)?,
            severity: row.get(2)?,
            location: row.get(3)?,
            latitude: row.get(4)?,
            longitude: row.get(5)?,
            description: row.get(6)?,
            confidence: row.get(7)?,
            camera_id: row.get(8)?,
            status: row.get(9)?,
            video_clip_url: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }

    fn into_incident(self) -> Result<Incident> {
        Ok(Incident {
            id: self.id,
            incident_type: self
                .incident_type
                .parse()
                .with_context(|| format!("Incident {} has invalid type", self.id))?,
            severity: self
                .severity
                .parse()
                .with_context(|| format!("Incident {} has invalid severity", self.id))?,
            location: self.location,
            latitude: self.latitude,
            longitude: self.longitude,
            description: self.description,
            confidence: self.confidence,
            camera_id: self.camera_id,
            status: self
                .status
                .parse()
                .with_context(|| format!("Incident {} has invalid status", self.id))?,
            video_clip_url: self.video_clip_url,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: self.updated_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}

struct CameraRow {
    id: i64,
    name: String,
    location: String,
    latitude: f64,
    longitude: f64,
    status: String,
    kind: String,
    stream_url: String,
    created_at: String,
}

impl CameraRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            location: row.get(2)?,
            latitude: row.get(3)?,
            longitude: row.get(4)?,
            status: row.get(5)?,
            kind: row.get(6)?,
            stream_url: row.get(7)?,
            created_at: row.get(8)?,
        })
    }

    fn into_camera(self) -> Result<Camera> {
        Ok(Camera {
            id: self.id,
            name: self.name,
            location: self.location,
            latitude: self.latitude,
            longitude: self.longitude,
            status: self
                .status
                .parse()
                .with_context(|| format!("Camera {} has invalid status", self.id))?,
            kind: self
                .kind
                .parse()
                .with_context(|| format!("Camera {} has invalid type", self.id))?,
            stream_url: self.stream_url,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}
