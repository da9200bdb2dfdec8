use crate::incident::ParseEnumError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Camera availability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraStatus {
    Online,
    Offline,
    Maintenance,
}

impl CameraStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CameraStatus::Online => "online",
            CameraStatus::Offline => "offline",
            CameraStatus::Maintenance => "maintenance",
        }
    }
}

impl FromStr for CameraStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(CameraStatus::Online),
            "offline" => Ok(CameraStatus::Offline),
            "maintenance" => Ok(CameraStatus::Maintenance),
            other => Err(ParseEnumError::new("camera status", other)),
        }
    }
}

/// Camera hardware class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraKind {
    Cctv,
    Drone,
    Mobile,
}

impl CameraKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CameraKind::Cctv => "cctv",
            CameraKind::Drone => "drone",
            CameraKind::Mobile => "mobile",
        }
    }
}

impl FromStr for CameraKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cctv" => Ok(CameraKind::Cctv),
            "drone" => Ok(CameraKind::Drone),
            "mobile" => Ok(CameraKind::Mobile),
            other => Err(ParseEnumError::new("camera type", other)),
        }
    }
}

fn default_camera_status() -> CameraStatus {
    CameraStatus::Online
}

fn default_camera_kind() -> CameraKind {
    CameraKind::Cctv
}

/// Camera registration request
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewCamera {
    pub name: String,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_camera_status")]
    pub status: CameraStatus,
    #[serde(rename = "type", default = "default_camera_kind")]
    pub kind: CameraKind,
    #[serde(default)]
    pub stream_url: String,
}

/// Persisted camera record
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub id: i64,
    pub name: String,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub status: CameraStatus,
    pub kind: CameraKind,
    pub stream_url: String,
    pub created_at: DateTime<Utc>,
}
