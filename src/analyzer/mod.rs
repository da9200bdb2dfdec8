//! Frame analysis collaborator.
//!
//! The generator and the trigger endpoint only see the [`Analyzer`] trait.
//! [`SimulatedAnalyzer`] fabricates plausible detections for demo use.

use crate::config::AnalyzerConfig;
use async_trait::async_trait;
use chrono::{DateTime, Local, Timelike, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Number of people above which a frame counts as a crowd
pub const CROWD_THRESHOLD: usize = 5;

/// One detected object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    /// In [0, 1]
    pub confidence: f64,
    #[serde(rename = "box")]
    pub bbox: [u32; 4],
}

/// Scene-level anomaly flags
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnomalyFlags {
    pub motion_anomaly: bool,
    pub night_activity: bool,
    pub confidence: f64,
}

/// Detection summary for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub detections: Vec<Detection>,
    /// Number of `person` detections
    pub count: usize,
    pub crowd_alert: bool,
    pub anomalies: AnomalyFlags,
    pub timestamp: DateTime<Utc>,
}

impl AnalysisResult {
    /// Result with nothing detected
    pub fn empty() -> Self {
        Self::from_detections(Vec::new(), AnomalyFlags::default())
    }

    /// Build a summary, deriving `count` and `crowd_alert` from the detections.
    pub fn from_detections(detections: Vec<Detection>, anomalies: AnomalyFlags) -> Self {
        let count = detections.iter().filter(|d| d.label == "person").count();
        Self {
            count,
            crowd_alert: count > CROWD_THRESHOLD,
            detections,
            anomalies,
            timestamp: Utc::now(),
        }
    }
}

/// Produces a detection summary for a camera's current frame.
///
/// Implementations may be slow or random; callers bound the wait.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, camera_id: &str) -> AnalysisResult;
}

/// Random detector standing in for a real vision model
pub struct SimulatedAnalyzer {
    detection_probability: f64,
    rng: Mutex<StdRng>,
}

impl SimulatedAnalyzer {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn with_rng(config: &AnalyzerConfig, rng: StdRng) -> Self {
        let p = config.detection_probability;
        Self {
            detection_probability: if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) },
            rng: Mutex::new(rng),
        }
    }

    fn sample(&self, hour: u32) -> AnalysisResult {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut detections = Vec::new();
        if rng.gen_bool(self.detection_probability) {
            detections.push(Detection {
                label: "person".to_string(),
                confidence: rng.gen_range(0.8..=0.99),
                bbox: [
                    rng.gen_range(0..=100),
                    rng.gen_range(0..=100),
                    rng.gen_range(0..=100),
                    rng.gen_range(0..=100),
                ],
            });
        }

        let is_night = hour > 20 || hour < 6;
        let anomalies = AnomalyFlags {
            motion_anomaly: rng.gen_bool(0.05),
            night_activity: is_night && rng.gen_bool(0.2),
            confidence: rng.gen_range(0.7..=0.9),
        };

        AnalysisResult::from_detections(detections, anomalies)
    }
}

#[async_trait]
impl Analyzer for SimulatedAnalyzer {
    async fn analyze(&self, _camera_id: &str) -> AnalysisResult {
        self.sample(Local::now().hour())
    }
}
