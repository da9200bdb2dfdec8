//! Background incident generator.
//!
//! One long-lived task: wait a randomized delay, analyze a camera, store
//! the resulting incident, then broadcast the stored record. Persist always
//! happens before publish, and no error ends the loop. Only shutdown does.

use crate::analyzer::{AnalysisResult, Analyzer};
use crate::config::{ConfigError, GeneratorConfig, Location};
use crate::event::RealtimeEvent;
use crate::hub::BroadcastHub;
use crate::incident::{Incident, IncidentStatus, IncidentType, NewIncident, Severity};
use crate::store::IncidentStore;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};


/// Confidence used when the analyzer reports no detections
pub const FALLBACK_CONFIDENCE: f64 = 0.8;

const DEFAULT_ANALYZER_TIMEOUT: Duration = Duration::from_secs(2);

/// Confidence of the first detection, or [`FALLBACK_CONFIDENCE`].
pub fn confidence_from(analysis: &AnalysisResult) -> f64 {
    analysis
        .detections
        .first()
        .map(|d| d.confidence)
        .unwrap_or(FALLBACK_CONFIDENCE)
}

/// Why a generation cycle did not publish
#[derive(Debug)]
pub enum CycleError {
    /// Store rejected the write; the incident never existed
    Persist(anyhow::Error),
    /// Incident was stored but could not be serialized for broadcast
    Publish {
        incident: Incident,
        source: serde_json::Error,
    },
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleError::Persist(e) => write!(f, "failed to persist incident: {:#}", e),
            CycleError::Publish { incident, source } => write!(
                f,
                "incident {} stored but not broadcast: {}",
                incident.id, source
            ),
        }
    }
}

impl std::error::Error for CycleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CycleError::Persist(e) => Some(&**e),
            CycleError::Publish { source, .. } => Some(source),
        }
    }
}

/// Periodically fabricates, stores and publishes incidents
pub struct IncidentGenerator {
    config: GeneratorConfig,
    analyzer: Arc<dyn Analyzer>,
    analyzer_timeout: Duration,
    store: Arc<dyn IncidentStore>,
    hub: Arc<BroadcastHub>,
    rng: StdRng,
    severity_dist: WeightedIndex<u32>,
    type_dist: WeightedIndex<u32>,
}

impl IncidentGenerator {
    /// Create a generator. Fails if `config` does not validate.
    pub fn new(
        config: GeneratorConfig,
        analyzer: Arc<dyn Analyzer>,
        store: Arc<dyn IncidentStore>,
        hub: Arc<BroadcastHub>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let severity_dist = WeightedIndex::new(config.severity_weights.entries().map(|(_, w)| w))
            .map_err(|_| ConfigError::ZeroWeights("severity_weights"))?;
        let type_dist = WeightedIndex::new(config.type_weights.entries().map(|(_, w)| w))
            .map_err(|_| ConfigError::ZeroWeights("type_weights"))?;

        Ok(Self {
            config,
            analyzer,
            analyzer_timeout: DEFAULT_ANALYZER_TIMEOUT,
            store,
            hub,
            rng: StdRng::from_entropy(),
            severity_dist,
            type_dist,
        })
    }

    /// Replace the random source (deterministic runs)
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Bound on each analyzer call; a timed-out call counts as "nothing detected"
    pub fn with_analyzer_timeout(mut self, timeout: Duration) -> Self {
        self.analyzer_timeout = timeout;
        self
    }

    pub fn warmup(&self) -> Duration {
        Duration::from_secs(self.config.warmup_secs)
    }

    /// Steady-state delay, uniform in whole seconds over the configured range
    pub fn next_delay(&mut self) -> Duration {
        let secs = self
            .rng
            .gen_range(self.config.min_interval_secs..=self.config.max_interval_secs);
        Duration::from_secs(secs)
    }

    fn pick_camera(&mut self) -> String {
        format!("CAM-{:03}", self.rng.gen_range(1..=self.config.camera_count))
    }

    fn pick_location(&mut self) -> Location {
        let idx = self.rng.gen_range(0..self.config.locations.len());
        self.config.locations[idx].clone()
    }

    fn pick_type(&mut self) -> IncidentType {
        IncidentType::ALL[self.type_dist.sample(&mut self.rng)]
    }

    fn pick_severity(&mut self) -> Severity {
        Severity::ALL[self.severity_dist.sample(&mut self.rng)]
    }

    fn jitter(&mut self) -> f64 {
        let bound = self.config.jitter_degrees;
        if bound == 0.0 {
            return 0.0;
        }
        self.rng.gen_range(-bound..=bound)
    }

    /// Build the incident for one cycle from an analysis result.
    pub fn draft(&mut self, camera_id: String, analysis: &AnalysisResult) -> NewIncident {
        let location = self.pick_location();
        let incident_type = self.pick_type();
        let severity = self.pick_severity();
        let latitude = location.latitude + self.jitter();
        let longitude = location.longitude + self.jitter();

        NewIncident {
            incident_type,
            severity,
            description: format!(
                "{} detected at {}. AI Confidence: {} persons found.",
                incident_type.title(),
                location.name,
                analysis.count
            ),
            location: location.name,
            latitude,
            longitude,
            confidence: confidence_from(analysis),
            camera_id,
            status: IncidentStatus::Active,
        }
    }

    async fn analyze(&self, camera_id: &str) -> AnalysisResult {
        match tokio::time::timeout(self.analyzer_timeout, self.analyzer.analyze(camera_id)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    camera_id = %camera_id,
                    timeout_ms = self.analyzer_timeout.as_millis() as u64,
                    "Analyzer timed out, treating as no detections"
                );
                AnalysisResult::empty()
            }
        }
    }

    /// Run one analyze → persist → publish cycle.
    pub async fn run_cycle(&mut self) -> Result<Incident, CycleError> {
        let camera_id = self.pick_camera();
        let analysis = self.analyze(&camera_id).await;
        let draft = self.draft(camera_id, &analysis);

        let incident = self.store.insert(draft).await.map_err(CycleError::Persist)?;

        match self.hub.broadcast(&RealtimeEvent::from(&incident)) {
            Ok(report) => {
                info!(
                    id = incident.id,
                    incident_type = %incident.incident_type,
                    severity = %incident.severity,
                    location = %incident.location,
                    delivered = report.delivered,
                    dropped = report.dropped,
                    "Incident published"
                );
                Ok(incident)
            }
            Err(source) => Err(CycleError::Publish { incident, source }),
        }
    }

    /// Run until `shutdown` is cancelled.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            warmup_secs = self.config.warmup_secs,
            min_interval_secs = self.config.min_interval_secs,
            max_interval_secs = self.config.max_interval_secs,
            locations = self.config.locations.len(),
            "Starting incident generator"
        );

        let warmup = self.warmup();
        if !sleep_or_cancel(warmup, &shutdown).await {
            info!("Incident generator stopped during warm-up");
            return;
        }

        loop {
            let delay = self.next_delay();
            debug!(delay_secs = delay.as_secs(), "Waiting for next incident cycle");

            if !sleep_or_cancel(delay, &shutdown).await {
                break;
            }

            if let Err(e) = self.run_cycle().await {
                error!(error = %e, "Incident cycle failed");
            }
        }

        info!("Incident generator stopped");
    }

    /// Spawn [`run`](Self::run) on the tokio runtime.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

/// Sleep for `duration`; returns false if shutdown fired first.
async fn sleep_or_cancel(duration: Duration, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
