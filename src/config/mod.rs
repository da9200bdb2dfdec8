use crate::incident::{IncidentType, Severity};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;

/// Complete Watchpost configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WatchpostConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    #[serde(default)]
    pub seed: SeedConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Origins allowed by the CORS layer
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:5000".to_string()]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            cors_origins: default_cors_origins(),
        }
    }
}

/// SQLite database location
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// File path, or ":memory:"
    #[serde(default = "default_database_path")]
    pub path: String,
}

fn default_database_path() -> String {
    "watchpost.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Named base point incidents are placed around
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(name: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.to_string(),
            latitude,
            longitude,
        }
    }
}

/// Relative weight per severity
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeverityWeights {
    #[serde(default)]
    pub low: u32,
    #[serde(default)]
    pub medium: u32,
    #[serde(default)]
    pub high: u32,
    #[serde(default)]
    pub critical: u32,
}

impl SeverityWeights {
    pub fn entries(&self) -> [(Severity, u32); 4] {
        [
            (Severity::Low, self.low),
            (Severity::Medium, self.medium),
            (Severity::High, self.high),
            (Severity::Critical, self.critical),
        ]
    }
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self {
            low: 4,
            medium: 3,
            high: 2,
            critical: 1,
        }
    }
}

/// Relative weight per incident type
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TypeWeights {
    #[serde(default)]
    pub crowd_detection: u32,
    #[serde(default)]
    pub person_detection: u32,
    #[serde(default)]
    pub motion_anomaly: u32,
    #[serde(default)]
    pub night_activity: u32,
    #[serde(default)]
    pub restricted_area: u32,
}

impl TypeWeights {
    pub fn entries(&self) -> [(IncidentType, u32); 5] {
        [
            (IncidentType::CrowdDetection, self.crowd_detection),
            (IncidentType::PersonDetection, self.person_detection),
            (IncidentType::MotionAnomaly, self.motion_anomaly),
            (IncidentType::NightActivity, self.night_activity),
            (IncidentType::RestrictedArea, self.restricted_area),
        ]
    }
}

impl Default for TypeWeights {
    fn default() -> Self {
        // Restricted-area incidents only come from operators, not the simulator
        Self {
            crowd_detection: 1,
            person_detection: 1,
            motion_anomaly: 1,
            night_activity: 1,
            restricted_area: 0,
        }
    }
}

/// Background incident generator settings
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_generator_enabled")]
    pub enabled: bool,
    /// Delay before the first cycle
    #[serde(default = "default_warmup_secs")]
    pub warmup_secs: u64,
    /// Steady-state delay bounds (inclusive, whole seconds)
    #[serde(default = "default_min_interval_secs")]
    pub min_interval_secs: u64,
    #[serde(default = "default_max_interval_secs")]
    pub max_interval_secs: u64,
    /// Max absolute coordinate offset applied to each axis
    #[serde(default = "default_jitter_degrees")]
    pub jitter_degrees: f64,
    /// Camera ids are drawn from CAM-001..=CAM-{camera_count}
    #[serde(default = "default_camera_count")]
    pub camera_count: u32,
    #[serde(default)]
    pub severity_weights: SeverityWeights,
    #[serde(default)]
    pub type_weights: TypeWeights,
    #[serde(default = "default_locations")]
    pub locations: Vec<Location>,
}

fn default_generator_enabled() -> bool {
    true
}

fn default_warmup_secs() -> u64 {
    30
}

fn default_min_interval_secs() -> u64 {
    45
}

fn default_max_interval_secs() -> u64 {
    120
}

fn default_jitter_degrees() -> f64 {
    0.01
}

fn default_camera_count() -> u32 {
    8
}

fn default_locations() -> Vec<Location> {
    vec![
        Location::new("Ring Road", 6.3350, 5.6037),
        Location::new("Sapele Road", 6.3180, 5.6120),
        Location::new("Airport Road", 6.3050, 5.5990),
        Location::new("New Benin", 6.3420, 5.6280),
        Location::new("GRA", 6.3290, 5.6350),
    ]
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            enabled: default_generator_enabled(),
            warmup_secs: default_warmup_secs(),
            min_interval_secs: default_min_interval_secs(),
            max_interval_secs: default_max_interval_secs(),
            jitter_degrees: default_jitter_degrees(),
            camera_count: default_camera_count(),
            severity_weights: SeverityWeights::default(),
            type_weights: TypeWeights::default(),
            locations: default_locations(),
        }
    }
}

impl GeneratorConfig {
    /// Reject settings the generator cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.locations.is_empty() {
            return Err(ConfigError::NoLocations);
        }
        if self.min_interval_secs > self.max_interval_secs {
            return Err(ConfigError::InvalidInterval {
                min: self.min_interval_secs,
                max: self.max_interval_secs,
            });
        }
        if !self.jitter_degrees.is_finite() || self.jitter_degrees < 0.0 {
            return Err(ConfigError::InvalidJitter(self.jitter_degrees));
        }
        if self.camera_count == 0 {
            return Err(ConfigError::NoCameras);
        }
        if let Some(bad) = self
            .locations
            .iter()
            .find(|l| !l.latitude.is_finite() || !l.longitude.is_finite())
        {
            return Err(ConfigError::InvalidCoordinates(bad.name.clone()));
        }
        check_weights("severity_weights", self.severity_weights.entries().map(|(_, w)| w))?;
        check_weights("type_weights", self.type_weights.entries().map(|(_, w)| w))?;
        Ok(())
    }
}

/// A weight table must have a non-zero entry and a total that fits in `u32`
fn check_weights<const N: usize>(
    table: &'static str,
    weights: [u32; N],
) -> Result<(), ConfigError> {
    let total = weights
        .iter()
        .try_fold(0u32, |acc, w| acc.checked_add(*w))
        .ok_or(ConfigError::WeightOverflow(table))?;
    if total == 0 {
        return Err(ConfigError::ZeroWeights(table));
    }
    Ok(())
}

/// Simulated analyzer settings
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzerConfig {
    /// Chance that a frame contains a person detection
    #[serde(default = "default_detection_probability")]
    pub detection_probability: f64,
    /// Max wait for one analysis before the generator gives up on it
    #[serde(default = "default_analyzer_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_detection_probability() -> f64 {
    0.3
}

fn default_analyzer_timeout_ms() -> u64 {
    2000
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            detection_probability: default_detection_probability(),
            timeout_ms: default_analyzer_timeout_ms(),
        }
    }
}

/// Demo data seeding
#[derive(Debug, Clone, Deserialize)]
pub struct SeedConfig {
    #[serde(default = "default_seed_enabled")]
    pub enabled: bool,
}

fn default_seed_enabled() -> bool {
    true
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            enabled: default_seed_enabled(),
        }
    }
}

impl WatchpostConfig {
    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`, ignoring empty values and values that
    /// fail to parse.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("WATCHPOST_BIND_ADDR") {
            if !v.is_empty() {
                self.server.bind_addr = v;
            }
        }
        if let Some(v) = lookup("WATCHPOST_DATABASE_PATH") {
            if !v.is_empty() {
                self.database.path = v;
            }
        }
        if let Some(v) = lookup("WATCHPOST_GENERATOR_ENABLED") {
            if let Ok(b) = v.parse::<bool>() {
                self.generator.enabled = b;
            }
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<WatchpostConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path))?;
    let config: WatchpostConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path))?;
    Ok(config)
}

/// Invalid generator settings
#[derive(Debug, PartialEq)]
pub enum ConfigError {
    NoLocations,
    InvalidInterval { min: u64, max: u64 },
    InvalidJitter(f64),
    NoCameras,
    /// Location (by name) with a NaN or infinite coordinate
    InvalidCoordinates(String),
    ZeroWeights(&'static str),
    /// Weight table whose total does not fit in `u32`
    WeightOverflow(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoLocations => write!(f, "generator needs at least one location"),
            ConfigError::InvalidInterval { min, max } => write!(
                f,
                "min_interval_secs ({}) is greater than max_interval_secs ({})",
                min, max
            ),
            ConfigError::InvalidJitter(j) => {
                write!(f, "jitter_degrees must be finite and >= 0, got {}", j)
            }
            ConfigError::NoCameras => write!(f, "camera_count must be at least 1"),
            ConfigError::InvalidCoordinates(name) => {
                write!(f, "location '{}' has a non-finite coordinate", name)
            }
            ConfigError::ZeroWeights(table) => {
                write!(f, "{} must contain a non-zero weight", table)
            }
            ConfigError::WeightOverflow(table) => {
                write!(f, "{} weights sum past {}", table, u32::MAX)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = WatchpostConfig::default();
        assert_eq!(config.server.bind_addr, "0.0.0.0:8000");
        assert_eq!(config.database.path, "watchpost.db");
        assert_eq!(config.generator.warmup_secs, 30);
        assert_eq!(config.generator.min_interval_secs, 45);
        assert_eq!(config.generator.max_interval_secs, 120);
        assert_eq!(config.generator.locations.len(), 5);
        assert_eq!(config.generator.severity_weights.low, 4);
        assert_eq!(config.generator.type_weights.restricted_area, 0);
        assert_eq!(config.analyzer.timeout_ms, 2000);
        assert!(config.seed.enabled);
        assert!(config.generator.validate().is_ok());
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
            [server]
            bind_addr = "127.0.0.1:9000"
            cors_origins = ["http://example.com"]

            [database]
            path = ":memory:"

            [generator]
            warmup_secs = 0
            min_interval_secs = 1
            max_interval_secs = 1
            jitter_degrees = 0.0
            severity_weights = { low = 1, critical = 1 }

            [[generator.locations]]
            name = "Depot"
            latitude = 1.5
            longitude = -2.25

            [seed]
            enabled = false
        "#;

        let config: WatchpostConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.server.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.server.cors_origins, vec!["http://example.com"]);
        assert_eq!(config.database.path, ":memory:");
        assert_eq!(config.generator.warmup_secs, 0);
        assert_eq!(config.generator.severity_weights.medium, 0);
        assert_eq!(config.generator.severity_weights.critical, 1);
        assert_eq!(config.generator.locations, vec![Location::new("Depot", 1.5, -2.25)]);
        assert!(!config.seed.enabled);
        assert!(config.generator.validate().is_ok());
    }

    #[test]
    fn test_partial_config() {
        let toml = r#"
            [analyzer]
            detection_probability = 0.9
        "#;

        let config: WatchpostConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.analyzer.detection_probability, 0.9);
        assert_eq!(config.analyzer.timeout_ms, 2000); // Default
        assert_eq!(config.generator.max_interval_secs, 120); // Default
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[generator]\nenabled = false").unwrap();

        let config = load_config(file.path().to_str().unwrap()).unwrap();
        assert!(!config.generator.enabled);

        assert!(load_config("/nonexistent/watchpost.toml").is_err());
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let mut config = GeneratorConfig::default();
        config.min_interval_secs = 10;
        config.max_interval_secs = 5;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidInterval { min: 10, max: 5 })
        );

        let mut config = GeneratorConfig::default();
        config.locations.clear();
        assert_eq!(config.validate(), Err(ConfigError::NoLocations));

        let mut config = GeneratorConfig::default();
        config.jitter_degrees = -0.1;
        assert!(config.validate().is_err());

        let mut config = GeneratorConfig::default();
        config.severity_weights = SeverityWeights {
            low: 0,
            medium: 0,
            high: 0,
            critical: 0,
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroWeights("severity_weights")));

        let mut config = GeneratorConfig::default();
        config.camera_count = 0;
        assert_eq!(config.validate(), Err(ConfigError::NoCameras));
    }

    #[test]
    fn test_validate_rejects_overflowing_weights() {
        let mut config = GeneratorConfig::default();
        config.severity_weights = SeverityWeights {
            low: u32::MAX,
            medium: 1,
            high: 0,
            critical: 0,
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::WeightOverflow("severity_weights"))
        );

        let mut config = GeneratorConfig::default();
        config.type_weights.crowd_detection = u32::MAX;
        assert_eq!(config.validate(), Err(ConfigError::WeightOverflow("type_weights")));

        // Exactly u32::MAX in total is fine
        let mut config = GeneratorConfig::default();
        config.severity_weights = SeverityWeights {
            low: u32::MAX - 1,
            medium: 1,
            high: 0,
            critical: 0,
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_finite_coordinates() {
        let mut config = GeneratorConfig::default();
        config.locations.push(Location::new("Bad", f64::NAN, 1.0));
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidCoordinates("Bad".to_string()))
        );

        let mut config = GeneratorConfig::default();
        config.locations = vec![Location::new("Edge", 6.3, f64::INFINITY)];
        assert!(matches!(config.validate(), Err(ConfigError::InvalidCoordinates(_))));
    }

    #[test]
    fn test_toml_nan_coordinate_rejected() {
        let toml = r#"
            [[generator.locations]]
            name = "Nowhere"
            latitude = nan
            longitude = 5.6
        "#;

        let config: WatchpostConfig = toml::from_str(toml).unwrap();
        let err = config.generator.validate().unwrap_err();
        assert_eq!(err.to_string(), "location 'Nowhere' has a non-finite coordinate");
    }

    #[test]
    fn test_apply_overrides() {
        let vars: std::collections::HashMap<&str, &str> = [
            ("WATCHPOST_BIND_ADDR", "127.0.0.1:8123"),
            ("WATCHPOST_DATABASE_PATH", "/tmp/override.db"),
            ("WATCHPOST_GENERATOR_ENABLED", "false"),
        ]
        .into_iter()
        .collect();

        let mut config = WatchpostConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.bind_addr, "127.0.0.1:8123");
        assert_eq!(config.database.path, "/tmp/override.db");
        assert!(!config.generator.enabled);
    }

    #[test]
    fn test_apply_overrides_ignores_bad_values() {
        let mut config = WatchpostConfig::default();
        config.apply_overrides(|key| match key {
            "WATCHPOST_BIND_ADDR" => Some(String::new()),
            "WATCHPOST_GENERATOR_ENABLED" => Some("sometimes".to_string()),
            _ => None,
        });

        assert_eq!(config.server.bind_addr, "0.0.0.0:8000");
        assert_eq!(config.database.path, "watchpost.db");
        assert!(config.generator.enabled);
    }

    // Only test in the crate that touches these process variables
    #[test]
    fn test_apply_env_reads_process_environment() {
        std::env::set_var("WATCHPOST_BIND_ADDR", "127.0.0.1:9911");
        std::env::set_var("WATCHPOST_DATABASE_PATH", ":memory:");
        std::env::set_var("WATCHPOST_GENERATOR_ENABLED", "not-a-bool");

        let mut config = WatchpostConfig::default();
        config.apply_env();

        std::env::remove_var("WATCHPOST_BIND_ADDR");
        std::env::remove_var("WATCHPOST_DATABASE_PATH");
        std::env::remove_var("WATCHPOST_GENERATOR_ENABLED");

        assert_eq!(config.server.bind_addr, "127.0.0.1:9911");
        assert_eq!(config.database.path, ":memory:");
        assert!(config.generator.enabled);
    }
}
