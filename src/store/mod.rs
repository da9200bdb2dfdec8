//! Durable incident and camera storage.

use crate::incident::{Incident, IncidentStatus, NewIncident, Severity};
use anyhow::Result;
use async_trait::async_trait;

mod seed;
mod sqlite;

pub use seed::seed_demo_data;
pub use sqlite::SqliteStore;

/// Default page size for incident listings
pub const DEFAULT_LIST_LIMIT: usize = 100;
/// Largest page size a caller may ask for
pub const MAX_LIST_LIMIT: usize = 500;

/// Filter for incident listings (newest first)
#[derive(Debug, Clone, PartialEq)]
pub struct IncidentFilter {
    pub status: Option<IncidentStatus>,
    pub severity: Option<Severity>,
    pub limit: usize,
}

impl Default for IncidentFilter {
    fn default() -> Self {
        Self {
            status: None,
            severity: None,
            limit: DEFAULT_LIST_LIMIT,
        }
    }
}

/// Source of truth for incident records.
///
/// `insert` returns the record as stored, including the generated `id`
/// and `created_at`. Implementations serialize their own writes.
#[async_trait]
pub trait IncidentStore: Send + Sync {
    async fn insert(&self, incident: NewIncident) -> Result<Incident>;

    async fn get(&self, id: i64) -> Result<Option<Incident>>;

    async fn list(&self, filter: &IncidentFilter) -> Result<Vec<Incident>>;

    /// Returns `None` if no incident has this id.
    async fn update_status(&self, id: i64, status: IncidentStatus) -> Result<Option<Incident>>;
}
