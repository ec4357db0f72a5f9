//! Experiment run domain types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metric name under which training runs report accuracy
pub const ACCURACY_METRIC: &str = "acc";

/// A tracked experiment run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: String,
    pub experiment: String,
    pub status: RunStatus,
    #[serde(default)]
    pub metrics: HashMap<String, f64>,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Run lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}
