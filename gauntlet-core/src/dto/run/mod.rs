//! Run tracking DTOs

use serde::{Deserialize, Serialize};

use crate::domain::run::RunStatus;

/// Request to start a run in an experiment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRun {
    pub experiment: String,
}

/// Metric value logged against a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogMetric {
    pub name: String,
    pub value: f64,
}

/// Final status update for a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteRun {
    pub status: RunStatus,
}
