//! Model registry domain types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tag holding the id of the run that produced a model
pub const RUN_ID_TAG: &str = "run_id";
/// Tag holding the CI build number that produced a model
pub const BUILD_NUMBER_TAG: &str = "build_number";
/// Tag holding the model family (e.g. "classification")
pub const TYPE_TAG: &str = "type";

/// Registered model version
///
/// Created at registration time and immutable afterwards. A newer
/// registration under the same name supersedes it without deleting it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    /// Platform identifier, conventionally `<name>:<version>`
    pub id: String,
    pub name: String,
    pub version: u32,
    /// Storage path of the model artifact
    pub path: String,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl ModelRecord {
    /// Id of the run that trained this model, if it was tagged
    pub fn run_id(&self) -> Option<&str> {
        self.tags.get(RUN_ID_TAG).map(String::as_str)
    }
}

/// A model version together with the accuracy its training run reported
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredModel {
    pub record: ModelRecord,
    /// `None` when the run or its `acc` metric could not be read
    pub accuracy: Option<f64>,
}

/// Select the newest model by creation time
pub fn newest(models: &[ModelRecord]) -> Option<&ModelRecord> {
    models.iter().max_by_key(|m| (m.created_at, m.version))
}
