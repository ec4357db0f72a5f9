//! Inference service domain types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::model::ModelRecord;

/// Service tag holding the id of the image the service was deployed from
pub const IMAGE_ID_TAG: &str = "image_id";
/// Service tag holding the name of the hosting cluster
pub const CLUSTER_NAME_TAG: &str = "name";

/// A REST inference service hosted on the platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub name: String,
    pub image_id: String,
    pub compute_name: String,
    pub scoring_uri: Option<String>,
    pub state: ServiceState,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub app_insights_enabled: bool,
    #[serde(default)]
    pub collect_model_data: bool,
    /// Deployment failure detail, present when `state` is `Failed`
    pub error: Option<String>,
}

impl ServiceRecord {
    /// Image id recorded in the service tags at deployment time
    pub fn tagged_image_id(&self) -> Option<&str> {
        self.tags.get(IMAGE_ID_TAG).map(String::as_str)
    }
}

/// Service deployment state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceState {
    Transitioning,
    Healthy,
    Unhealthy,
    Failed,
}

/// Authentication keys of a deployed service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceKeys {
    pub primary_key: String,
    pub secondary_key: String,
}

/// The model currently served by a live service, with its accuracy
///
/// Exists only while the service is live. A redeploy replaces it wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentRecord {
    pub service_name: String,
    pub image_id: String,
    pub model: ModelRecord,
    pub accuracy: f64,
}
