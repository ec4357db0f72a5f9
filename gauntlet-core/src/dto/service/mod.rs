//! Inference service DTOs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Request to deploy an image as a REST service on a cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployService {
    pub name: String,
    pub image_id: String,
    pub compute_name: String,
    pub description: Option<String>,
    pub tags: HashMap<String, String>,
}

/// In-place settings update for a live service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateService {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_app_insights: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collect_model_data: Option<bool>,
}

impl UpdateService {
    /// Turn on request telemetry and model data collection
    pub fn enable_monitoring() -> Self {
        Self {
            enable_app_insights: Some(true),
            collect_model_data: Some(true),
        }
    }
}
