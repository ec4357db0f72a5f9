//! Container image domain types

use serde::{Deserialize, Serialize};

/// Container image built around one or more registered models
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: String,
    pub name: String,
    /// Ids of the models packaged into the image, in registration order
    pub model_ids: Vec<String>,
    pub state: ImageState,
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Build failure detail, present when `state` is `Failed`
    pub error: Option<String>,
}

impl ImageRecord {
    /// Id of the primary (first) packaged model
    pub fn primary_model_id(&self) -> Option<&str> {
        self.model_ids.first().map(String::as_str)
    }
}

/// Image build state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageState {
    Running,
    Succeeded,
    Failed,
}
