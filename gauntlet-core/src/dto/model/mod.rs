//! Model registry DTOs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Request to register a new model version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterModel {
    pub name: String,
    /// Path of the artifact to upload
    pub path: String,
    pub description: Option<String>,
    pub tags: HashMap<String, String>,
}
