//! Compute provisioning DTOs

use serde::{Deserialize, Serialize};

use crate::domain::compute::{
    ComputeKind, DEFAULT_TRAINING_MAX_NODES, DEFAULT_TRAINING_MIN_NODES, DEFAULT_TRAINING_VM_SIZE,
};

/// Request to provision a compute cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCompute {
    pub name: String,
    pub kind: ComputeKind,
    pub location: Option<String>,
    pub vm_size: Option<String>,
    pub min_nodes: u32,
    pub max_nodes: u32,
}

impl CreateCompute {
    /// Training cluster with the default sizing
    pub fn training(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ComputeKind::Training,
            location: None,
            vm_size: Some(DEFAULT_TRAINING_VM_SIZE.to_string()),
            min_nodes: DEFAULT_TRAINING_MIN_NODES,
            max_nodes: DEFAULT_TRAINING_MAX_NODES,
        }
    }

    /// Inference cluster in the given region, platform-default sizing
    pub fn inference(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ComputeKind::Inference,
            location: Some(location.into()),
            vm_size: None,
            min_nodes: 0,
            max_nodes: 0,
        }
    }
}
