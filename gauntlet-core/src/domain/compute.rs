//! Compute target domain types

use serde::{Deserialize, Serialize};

/// VM size used when provisioning training compute
pub const DEFAULT_TRAINING_VM_SIZE: &str = "STANDARD_D12_V2";
pub const DEFAULT_TRAINING_MIN_NODES: u32 = 1;
pub const DEFAULT_TRAINING_MAX_NODES: u32 = 4;

/// A compute cluster attached to the workspace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeTarget {
    pub name: String,
    pub kind: ComputeKind,
    pub location: Option<String>,
    pub vm_size: Option<String>,
    pub min_nodes: u32,
    pub max_nodes: u32,
    pub provisioning_state: ProvisioningState,
    #[serde(default)]
    pub provisioning_errors: Vec<String>,
}

/// What the cluster is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComputeKind {
    /// Managed batch compute running pipeline steps
    Training,
    /// Managed Kubernetes cluster hosting inference services
    Inference,
}

/// Cluster provisioning state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProvisioningState {
    Creating,
    Succeeded,
    Failed,
    Canceled,
}
