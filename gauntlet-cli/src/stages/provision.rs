//! Training compute provisioning stage

use anyhow::Result;
use gauntlet_core::domain::compute::ComputeTarget;
use gauntlet_core::dto::compute::CreateCompute;
use gauntlet_core::wait::{COMPUTE_PROVISIONING_TIMEOUT, wait_for_compute};
use tracing::info;

use crate::context::PipelineContext;

/// Outcome of provisioning
#[derive(Debug, Clone)]
pub struct ProvisionResult {
    pub compute: ComputeTarget,
    /// False when an existing target was reused
    pub created: bool,
}

/// Reuses the named training compute or creates it
///
/// New targets get the default training sizing and are awaited for at
/// most ten minutes.
pub async fn provision(ctx: &PipelineContext, compute_target: &str) -> Result<ProvisionResult> {
    let platform = ctx.platform.as_ref();

    match platform.get_compute(compute_target).await {
        Ok(compute) => {
            info!("Found existing compute target {}", compute.name);
            return Ok(ProvisionResult {
                compute,
                created: false,
            });
        }
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e.into()),
    }

    info!("Creating compute target {}", compute_target);
    platform
        .create_compute(CreateCompute::training(compute_target))
        .await?;

    let options = ctx.wait.with_timeout(COMPUTE_PROVISIONING_TIMEOUT);
    let compute = wait_for_compute(platform, compute_target, &options).await?;

    Ok(ProvisionResult {
        compute,
        created: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::testing::local_context;
    use gauntlet_core::domain::compute::{
        ComputeKind, DEFAULT_TRAINING_VM_SIZE, ProvisioningState,
    };
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_provision_creates_then_reuses() {
        let dir = TempDir::new().unwrap();
        let ctx = local_context(&dir);

        let first = provision(&ctx, "cpu-cluster").await.unwrap();
        assert!(first.created);
        assert_eq!(first.compute.kind, ComputeKind::Training);
        assert_eq!(
            first.compute.vm_size.as_deref(),
            Some(DEFAULT_TRAINING_VM_SIZE)
        );
        assert_eq!((first.compute.min_nodes, first.compute.max_nodes), (1, 4));
        assert_eq!(
            first.compute.provisioning_state,
            ProvisioningState::Succeeded
        );

        let second = provision(&ctx, "cpu-cluster").await.unwrap();
        assert!(!second.created);
        assert_eq!(ctx.platform.list_compute().await.unwrap().len(), 1);
    }
}
