//! Deploy stage
//!
//! Acts on the relayed hand-off record. A missing, unreadable or "skip"
//! record ends the stage before the platform is contacted. Otherwise the
//! old service is torn down, the inference cluster is ensured and the new
//! image is deployed with monitoring enabled.

use anyhow::{Context, Result};
use gauntlet_core::domain::compute::ComputeTarget;
use gauntlet_core::domain::service::{CLUSTER_NAME_TAG, IMAGE_ID_TAG, ServiceRecord};
use gauntlet_core::dto::compute::CreateCompute;
use gauntlet_core::dto::service::{DeployService, UpdateService};
use gauntlet_core::handoff::{
    HandoffStatus, SERVICE_DESCRIPTOR_FILE, ServiceDescriptor, read_handoff, write_descriptor,
};
use gauntlet_core::wait::{COMPUTE_PROVISIONING_TIMEOUT, wait_for_compute, wait_for_deployment};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::context::PipelineContext;

/// Arguments of the deploy stage
#[derive(Debug, Clone)]
pub struct DeployArgs {
    pub service_name: String,
    pub aks_name: String,
    pub aks_region: String,
    pub description: String,
    /// Directory receiving the service descriptor
    pub outputs_dir: PathBuf,
}

/// Why the deploy stage did nothing
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The hand-off record could not be read
    NoHandoff { path: PathBuf, error: String },
    /// The gate decided against deployment
    GateDeclined { model_name: String, model_version: u32 },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoHandoff { path, error } => {
                write!(f, "cannot open {}: {}", path.display(), error)
            }
            SkipReason::GateDeclined {
                model_name,
                model_version,
            } => write!(
                f,
                "{} version {} did not beat the deployed model",
                model_name, model_version
            ),
        }
    }
}

/// Result of reading the hand-off record
#[derive(Debug, Clone)]
pub enum DeployCheck {
    Skip(SkipReason),
    Deploy(HandoffStatus),
}

/// Outcome of the deploy stage
#[derive(Debug, Clone)]
pub enum DeployResult {
    Deployed {
        service: ServiceRecord,
        descriptor: ServiceDescriptor,
        descriptor_path: PathBuf,
        /// Whether the inference cluster had to be created
        cluster_created: bool,
    },
    Skipped(SkipReason),
}

/// Decides from the hand-off record alone whether to deploy
pub fn check_handoff(path: &Path) -> DeployCheck {
    let status = match read_handoff(path) {
        Ok(status) => status,
        Err(e) => {
            info!("Cannot open hand-off record {}: {}", path.display(), e);
            return DeployCheck::Skip(SkipReason::NoHandoff {
                path: path.to_path_buf(),
                error: e.to_string(),
            });
        }
    };

    if !status.deploy_model_bool {
        info!(
            "Model {} version {} did not meet the accuracy criteria",
            status.model_name, status.model_version
        );
        return DeployCheck::Skip(SkipReason::GateDeclined {
            model_name: status.model_name,
            model_version: status.model_version,
        });
    }

    DeployCheck::Deploy(status)
}

/// Replaces the named service with one serving the hand-off's image
pub async fn deploy(
    ctx: &PipelineContext,
    handoff: &HandoffStatus,
    args: &DeployArgs,
) -> Result<DeployResult> {
    let platform = ctx.platform.as_ref();

    let image = platform
        .get_image(&handoff.image_id)
        .await
        .with_context(|| format!("Image {} is unavailable", handoff.image_id))?;
    info!("Deploying image {}", image.id);

    teardown(ctx, &args.service_name).await;

    let (cluster, cluster_created) = ensure_cluster(ctx, &args.aks_name, &args.aks_region).await?;

    let tags = HashMap::from([
        (CLUSTER_NAME_TAG.to_string(), args.aks_name.clone()),
        (IMAGE_ID_TAG.to_string(), image.id.clone()),
    ]);
    platform
        .deploy_service(DeployService {
            name: args.service_name.clone(),
            image_id: image.id.clone(),
            compute_name: cluster.name.clone(),
            description: Some(args.description.clone()),
            tags,
        })
        .await?;
    let service = wait_for_deployment(platform, &args.service_name, &ctx.wait).await?;
    info!("Service {} is {:?}", service.name, service.state);

    let keys = platform.get_keys(&service.name).await?;
    let descriptor = ServiceDescriptor {
        service_name: service.name.clone(),
        service_url: service.scoring_uri.clone().unwrap_or_default(),
        api_key: keys.primary_key,
    };

    let service = platform
        .update_service(&service.name, UpdateService::enable_monitoring())
        .await?;
    info!("Enabled monitoring on {}", service.name);

    let descriptor_path = args.outputs_dir.join(SERVICE_DESCRIPTOR_FILE);
    write_descriptor(&descriptor_path, &descriptor)?;

    Ok(DeployResult::Deployed {
        service,
        descriptor,
        descriptor_path,
        cluster_created,
    })
}

/// Deletes the service if it exists; failures are logged and ignored
async fn teardown(ctx: &PipelineContext, service_name: &str) {
    match ctx.platform.delete_service(service_name).await {
        Ok(()) => info!("Deleted existing service {}", service_name),
        Err(e) if e.is_not_found() => info!("No existing service {}", service_name),
        Err(e) => warn!("Could not delete service {}: {}", service_name, e),
    }
}

async fn ensure_cluster(
    ctx: &PipelineContext,
    name: &str,
    region: &str,
) -> Result<(ComputeTarget, bool)> {
    let platform = ctx.platform.as_ref();

    match platform.get_compute(name).await {
        Ok(cluster) => {
            info!("Using inference cluster {}", cluster.name);
            return Ok((cluster, false));
        }
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e.into()),
    }

    info!("Creating inference cluster {} in {}", name, region);
    platform
        .create_compute(CreateCompute::inference(name, region))
        .await?;
    let options = ctx.wait.with_timeout(COMPUTE_PROVISIONING_TIMEOUT);
    let cluster = wait_for_compute(platform, name, &options).await?;
    Ok((cluster, true))
}
