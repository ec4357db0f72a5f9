//! Champion/challenger promotion gate
//!
//! Decides whether a freshly registered model should replace the model
//! behind the live inference service. The challenger is promoted when
//! there is no champion, when the champion cannot be identified, or when the
//! challenger's accuracy is strictly higher. Ties keep the champion.
//!
//! Resolving the champion walks service -> `image_id` tag -> image -> first
//! packaged model -> `run_id` tag -> `acc` metric. Any broken link makes the
//! champion unresolved, which [`GatePolicy::fail_open`] treats as absent.

use std::fmt;

use tracing::{info, warn};

use crate::domain::model::{ModelRecord, ScoredModel};
use crate::domain::run::ACCURACY_METRIC;
use crate::domain::service::{DeploymentRecord, ServiceRecord};
use crate::error::PlatformResult;
use crate::platform::{ImageService, ModelRegistry, RunTracker, ServiceHost};

/// What is currently deployed for a model name
#[derive(Debug, Clone, PartialEq)]
pub enum PreviousDeployment {
    /// No live service serves this model
    Absent,
    /// A service is live but its model or accuracy could not be determined
    Unresolved { service_name: String, reason: String },
    /// The live model and its accuracy
    Resolved(DeploymentRecord),
}

impl PreviousDeployment {
    /// The resolved deployment, if any
    pub fn into_record(self) -> Option<DeploymentRecord> {
        match self {
            PreviousDeployment::Resolved(record) => Some(record),
            _ => None,
        }
    }
}

/// Why the gate decided what it did
#[derive(Debug, Clone, PartialEq)]
pub enum GateReason {
    /// Nothing deployed for this model yet
    NoPreviousDeployment,
    /// A service is live but its model could not be resolved
    PreviousUnresolved,
    /// Challenger accuracy strictly exceeds the champion's
    Outperforms { candidate: f64, deployed: f64 },
    /// Challenger accuracy is equal, lower, or unknown
    DoesNotOutperform { candidate: Option<f64>, deployed: f64 },
}

impl fmt::Display for GateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateReason::NoPreviousDeployment => write!(f, "no previously deployed model"),
            GateReason::PreviousUnresolved => {
                write!(f, "previously deployed model could not be resolved")
            }
            GateReason::Outperforms {
                candidate,
                deployed,
            } => write!(
                f,
                "accuracy {} beats deployed accuracy {}",
                candidate, deployed
            ),
            GateReason::DoesNotOutperform {
                candidate: Some(candidate),
                deployed,
            } => write!(
                f,
                "accuracy {} does not beat deployed accuracy {}",
                candidate, deployed
            ),
            GateReason::DoesNotOutperform {
                candidate: None,
                deployed,
            } => write!(
                f,
                "candidate reported no accuracy; deployed accuracy is {}",
                deployed
            ),
        }
    }
}

/// Outcome of the promotion gate
#[derive(Debug, Clone, PartialEq)]
pub struct GateDecision {
    pub deploy: bool,
    pub reason: GateReason,
}

impl GateDecision {
    fn deploy(reason: GateReason) -> Self {
        Self {
            deploy: true,
            reason,
        }
    }

    fn skip(reason: GateReason) -> Self {
        Self {
            deploy: false,
            reason,
        }
    }
}

/// How the gate treats a live service it cannot resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatePolicy {
    /// Promote the challenger when the champion is unresolved
    pub deploy_when_unresolved: bool,
}

impl GatePolicy {
    /// Ambiguous history always favours the newest model
    pub const fn fail_open() -> Self {
        Self {
            deploy_when_unresolved: true,
        }
    }

    /// Applies the policy to a challenger accuracy and the current deployment
    pub fn evaluate(&self, candidate: Option<f64>, previous: &PreviousDeployment) -> GateDecision {
        match previous {
            PreviousDeployment::Absent => GateDecision::deploy(GateReason::NoPreviousDeployment),
            PreviousDeployment::Unresolved { .. } => {
                if self.deploy_when_unresolved {
                    GateDecision::deploy(GateReason::PreviousUnresolved)
                } else {
                    GateDecision::skip(GateReason::PreviousUnresolved)
                }
            }
            PreviousDeployment::Resolved(record) => compare(candidate, record.accuracy),
        }
    }
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self::fail_open()
    }
}

fn compare(candidate: Option<f64>, deployed: f64) -> GateDecision {
    match candidate {
        Some(candidate) if candidate > deployed => {
            GateDecision::deploy(GateReason::Outperforms {
                candidate,
                deployed,
            })
        }
        candidate => GateDecision::skip(GateReason::DoesNotOutperform {
            candidate,
            deployed,
        }),
    }
}

/// Decides with the default fail-open policy
///
/// `previous` is `None` both when nothing is deployed and when the
/// deployment could not be resolved; either way the challenger is promoted.
pub fn decide(candidate: Option<f64>, previous: Option<&DeploymentRecord>) -> GateDecision {
    match previous {
        None => GateDecision::deploy(GateReason::NoPreviousDeployment),
        Some(record) => compare(candidate, record.accuracy),
    }
}

/// Reads the accuracy metric a model's training run reported
///
/// Returns `Ok(None)` when the model has no `run_id` tag or the run has no
/// `acc` metric. Platform failures propagate.
pub async fn model_accuracy<P>(platform: &P, run_id: Option<&str>) -> PlatformResult<Option<f64>>
where
    P: RunTracker + ?Sized,
{
    let Some(run_id) = run_id else {
        return Ok(None);
    };
    let metrics = platform.get_metrics(run_id).await?;
    Ok(metrics.get(ACCURACY_METRIC).copied())
}

/// Looks up the live deployment serving `model_name`
///
/// Listing services is a hard dependency: if it fails the error propagates.
/// Every later lookup failure degrades to [`PreviousDeployment::Unresolved`].
pub async fn lookup_previous_deployment<P>(
    platform: &P,
    model_name: &str,
) -> PlatformResult<PreviousDeployment>
where
    P: ServiceHost + ImageService + ModelRegistry + RunTracker + ?Sized,
{
    let services = platform.list_services(model_name).await?;
    let Some(service) = services.into_iter().next() else {
        info!("No deployed REST service for model {}", model_name);
        return Ok(PreviousDeployment::Absent);
    };

    info!(
        "Found deployed REST service {} for model {}",
        service.name, model_name
    );

    match resolve_service_model(platform, &service).await {
        Ok(record) => {
            info!(
                "Service {} serves {} (accuracy {})",
                record.service_name, record.model.id, record.accuracy
            );
            Ok(PreviousDeployment::Resolved(record))
        }
        Err(reason) => {
            warn!(
                "Could not resolve the model behind service {}: {}",
                service.name, reason
            );
            Ok(PreviousDeployment::Unresolved {
                service_name: service.name,
                reason,
            })
        }
    }
}

/// Resolves the live deployment for `model_name`, treating unresolved as absent
pub async fn resolve_previous_deployment<P>(
    platform: &P,
    model_name: &str,
) -> PlatformResult<Option<DeploymentRecord>>
where
    P: ServiceHost + ImageService + ModelRegistry + RunTracker + ?Sized,
{
    Ok(lookup_previous_deployment(platform, model_name)
        .await?
        .into_record())
}

async fn resolve_service_model<P>(
    platform: &P,
    service: &ServiceRecord,
) -> Result<DeploymentRecord, String>
where
    P: ImageService + ModelRegistry + RunTracker + ?Sized,
{
    let image_id = service
        .tagged_image_id()
        .ok_or_else(|| "service has no image_id tag".to_string())?;

    let image = platform
        .get_image(image_id)
        .await
        .map_err(|e| format!("image {}: {}", image_id, e))?;

    let model_id = image
        .primary_model_id()
        .ok_or_else(|| format!("image {} packages no model", image.id))?;

    let model = platform
        .get_model(model_id)
        .await
        .map_err(|e| format!("model {}: {}", model_id, e))?;

    let run_id = model
        .run_id()
        .ok_or_else(|| format!("model {} has no run_id tag", model.id))?;

    let accuracy = model_accuracy(platform, Some(run_id))
        .await
        .map_err(|e| format!("metrics of run {}: {}", run_id, e))?
        .ok_or_else(|| format!("run {} reported no {} metric", run_id, ACCURACY_METRIC))?;

    Ok(DeploymentRecord {
        service_name: service.name.clone(),
        image_id: image.id,
        model,
        accuracy,
    })
}

/// Scores a model version by reading its training run's accuracy
pub async fn score_model<P>(platform: &P, record: ModelRecord) -> PlatformResult<ScoredModel>
where
    P: RunTracker + ?Sized,
{
    let accuracy = model_accuracy(platform, record.run_id()).await?;
    Ok(ScoredModel { record, accuracy })
}
