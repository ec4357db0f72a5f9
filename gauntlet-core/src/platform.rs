//! Platform collaborator traits
//!
//! Every non-trivial operation of the pipeline (registry lookups, metrics,
//! image builds, service deployment, compute provisioning, remote pipeline
//! runs) is delegated to an external ML platform. These traits are the fixed
//! interface the stages program against; `gauntlet-client` provides the REST
//! and local-filesystem backends.
//!
//! Long-running operations return as soon as the platform has accepted them.
//! Callers block on completion with the helpers in [`crate::wait`].

use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::compute::ComputeTarget;
use crate::domain::image::ImageRecord;
use crate::domain::model::ModelRecord;
use crate::domain::pipeline::{PipelineDefinition, PipelineRun};
use crate::domain::run::{RunRecord, RunStatus};
use crate::domain::service::{ServiceKeys, ServiceRecord};
use crate::dto::compute::CreateCompute;
use crate::dto::image::CreateImage;
use crate::dto::model::RegisterModel;
use crate::dto::service::{DeployService, UpdateService};
use crate::error::PlatformResult;

/// Model registry
#[async_trait]
pub trait ModelRegistry: Send + Sync {
    /// Registers a new version of the named model
    async fn register_model(&self, req: RegisterModel) -> PlatformResult<ModelRecord>;

    /// Lists every registered version of the named model
    async fn list_models(&self, name: &str) -> PlatformResult<Vec<ModelRecord>>;

    /// Gets a model version by id
    async fn get_model(&self, id: &str) -> PlatformResult<ModelRecord>;
}

/// Experiment and run tracking
#[async_trait]
pub trait RunTracker: Send + Sync {
    /// Starts a new run in the experiment
    async fn start_run(&self, experiment: &str) -> PlatformResult<RunRecord>;

    /// Logs a scalar metric against a run
    async fn log_metric(&self, run_id: &str, name: &str, value: f64) -> PlatformResult<()>;

    /// Marks a run as finished
    async fn complete_run(&self, run_id: &str, status: RunStatus) -> PlatformResult<()>;

    /// Gets the latest value of every metric logged by a run
    async fn get_metrics(&self, run_id: &str) -> PlatformResult<HashMap<String, f64>>;
}

/// Container image build service
#[async_trait]
pub trait ImageService: Send + Sync {
    /// Starts an image build
    async fn create_image(&self, req: CreateImage) -> PlatformResult<ImageRecord>;

    /// Gets an image by id
    async fn get_image(&self, id: &str) -> PlatformResult<ImageRecord>;
}

/// Inference service hosting
#[async_trait]
pub trait ServiceHost: Send + Sync {
    /// Lists live services serving a version of the named model
    async fn list_services(&self, model_name: &str) -> PlatformResult<Vec<ServiceRecord>>;

    /// Gets a service by name
    async fn get_service(&self, name: &str) -> PlatformResult<ServiceRecord>;

    /// Deletes a service by name
    async fn delete_service(&self, name: &str) -> PlatformResult<()>;

    /// Starts deploying an image as a new service
    async fn deploy_service(&self, req: DeployService) -> PlatformResult<ServiceRecord>;

    /// Gets the authentication keys of a service
    async fn get_keys(&self, name: &str) -> PlatformResult<ServiceKeys>;

    /// Updates settings of a live service
    async fn update_service(&self, name: &str, update: UpdateService)
    -> PlatformResult<ServiceRecord>;
}

/// Compute provisioning
#[async_trait]
pub trait ComputeProvider: Send + Sync {
    /// Lists compute targets attached to the workspace
    async fn list_compute(&self) -> PlatformResult<Vec<ComputeTarget>>;

    /// Gets a compute target by name
    async fn get_compute(&self, name: &str) -> PlatformResult<ComputeTarget>;

    /// Starts provisioning a compute target
    async fn create_compute(&self, req: CreateCompute) -> PlatformResult<ComputeTarget>;
}

/// Remote pipeline execution
#[async_trait]
pub trait PipelineHost: Send + Sync {
    /// Submits a pipeline for execution
    async fn submit_pipeline(&self, definition: PipelineDefinition) -> PlatformResult<PipelineRun>;

    /// Gets a pipeline run by id
    async fn get_pipeline_run(&self, run_id: &str) -> PlatformResult<PipelineRun>;

    /// Downloads one file of a step's named output
    async fn download_step_output(
        &self,
        run_id: &str,
        step_name: &str,
        output_name: &str,
        file_name: &str,
    ) -> PlatformResult<Vec<u8>>;
}

/// The full platform surface
pub trait Platform:
    ModelRegistry + RunTracker + ImageService + ServiceHost + ComputeProvider + PipelineHost
{
}

impl<T> Platform for T where
    T: ModelRegistry
        + RunTracker
        + ImageService
        + ServiceHost
        + ComputeProvider
        + PipelineHost
        + ?Sized
{
}
