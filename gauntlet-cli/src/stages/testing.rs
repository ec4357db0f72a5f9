//! Fixtures shared by the stage tests

use anyhow::Result;
use async_trait::async_trait;
use gauntlet_client::LocalPlatform;
use gauntlet_core::domain::compute::ComputeTarget;
use gauntlet_core::domain::image::ImageRecord;
use gauntlet_core::domain::model::ModelRecord;
use gauntlet_core::domain::pipeline::{PipelineDefinition, PipelineRun};
use gauntlet_core::domain::run::{RunRecord, RunStatus};
use gauntlet_core::domain::service::{ServiceKeys, ServiceRecord};
use gauntlet_core::dto::compute::CreateCompute;
use gauntlet_core::dto::image::CreateImage;
use gauntlet_core::dto::model::RegisterModel;
use gauntlet_core::dto::service::{DeployService, UpdateService};
use gauntlet_core::platform::{
    ComputeProvider, ImageService, ModelRegistry, PipelineHost, RunTracker, ServiceHost,
};
use gauntlet_core::wait::WaitOptions;
use gauntlet_core::{PlatformError, PlatformResult};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

use super::train::{TrainArgs, TrainedModel, Trainer, train};
use crate::context::PipelineContext;

/// Context over a local platform rooted at `<dir>/platform`
pub fn local_context(dir: &TempDir) -> PipelineContext {
    let platform = LocalPlatform::new(dir.path().join("platform"));
    PipelineContext::new(Box::new(platform), "chd")
        .with_wait(WaitOptions::unbounded(Duration::from_millis(1)))
}

/// Trainer that writes a placeholder artifact and reports a fixed accuracy
pub struct FixedTrainer {
    accuracy: Option<f64>,
}

impl FixedTrainer {
    pub fn new(accuracy: f64) -> Self {
        Self {
            accuracy: Some(accuracy),
        }
    }

    pub fn failing() -> Self {
        Self { accuracy: None }
    }
}

#[async_trait]
impl Trainer for FixedTrainer {
    async fn fit(&self, model_name: &str, output_dir: &Path) -> Result<TrainedModel> {
        let accuracy = self
            .accuracy
            .ok_or_else(|| anyhow::anyhow!("training data unavailable"))?;
        let model_path = output_dir.join(format!("{}-model", model_name));
        std::fs::write(&model_path, b"weights")?;
        Ok(TrainedModel {
            model_path,
            accuracy,
        })
    }
}

/// Trains and registers a model version with the given accuracy
pub async fn seed_model(ctx: &PipelineContext, dir: &TempDir, accuracy: f64) -> ModelRecord {
    let args = TrainArgs {
        model_name: "chd-rf".to_string(),
        build_number: "1".to_string(),
        output_dir: dir.path().join("outputs"),
    };
    train(ctx, &FixedTrainer::new(accuracy), &args)
        .await
        .unwrap()
        .model
}

/// Local platform whose image builds or service deletions can be made to fail
pub struct FaultyPlatform {
    inner: LocalPlatform,
    pub fail_image_build: bool,
    pub fail_delete: bool,
}

impl FaultyPlatform {
    pub fn new(dir: &TempDir) -> Self {
        Self {
            inner: LocalPlatform::new(dir.path().join("platform")),
            fail_image_build: false,
            fail_delete: false,
        }
    }

    pub fn into_context(self) -> PipelineContext {
        PipelineContext::new(Box::new(self), "chd")
            .with_wait(WaitOptions::unbounded(Duration::from_millis(1)))
    }
}

#[async_trait]
impl ModelRegistry for FaultyPlatform {
    async fn register_model(&self, req: RegisterModel) -> PlatformResult<ModelRecord> {
        self.inner.register_model(req).await
    }

    async fn list_models(&self, name: &str) -> PlatformResult<Vec<ModelRecord>> {
        self.inner.list_models(name).await
    }

    async fn get_model(&self, id: &str) -> PlatformResult<ModelRecord> {
        self.inner.get_model(id).await
    }
}

#[async_trait]
impl RunTracker for FaultyPlatform {
    async fn start_run(&self, experiment: &str) -> PlatformResult<RunRecord> {
        self.inner.start_run(experiment).await
    }

    async fn log_metric(&self, run_id: &str, name: &str, value: f64) -> PlatformResult<()> {
        self.inner.log_metric(run_id, name, value).await
    }

    async fn complete_run(&self, run_id: &str, status: RunStatus) -> PlatformResult<()> {
        self.inner.complete_run(run_id, status).await
    }

    async fn get_metrics(&self, run_id: &str) -> PlatformResult<HashMap<String, f64>> {
        self.inner.get_metrics(run_id).await
    }
}

#[async_trait]
impl ImageService for FaultyPlatform {
    async fn create_image(&self, req: CreateImage) -> PlatformResult<ImageRecord> {
        if self.fail_image_build {
            return Err(PlatformError::OperationFailed {
                operation: format!("image build {}", req.name),
                message: "conda environment could not be solved".to_string(),
            });
        }
        self.inner.create_image(req).await
    }

    async fn get_image(&self, id: &str) -> PlatformResult<ImageRecord> {
        self.inner.get_image(id).await
    }
}

#[async_trait]
impl ServiceHost for FaultyPlatform {
    async fn list_services(&self, model_name: &str) -> PlatformResult<Vec<ServiceRecord>> {
        self.inner.list_services(model_name).await
    }

    async fn get_service(&self, name: &str) -> PlatformResult<ServiceRecord> {
        self.inner.get_service(name).await
    }

    async fn delete_service(&self, name: &str) -> PlatformResult<()> {
        if self.fail_delete {
            return Err(PlatformError::Api {
                status: 503,
                message: format!("cannot delete {} right now", name),
            });
        }
        self.inner.delete_service(name).await
    }

    async fn deploy_service(&self, req: DeployService) -> PlatformResult<ServiceRecord> {
        self.inner.deploy_service(req).await
    }

    async fn get_keys(&self, name: &str) -> PlatformResult<ServiceKeys> {
        self.inner.get_keys(name).await
    }

    async fn update_service(
        &self,
        name: &str,
        update: UpdateService,
    ) -> PlatformResult<ServiceRecord> {
        self.inner.update_service(name, update).await
    }
}

#[async_trait]
impl ComputeProvider for FaultyPlatform {
    async fn list_compute(&self) -> PlatformResult<Vec<ComputeTarget>> {
        self.inner.list_compute().await
    }

    async fn get_compute(&self, name: &str) -> PlatformResult<ComputeTarget> {
        self.inner.get_compute(name).await
    }

    async fn create_compute(&self, req: CreateCompute) -> PlatformResult<ComputeTarget> {
        self.inner.create_compute(req).await
    }
}

#[async_trait]
impl PipelineHost for FaultyPlatform {
    async fn submit_pipeline(&self, definition: PipelineDefinition) -> PlatformResult<PipelineRun> {
        self.inner.submit_pipeline(definition).await
    }

    async fn get_pipeline_run(&self, run_id: &str) -> PlatformResult<PipelineRun> {
        self.inner.get_pipeline_run(run_id).await
    }

    async fn download_step_output(
        &self,
        run_id: &str,
        step_name: &str,
        output_name: &str,
        file_name: &str,
    ) -> PlatformResult<Vec<u8>> {
        self.inner
            .download_step_output(run_id, step_name, output_name, file_name)
            .await
    }
}
