//! Local model registry, run tracking and image builds

use async_trait::async_trait;
use gauntlet_core::domain::image::{ImageRecord, ImageState};
use gauntlet_core::domain::model::ModelRecord;
use gauntlet_core::domain::run::{RunRecord, RunStatus};
use gauntlet_core::dto::image::CreateImage;
use gauntlet_core::dto::model::RegisterModel;
use gauntlet_core::platform::{ImageService, ModelRegistry, RunTracker};
use gauntlet_core::{PlatformError, PlatformResult};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

use super::{IMAGES_FILE, LocalPlatform, MODELS_FILE, RUNS_FILE};

const MODEL_STORE_DIR: &str = "model_store";
const IMAGE_STORE_DIR: &str = "image_store";

fn next_version(existing: impl Iterator<Item = u32>) -> u32 {
    existing.max().unwrap_or(0) + 1
}

#[async_trait]
impl ModelRegistry for LocalPlatform {
    async fn register_model(&self, req: RegisterModel) -> PlatformResult<ModelRecord> {
        let source = Path::new(&req.path);
        let file_name = source
            .file_name()
            .ok_or_else(|| PlatformError::InvalidRequest(format!("bad model path: {}", req.path)))?;
        if !tokio::fs::metadata(source).await.map(|m| m.is_file()).unwrap_or(false) {
            return Err(PlatformError::not_found("model artifact", req.path.clone()));
        }

        let _guard = self.lock().await;
        let mut models: Vec<ModelRecord> = self.load(MODELS_FILE).await?;
        let version = next_version(models.iter().filter(|m| m.name == req.name).map(|m| m.version));

        let store = self
            .root()
            .join(MODEL_STORE_DIR)
            .join(&req.name)
            .join(version.to_string());
        tokio::fs::create_dir_all(&store).await?;
        let stored = store.join(file_name);
        tokio::fs::copy(source, &stored).await?;

        let record = ModelRecord {
            id: format!("{}:{}", req.name, version),
            name: req.name,
            version,
            path: stored.display().to_string(),
            description: req.description,
            tags: req.tags,
            created_at: chrono::Utc::now(),
        };
        models.push(record.clone());
        self.save(MODELS_FILE, &models).await?;

        info!("Registered model {}", record.id);
        Ok(record)
    }

    async fn list_models(&self, name: &str) -> PlatformResult<Vec<ModelRecord>> {
        let models: Vec<ModelRecord> = self.load(MODELS_FILE).await?;
        Ok(models.into_iter().filter(|m| m.name == name).collect())
    }

    async fn get_model(&self, id: &str) -> PlatformResult<ModelRecord> {
        let models: Vec<ModelRecord> = self.load(MODELS_FILE).await?;
        models
            .into_iter()
            .find(|m| m.id == id)
            .ok_or_else(|| PlatformError::not_found("model", id))
    }
}

impl LocalPlatform {
    async fn update_run<F>(&self, run_id: &str, apply: F) -> PlatformResult<()>
    where
        F: FnOnce(&mut RunRecord) + Send,
    {
        let _guard = self.lock().await;
        let mut runs: Vec<RunRecord> = self.load(RUNS_FILE).await?;
        let run = runs
            .iter_mut()
            .find(|r| r.id == run_id)
            .ok_or_else(|| PlatformError::not_found("run", run_id))?;
        apply(run);
        self.save(RUNS_FILE, &runs).await
    }
}

#[async_trait]
impl RunTracker for LocalPlatform {
    async fn start_run(&self, experiment: &str) -> PlatformResult<RunRecord> {
        let run = RunRecord {
            id: Uuid::new_v4().to_string(),
            experiment: experiment.to_string(),
            status: RunStatus::Running,
            metrics: HashMap::new(),
            started_at: chrono::Utc::now(),
            completed_at: None,
        };

        let _guard = self.lock().await;
        let mut runs: Vec<RunRecord> = self.load(RUNS_FILE).await?;
        runs.push(run.clone());
        self.save(RUNS_FILE, &runs).await?;
        Ok(run)
    }

    async fn log_metric(&self, run_id: &str, name: &str, value: f64) -> PlatformResult<()> {
        self.update_run(run_id, |run| {
            run.metrics.insert(name.to_string(), value);
        })
        .await
    }

    async fn complete_run(&self, run_id: &str, status: RunStatus) -> PlatformResult<()> {
        self.update_run(run_id, |run| {
            run.status = status;
            run.completed_at = Some(chrono::Utc::now());
        })
        .await
    }

    async fn get_metrics(&self, run_id: &str) -> PlatformResult<HashMap<String, f64>> {
        let runs: Vec<RunRecord> = self.load(RUNS_FILE).await?;
        runs.into_iter()
            .find(|r| r.id == run_id)
            .map(|r| r.metrics)
            .ok_or_else(|| PlatformError::not_found("run", run_id))
    }
}

#[async_trait]
impl ImageService for LocalPlatform {
    async fn create_image(&self, req: CreateImage) -> PlatformResult<ImageRecord> {
        let models: Vec<ModelRecord> = self.load(MODELS_FILE).await?;
        if let Some(missing) = req
            .model_ids
            .iter()
            .find(|id| !models.iter().any(|m| &m.id == *id))
        {
            return Err(PlatformError::not_found("model", missing.clone()));
        }

        let _guard = self.lock().await;
        let mut images: Vec<ImageRecord> = self.load(IMAGES_FILE).await?;
        let version = next_version(
            images
                .iter()
                .filter(|i| i.name == req.name)
                .filter_map(|i| i.id.rsplit(':').next()?.parse().ok()),
        );
        let id = format!("{}:{}", req.name, version);

        let context = self.root().join(IMAGE_STORE_DIR).join(&req.name).join(version.to_string());
        tokio::fs::create_dir_all(&context).await?;
        tokio::fs::write(
            context.join(&req.config.execution_script),
            &req.config.script_source,
        )
        .await?;
        let manifest = serde_json::to_vec_pretty(&req.config)
            .map_err(|e| PlatformError::Parse(e.to_string()))?;
        tokio::fs::write(context.join("image.json"), manifest).await?;

        let record = ImageRecord {
            id,
            name: req.name,
            model_ids: req.model_ids,
            state: ImageState::Succeeded,
            created_at: chrono::Utc::now(),
            error: None,
        };
        images.push(record.clone());
        self.save(IMAGES_FILE, &images).await?;

        info!("Built image {}", record.id);
        Ok(record)
    }

    async fn get_image(&self, id: &str) -> PlatformResult<ImageRecord> {
        let images: Vec<ImageRecord> = self.load(IMAGES_FILE).await?;
        images
            .into_iter()
            .find(|i| i.id == id)
            .ok_or_else(|| PlatformError::not_found("image", id))
    }
}
