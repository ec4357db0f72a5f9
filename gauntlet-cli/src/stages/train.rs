//! Training stage
//!
//! The model fit itself is delegated to a [`Trainer`]. This stage records the
//! run, logs the accuracy metric and registers the produced artifact.

use anyhow::{Context, Result};
use async_trait::async_trait;
use gauntlet_core::domain::model::{BUILD_NUMBER_TAG, ModelRecord, RUN_ID_TAG, TYPE_TAG};
use gauntlet_core::domain::run::{ACCURACY_METRIC, RunStatus};
use gauntlet_core::dto::model::RegisterModel;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::context::PipelineContext;

/// Environment variable holding the shell command that trains the model
pub const TRAIN_COMMAND_ENV: &str = "GAUNTLET_TRAIN_COMMAND";

/// Description attached to every registered model
pub const MODEL_DESCRIPTION: &str = "Model to predict coronary heart disease";

const MODEL_TYPE: &str = "classification";

/// Artifact produced by a trainer
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrainedModel {
    pub model_path: PathBuf,
    pub accuracy: f64,
}

/// Fits a model and reports where it was saved
#[async_trait]
pub trait Trainer: Send + Sync {
    async fn fit(&self, model_name: &str, output_dir: &Path) -> Result<TrainedModel>;
}

/// Runs an external training command through `sh -c`
///
/// The command receives `GAUNTLET_MODEL_NAME` and `GAUNTLET_OUTPUT_DIR` and
/// must print a JSON object `{"model_path": ..., "accuracy": ...}` as the
/// last line of its stdout.
#[derive(Debug, Clone)]
pub struct CommandTrainer {
    command: String,
}

impl CommandTrainer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Trainer configured by `GAUNTLET_TRAIN_COMMAND`
    pub fn from_env() -> Result<Self> {
        let command = std::env::var(TRAIN_COMMAND_ENV)
            .with_context(|| format!("{} is not set", TRAIN_COMMAND_ENV))?;
        Ok(Self::new(command))
    }
}

#[async_trait]
impl Trainer for CommandTrainer {
    async fn fit(&self, model_name: &str, output_dir: &Path) -> Result<TrainedModel> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .env("GAUNTLET_MODEL_NAME", model_name)
            .env("GAUNTLET_OUTPUT_DIR", output_dir)
            .output()
            .await
            .with_context(|| format!("Failed to run training command: {}", self.command))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!("Training command stdout: {}", stdout.trim());

        if !output.status.success() {
            anyhow::bail!(
                "Training command exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let last_line = stdout
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .context("Training command printed no result")?;
        serde_json::from_str(last_line.trim())
            .with_context(|| format!("Invalid training result: {}", last_line))
    }
}

/// Arguments of the training stage
#[derive(Debug, Clone)]
pub struct TrainArgs {
    pub model_name: String,
    pub build_number: String,
    /// Where the trainer saves the artifact
    pub output_dir: PathBuf,
}

/// What the training stage produced
#[derive(Debug, Clone)]
pub struct TrainResult {
    pub run_id: String,
    pub model: ModelRecord,
    pub accuracy: f64,
}

/// Train, record and register a new model version
///
/// Any failure after the run starts closes it as failed.
pub async fn train(
    ctx: &PipelineContext,
    trainer: &dyn Trainer,
    args: &TrainArgs,
) -> Result<TrainResult> {
    let platform = ctx.platform.as_ref();
    let run = platform.start_run(&ctx.experiment).await?;
    info!("Started run {} in experiment {}", run.id, ctx.experiment);

    match fit_and_register(ctx, trainer, args, &run.id).await {
        Ok((model, accuracy)) => {
            platform.complete_run(&run.id, RunStatus::Completed).await?;
            Ok(TrainResult {
                run_id: run.id,
                model,
                accuracy,
            })
        }
        Err(e) => {
            if let Err(close_err) = platform.complete_run(&run.id, RunStatus::Failed).await {
                warn!("Failed to mark run {} as failed: {}", run.id, close_err);
            }
            Err(e)
        }
    }
}

async fn fit_and_register(
    ctx: &PipelineContext,
    trainer: &dyn Trainer,
    args: &TrainArgs,
    run_id: &str,
) -> Result<(ModelRecord, f64)> {
    let platform = ctx.platform.as_ref();

    std::fs::create_dir_all(&args.output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            args.output_dir.display()
        )
    })?;

    let trained = trainer
        .fit(&args.model_name, &args.output_dir)
        .await
        .context("Model training failed")?;
    info!(
        "Trained {} with accuracy {}",
        trained.model_path.display(),
        trained.accuracy
    );

    platform
        .log_metric(run_id, ACCURACY_METRIC, trained.accuracy)
        .await?;

    let tags = HashMap::from([
        (TYPE_TAG.to_string(), MODEL_TYPE.to_string()),
        (RUN_ID_TAG.to_string(), run_id.to_string()),
        (BUILD_NUMBER_TAG.to_string(), args.build_number.clone()),
    ]);
    let model = platform
        .register_model(RegisterModel {
            name: args.model_name.clone(),
            path: trained.model_path.display().to_string(),
            description: Some(MODEL_DESCRIPTION.to_string()),
            tags,
        })
        .await
        .context("Failed to register model")?;

    Ok((model, trained.accuracy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::testing::{FixedTrainer, local_context};
    use gauntlet_core::domain::run::RunRecord;
    use tempfile::TempDir;

    fn args(dir: &TempDir) -> TrainArgs {
        TrainArgs {
            model_name: "chd-rf".to_string(),
            build_number: "42".to_string(),
            output_dir: dir.path().join("outputs"),
        }
    }

    #[tokio::test]
    async fn test_train_registers_tagged_model() {
        let dir = TempDir::new().unwrap();
        let ctx = local_context(&dir);

        let result = train(&ctx, &FixedTrainer::new(0.82), &args(&dir)).await.unwrap();

        assert_eq!(result.model.version, 1);
        assert_eq!(result.model.run_id(), Some(result.run_id.as_str()));
        assert_eq!(result.model.tags[BUILD_NUMBER_TAG], "42");
        assert_eq!(result.model.tags[TYPE_TAG], "classification");
        assert_eq!(result.model.description.as_deref(), Some(MODEL_DESCRIPTION));

        let metrics = ctx.platform.get_metrics(&result.run_id).await.unwrap();
        assert_eq!(metrics[ACCURACY_METRIC], 0.82);
    }

    #[tokio::test]
    async fn test_failed_fit_fails_the_run() {
        let dir = TempDir::new().unwrap();
        let ctx = local_context(&dir);

        let err = train(&ctx, &FixedTrainer::failing(), &args(&dir))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Model training failed"));

        let runs: Vec<RunRecord> = serde_json::from_slice(
            &std::fs::read(dir.path().join("platform").join("runs.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(runs[0].status, RunStatus::Failed);
        assert!(ctx.platform.list_models("chd-rf").await.unwrap().is_empty());
    }

    /// Reports an artifact it never wrote
    struct VanishingArtifact;

    #[async_trait]
    impl Trainer for VanishingArtifact {
        async fn fit(&self, _model_name: &str, output_dir: &Path) -> Result<TrainedModel> {
            Ok(TrainedModel {
                model_path: output_dir.join("never-written.pkl"),
                accuracy: 0.9,
            })
        }
    }

    #[tokio::test]
    async fn test_failed_registration_fails_the_run() {
        let dir = TempDir::new().unwrap();
        let ctx = local_context(&dir);

        let err = train(&ctx, &VanishingArtifact, &args(&dir))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to register model"));

        let runs: Vec<RunRecord> = serde_json::from_slice(
            &std::fs::read(dir.path().join("platform").join("runs.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(runs[0].status, RunStatus::Failed);
        assert!(ctx.platform.list_models("chd-rf").await.unwrap().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_trainer_parses_last_line() {
        let dir = TempDir::new().unwrap();
        let trainer = CommandTrainer::new(
            r#"echo "fitting $GAUNTLET_MODEL_NAME"; echo '{"model_path": "m.pkl", "accuracy": 0.7}'"#,
        );

        let trained = trainer.fit("chd-rf", dir.path()).await.unwrap();
        assert_eq!(trained.model_path, PathBuf::from("m.pkl"));
        assert_eq!(trained.accuracy, 0.7);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_trainer_failure() {
        let dir = TempDir::new().unwrap();
        let trainer = CommandTrainer::new("echo 'dataset unreachable' >&2; exit 1");
        let err = trainer.fit("chd-rf", dir.path()).await.unwrap_err();
        assert!(err.to_string().contains("dataset unreachable"));
    }
}
