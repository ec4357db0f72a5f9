//! Local pipeline runs
//!
//! Steps run in dependency order, one at a time. Each declared output gets
//! its own directory under `pipeline_outputs/<run>/<step>/<output>/`.

use async_trait::async_trait;
use gauntlet_core::domain::pipeline::{
    PipelineDefinition, PipelineRun, PipelineRunStatus, StepArg, StepRun,
};
use gauntlet_core::platform::PipelineHost;
use gauntlet_core::{PlatformError, PlatformResult};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

use super::executor::StepInvocation;
use super::{LocalPlatform, PIPELINE_RUNS_FILE};

const PIPELINE_OUTPUTS_DIR: &str = "pipeline_outputs";

impl LocalPlatform {
    fn output_dir(&self, run_id: &str, step: &str, output: &str) -> PathBuf {
        self.root()
            .join(PIPELINE_OUTPUTS_DIR)
            .join(run_id)
            .join(step)
            .join(output)
    }
}

#[async_trait]
impl PipelineHost for LocalPlatform {
    async fn submit_pipeline(&self, definition: PipelineDefinition) -> PlatformResult<PipelineRun> {
        definition.validate()?;
        let executor = self.executor().ok_or_else(|| {
            PlatformError::InvalidRequest("local platform has no step executor".to_string())
        })?;

        let run_id = Uuid::new_v4().to_string();
        let order = definition.execution_order()?;
        info!(
            "Pipeline run {} submitted with {} steps",
            run_id,
            order.len()
        );

        let mut steps = Vec::with_capacity(order.len());
        let mut failed = false;

        for step in order {
            if failed {
                steps.push(StepRun {
                    name: step.name.clone(),
                    status: PipelineRunStatus::NotStarted,
                    outputs: HashMap::new(),
                    error: None,
                });
                continue;
            }

            let mut outputs = HashMap::new();
            for output in &step.outputs {
                let dir = self.output_dir(&run_id, &step.name, output);
                tokio::fs::create_dir_all(&dir).await?;
                outputs.insert(output.clone(), dir.display().to_string());
            }

            let args = step
                .arguments
                .iter()
                .map(|arg| match arg {
                    StepArg::Literal(value) => value.clone(),
                    StepArg::Output(name) => outputs.get(name).cloned().unwrap_or_default(),
                })
                .collect();

            let invocation = StepInvocation {
                step_name: step.name.clone(),
                command: step.command.clone(),
                args,
                compute_target: definition.compute_target.clone(),
                experiment: definition.experiment.clone(),
                local_root: self.root().to_path_buf(),
            };

            let (status, error) = match executor.execute(&invocation).await {
                Ok(()) => (PipelineRunStatus::Finished, None),
                Err(e) => {
                    warn!("Step {} failed: {}", step.name, e);
                    failed = true;
                    (PipelineRunStatus::Failed, Some(e.to_string()))
                }
            };

            steps.push(StepRun {
                name: step.name.clone(),
                status,
                outputs,
                error,
            });
        }

        let run = PipelineRun {
            id: run_id,
            experiment: definition.experiment,
            status: if failed {
                PipelineRunStatus::Failed
            } else {
                PipelineRunStatus::Finished
            },
            steps,
            submitted_at: chrono::Utc::now(),
            completed_at: Some(chrono::Utc::now()),
        };

        let _guard = self.lock().await;
        let mut runs: Vec<PipelineRun> = self.load(PIPELINE_RUNS_FILE).await?;
        runs.push(run.clone());
        self.save(PIPELINE_RUNS_FILE, &runs).await?;

        Ok(run)
    }

    async fn get_pipeline_run(&self, run_id: &str) -> PlatformResult<PipelineRun> {
        let runs: Vec<PipelineRun> = self.load(PIPELINE_RUNS_FILE).await?;
        runs.into_iter()
            .find(|r| r.id == run_id)
            .ok_or_else(|| PlatformError::not_found("pipeline run", run_id))
    }

    async fn download_step_output(
        &self,
        run_id: &str,
        step_name: &str,
        output_name: &str,
        file_name: &str,
    ) -> PlatformResult<Vec<u8>> {
        let path = self
            .output_dir(run_id, step_name, output_name)
            .join(file_name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(PlatformError::not_found(
                "step output",
                format!("{}/{}/{}", step_name, output_name, file_name),
            )),
            Err(e) => Err(e.into()),
        }
    }
}
