//! Build pipeline stage
//!
//! Submits the train and containerize steps as one pipeline run on the
//! training compute, blocks until the run settles, then relays the gate's
//! hand-off record to `<path>/outputs/build-pipeline-output-vars.json`.

use anyhow::{Context, Result};
use gauntlet_core::domain::pipeline::{PipelineDefinition, PipelineRun, PipelineStep};
use gauntlet_core::handoff::{
    BUILD_OUTPUT_VARS_FILE, CONTAINERIZE_OUTPUT, CONTAINERIZE_STEP, HandoffStatus, OUTPUTS_DIR,
    relay,
};
use gauntlet_core::wait::wait_for_pipeline_run;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::context::PipelineContext;

/// Pipeline step running the training stage
pub const TRAIN_STEP: &str = "train";
/// Named output of the training step
pub const TRAIN_OUTPUT: &str = "train_output";

/// Arguments of the build pipeline stage
#[derive(Debug, Clone)]
pub struct BuildPipelineArgs {
    pub compute_target: String,
    pub model_name: String,
    pub build_number: String,
    pub image_name: String,
    /// Workspace directory; the relayed record lands under `outputs/`
    pub path: PathBuf,
}

/// What the build pipeline produced
#[derive(Debug, Clone)]
pub struct BuildPipelineResult {
    pub run: PipelineRun,
    pub handoff: HandoffStatus,
    pub handoff_path: PathBuf,
}

/// The two-step train/containerize pipeline
pub fn pipeline_definition(experiment: &str, args: &BuildPipelineArgs) -> PipelineDefinition {
    let train = PipelineStep::new(TRAIN_STEP, "train")
        .arg("--model_name", &args.model_name)
        .arg("--build_number", &args.build_number)
        .output(TRAIN_OUTPUT);

    let containerize = PipelineStep::new(CONTAINERIZE_STEP, "containerize")
        .arg("--model_name", &args.model_name)
        .arg("--image_name", &args.image_name)
        .output_arg("--output", CONTAINERIZE_OUTPUT)
        .run_after(TRAIN_STEP);

    PipelineDefinition {
        experiment: experiment.to_string(),
        compute_target: args.compute_target.clone(),
        steps: vec![train, containerize],
    }
}

/// Runs the remote pipeline and relays its hand-off record
pub async fn build_pipeline(
    ctx: &PipelineContext,
    args: &BuildPipelineArgs,
) -> Result<BuildPipelineResult> {
    let platform = ctx.platform.as_ref();

    let compute = platform
        .get_compute(&args.compute_target)
        .await
        .with_context(|| format!("Compute target {} is unavailable", args.compute_target))?;
    info!("Using compute target {}", compute.name);

    let definition = pipeline_definition(&ctx.experiment, args);
    definition.validate()?;

    // A record left by an earlier run must not outlive a failed one
    let handoff_path = args.path.join(OUTPUTS_DIR).join(BUILD_OUTPUT_VARS_FILE);
    clear_previous_handoff(&handoff_path)?;

    let submitted = platform.submit_pipeline(definition).await?;
    info!(
        "Submitted pipeline run {} in experiment {}",
        submitted.id, ctx.experiment
    );

    let run = wait_for_pipeline_run(platform, &submitted.id, &ctx.wait).await?;

    let handoff = relay(platform, &run.id, &handoff_path).await?;

    Ok(BuildPipelineResult {
        run,
        handoff,
        handoff_path,
    })
}

fn clear_previous_handoff(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            info!("Removed hand-off record of a previous run: {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| {
            format!("Failed to remove stale hand-off record: {}", path.display())
        }),
    }
}
