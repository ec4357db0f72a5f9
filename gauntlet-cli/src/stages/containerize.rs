//! Promotion gate and containerize stage
//!
//! Picks the newest registered version of a model, compares it with the
//! version behind the live service (if any) and builds a scoring image only
//! when the challenger wins. A hand-off record is written on every path so
//! the deploy stage always has something to read.

use anyhow::{Context, Result};
use gauntlet_core::PlatformError;
use gauntlet_core::domain::image::ImageRecord;
use gauntlet_core::domain::model::{ScoredModel, newest};
use gauntlet_core::dto::image::{CondaDependencies, CreateImage, ImageConfig};
use gauntlet_core::gate::{GateDecision, PreviousDeployment, lookup_previous_deployment, score_model};
use gauntlet_core::handoff::{CONTAINERIZE_INFO_FILE, HandoffStatus, write_handoff};
use gauntlet_core::wait::wait_for_image;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::context::PipelineContext;

/// Placeholder replaced by the model name in the scoring template
pub const MODEL_NAME_PLACEHOLDER: &str = "MODEL-NAME";
/// Scoring template looked up in the working directory
pub const DEFAULT_SCORING_TEMPLATE: &str = "score.py";
/// Entry point name inside the image
pub const EXECUTION_SCRIPT: &str = "score_fixed.py";

const EMBEDDED_SCORING_TEMPLATE: &str = include_str!("../../templates/score.py");

/// Arguments of the containerize stage
#[derive(Debug, Clone)]
pub struct ContainerizeArgs {
    pub model_name: String,
    pub image_name: String,
    /// Directory receiving `containerize_info.json`
    pub output: PathBuf,
    /// Scoring script template; the built-in one is used when missing
    pub scoring_template: PathBuf,
}

/// What the containerize stage decided and produced
#[derive(Debug, Clone)]
pub struct ContainerizeOutcome {
    pub candidate: ScoredModel,
    pub previous: PreviousDeployment,
    pub decision: GateDecision,
    pub status: HandoffStatus,
    pub handoff_path: PathBuf,
    /// Built image, present only when the gate passed
    pub image: Option<ImageRecord>,
}

/// Reads the scoring template and fills in the model name
pub fn render_scoring_script(template: &Path, model_name: &str) -> Result<String> {
    let source = if template.exists() {
        std::fs::read_to_string(template).with_context(|| {
            format!("Failed to read scoring template: {}", template.display())
        })?
    } else {
        info!(
            "No scoring template at {}, using the built-in one",
            template.display()
        );
        EMBEDDED_SCORING_TEMPLATE.to_string()
    };
    Ok(source.replace(MODEL_NAME_PLACEHOLDER, model_name))
}

/// Runs the promotion gate and, when it passes, builds the scoring image
pub async fn containerize(
    ctx: &PipelineContext,
    args: &ContainerizeArgs,
) -> Result<ContainerizeOutcome> {
    let platform = ctx.platform.as_ref();
    let handoff_path = args.output.join(CONTAINERIZE_INFO_FILE);

    let models = platform.list_models(&args.model_name).await?;
    let record = newest(&models)
        .cloned()
        .ok_or_else(|| PlatformError::not_found("model", args.model_name.clone()))?;
    info!(
        "Freshly trained model: {} (version {})",
        record.id, record.version
    );

    let candidate = score_model(platform, record).await?;
    match candidate.accuracy {
        Some(acc) => info!("Candidate accuracy: {}", acc),
        None => warn!("Candidate {} has no accuracy metric", candidate.record.id),
    }

    let previous = lookup_previous_deployment(platform, &args.model_name).await?;
    let decision = ctx.policy.evaluate(candidate.accuracy, &previous);
    info!(
        "Gate decision: {} ({})",
        if decision.deploy { "deploy" } else { "skip" },
        decision.reason
    );

    let mut status =
        HandoffStatus::for_candidate(&candidate.record, candidate.accuracy, &args.image_name);

    if !decision.deploy {
        write_handoff(&handoff_path, &status)?;
        return Ok(ContainerizeOutcome {
            candidate,
            previous,
            decision,
            status,
            handoff_path,
            image: None,
        });
    }

    let image = match build_image(ctx, args, &candidate).await {
        Ok(image) => image,
        Err(e) => {
            write_handoff(&handoff_path, &status)?;
            return Err(e);
        }
    };

    status.deploy_model_bool = true;
    status.image_id = image.id.clone();
    write_handoff(&handoff_path, &status)?;

    Ok(ContainerizeOutcome {
        candidate,
        previous,
        decision,
        status,
        handoff_path,
        image: Some(image),
    })
}

async fn build_image(
    ctx: &PipelineContext,
    args: &ContainerizeArgs,
    candidate: &ScoredModel,
) -> Result<ImageRecord> {
    let platform = ctx.platform.as_ref();
    let script_source = render_scoring_script(&args.scoring_template, &args.model_name)?;

    let requested = platform
        .create_image(CreateImage {
            name: args.image_name.clone(),
            model_ids: vec![candidate.record.id.clone()],
            config: ImageConfig {
                execution_script: EXECUTION_SCRIPT.to_string(),
                script_source,
                runtime: "python".to_string(),
                dependencies: CondaDependencies::scoring(),
            },
        })
        .await?;
    info!("Building image {}", requested.id);

    let image = wait_for_image(platform, &requested.id, &ctx.wait).await?;
    info!("Image {} is ready", image.id);
    Ok(image)
}
