//! Containerize command handler

use anyhow::Result;
use clap::Args;
use colored::*;
use gauntlet_core::gate::PreviousDeployment;
use std::path::PathBuf;

use super::{print_field, print_stage_banner};
use crate::config::{Config, WorkspaceConfig};
use crate::stages::containerize::{ContainerizeArgs, DEFAULT_SCORING_TEMPLATE, containerize};

/// Arguments of `gauntlet containerize`
#[derive(Args, Debug)]
pub struct ContainerizeCommand {
    /// Registered model to evaluate
    #[arg(long = "model_name")]
    pub model_name: String,

    /// Name of the scoring image to build
    #[arg(long = "image_name")]
    pub image_name: String,

    /// Directory receiving containerize_info.json
    #[arg(long = "output")]
    pub output: PathBuf,
}

/// Handle `gauntlet containerize`
pub async fn handle_containerize_command(cmd: ContainerizeCommand, config: &Config) -> Result<()> {
    print_stage_banner("containerize");

    let workspace = WorkspaceConfig::load(&PathBuf::from("."))?;
    let ctx = config.connect(&workspace)?;

    let args = ContainerizeArgs {
        model_name: cmd.model_name,
        image_name: cmd.image_name,
        output: cmd.output,
        scoring_template: PathBuf::from(DEFAULT_SCORING_TEMPLATE),
    };
    let outcome = containerize(&ctx, &args).await?;

    if outcome.decision.deploy {
        println!("{}", "✓ Model qualifies for deployment".green().bold());
    } else {
        println!("{}", "✗ Model will not be deployed".yellow().bold());
    }
    print_field("Model", outcome.candidate.record.id.bold());
    print_field(
        "Accuracy",
        outcome
            .candidate
            .accuracy
            .map(|a| a.to_string())
            .unwrap_or_else(|| "unknown".to_string()),
    );
    print_field(
        "Champion",
        match &outcome.previous {
            PreviousDeployment::Absent => "none".to_string(),
            PreviousDeployment::Unresolved { service_name, .. } => {
                format!("{} (unresolved)", service_name)
            }
            PreviousDeployment::Resolved(record) => {
                format!("{} on {} ({})", record.model.id, record.service_name, record.accuracy)
            }
        },
    );
    print_field("Reason", &outcome.decision.reason);
    if let Some(image) = &outcome.image {
        print_field("Image", image.id.cyan());
    }
    print_field("Hand-off", outcome.handoff_path.display().to_string().dimmed());

    Ok(())
}
