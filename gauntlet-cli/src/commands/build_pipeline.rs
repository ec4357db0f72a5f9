//! Build pipeline command handler

use anyhow::Result;
use clap::Args;
use colored::*;
use std::path::PathBuf;

use super::{print_field, print_stage_banner};
use crate::config::{Config, WorkspaceConfig};
use crate::stages::build_pipeline::{BuildPipelineArgs, build_pipeline};

/// Arguments of `gauntlet build-pipeline`
#[derive(Args, Debug)]
pub struct BuildPipelineCommand {
    /// Training compute the steps run on
    #[arg(long = "aml_compute_target")]
    pub aml_compute_target: String,

    /// Model name passed to both steps
    #[arg(long = "model_name")]
    pub model_name: String,

    /// Build number passed to the training step
    #[arg(long = "build_number")]
    pub build_number: String,

    /// Image name passed to the containerize step
    #[arg(long = "image_name")]
    pub image_name: String,

    /// Workspace directory holding config.json
    #[arg(long = "path")]
    pub path: PathBuf,
}

/// Handle `gauntlet build-pipeline`
pub async fn handle_build_pipeline_command(
    cmd: BuildPipelineCommand,
    config: &Config,
) -> Result<()> {
    print_stage_banner("build-pipeline");

    let workspace = WorkspaceConfig::load(&cmd.path)?;
    let ctx = config.connect(&workspace)?;

    let args = BuildPipelineArgs {
        compute_target: cmd.aml_compute_target,
        model_name: cmd.model_name,
        build_number: cmd.build_number,
        image_name: cmd.image_name,
        path: cmd.path,
    };
    let result = build_pipeline(&ctx, &args).await?;

    println!("{}", "✓ Build pipeline finished".green().bold());
    print_field("Run", result.run.id.dimmed());
    print_field(
        "Model",
        format!("{} v{}", result.handoff.model_name, result.handoff.model_version).bold(),
    );
    print_field(
        "Deploy",
        if result.handoff.deploy_model_bool {
            "yes".green()
        } else {
            "no".yellow()
        },
    );
    print_field("Output", result.handoff_path.display().to_string().dimmed());

    Ok(())
}
