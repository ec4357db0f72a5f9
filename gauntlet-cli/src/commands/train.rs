//! Train command handler

use anyhow::Result;
use clap::Args;
use colored::*;
use std::path::PathBuf;

use super::{print_field, print_stage_banner};
use crate::config::{Config, WorkspaceConfig};
use crate::stages::train::{CommandTrainer, TrainArgs, train};

/// Directory (relative to the working directory) receiving the artifact
const TRAIN_OUTPUT_DIR: &str = "outputs";

/// Arguments of `gauntlet train`
#[derive(Args, Debug)]
pub struct TrainCommand {
    /// Name the model is registered under
    #[arg(long = "model_name")]
    pub model_name: String,

    /// Build number recorded on the model
    #[arg(long = "build_number")]
    pub build_number: String,
}

/// Handle `gauntlet train`
pub async fn handle_train_command(cmd: TrainCommand, config: &Config) -> Result<()> {
    print_stage_banner("train");

    let trainer = CommandTrainer::from_env()?;
    let workspace = WorkspaceConfig::load(&PathBuf::from("."))?;
    let ctx = config.connect(&workspace)?;

    let args = TrainArgs {
        model_name: cmd.model_name,
        build_number: cmd.build_number,
        output_dir: PathBuf::from(TRAIN_OUTPUT_DIR),
    };
    let result = train(&ctx, &trainer, &args).await?;

    println!("{}", "✓ Model registered".green().bold());
    print_field("Model", result.model.name.bold());
    print_field("Version", result.model.version);
    print_field("Accuracy", result.accuracy);
    print_field("Run", result.run_id.dimmed());

    Ok(())
}
