//! Commands module
//!
//! Defines one subcommand per pipeline stage and routes each to its handler.

mod build_pipeline;
mod containerize;
mod deploy;
mod provision;
mod train;

pub use build_pipeline::BuildPipelineCommand;
pub use containerize::ContainerizeCommand;
pub use deploy::DeployCommand;
pub use provision::ProvisionComputeCommand;
pub use train::TrainCommand;

use anyhow::Result;
use clap::Subcommand;
use colored::*;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Train a model and register it
    Train(TrainCommand),
    /// Run the promotion gate and build a scoring image if the model wins
    Containerize(ContainerizeCommand),
    /// Run train and containerize remotely and relay the gate's record
    BuildPipeline(BuildPipelineCommand),
    /// Deploy the image named by the relayed record as a REST service
    Deploy(DeployCommand),
    /// Find or create the training compute target
    ProvisionCompute(ProvisionComputeCommand),
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Train(cmd) => train::handle_train_command(cmd, config).await,
        Commands::Containerize(cmd) => {
            containerize::handle_containerize_command(cmd, config).await
        }
        Commands::BuildPipeline(cmd) => {
            build_pipeline::handle_build_pipeline_command(cmd, config).await
        }
        Commands::Deploy(cmd) => deploy::handle_deploy_command(cmd, config).await,
        Commands::ProvisionCompute(cmd) => provision::handle_provision_command(cmd, config).await,
    }
}

/// Print the opening banner of a stage
fn print_stage_banner(stage: &str) {
    println!("{}", format!("▸ {}", stage).cyan().bold());
}

/// Print a labelled value, aligned with the other fields of a summary
fn print_field(label: &str, value: impl std::fmt::Display) {
    println!("  {:<14}{}", format!("{}:", label), value);
}
