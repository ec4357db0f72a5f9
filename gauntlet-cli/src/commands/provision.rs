//! Provision compute command handler

use anyhow::Result;
use clap::Args;
use colored::*;
use std::path::PathBuf;

use super::{print_field, print_stage_banner};
use crate::config::{Config, WorkspaceConfig};
use crate::stages::provision::provision;

/// Arguments of `gauntlet provision-compute`
#[derive(Args, Debug)]
pub struct ProvisionComputeCommand {
    /// Name of the training compute target
    #[arg(long = "aml_compute_target")]
    pub aml_compute_target: String,

    /// Workspace directory holding config.json
    #[arg(long = "path")]
    pub path: PathBuf,
}

/// Handle `gauntlet provision-compute`
pub async fn handle_provision_command(cmd: ProvisionComputeCommand, config: &Config) -> Result<()> {
    print_stage_banner("provision-compute");

    let workspace = WorkspaceConfig::load(&cmd.path)?;
    let ctx = config.connect(&workspace)?;

    let result = provision(&ctx, &cmd.aml_compute_target).await?;

    if result.created {
        println!("{}", "✓ Compute target created".green().bold());
    } else {
        println!("{}", "✓ Found existing compute target".green().bold());
    }
    print_field("Name", result.compute.name.bold());
    print_field("State", format!("{:?}", result.compute.provisioning_state));
    if let Some(vm_size) = &result.compute.vm_size {
        print_field("VM size", vm_size);
    }
    print_field(
        "Nodes",
        format!("{}-{}", result.compute.min_nodes, result.compute.max_nodes),
    );

    Ok(())
}
