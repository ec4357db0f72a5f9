//! Deploy command handler

use anyhow::Result;
use clap::Args;
use colored::*;
use gauntlet_core::handoff::{BUILD_OUTPUT_VARS_FILE, OUTPUTS_DIR};
use std::path::PathBuf;

use super::{print_field, print_stage_banner};
use crate::config::{Config, WorkspaceConfig};
use crate::stages::deploy::{DeployArgs, DeployCheck, DeployResult, check_handoff, deploy};

/// Arguments of `gauntlet deploy`
#[derive(Args, Debug)]
pub struct DeployCommand {
    /// Name of the REST service
    #[arg(long = "service_name")]
    pub service_name: String,

    /// Inference cluster hosting the service
    #[arg(long = "aks_name")]
    pub aks_name: String,

    /// Region the cluster is created in when missing
    #[arg(long = "aks_region")]
    pub aks_region: String,

    /// Service description
    #[arg(long = "description")]
    pub description: String,
}

/// Handle `gauntlet deploy`
///
/// The hand-off record is checked before anything else, so a skipped
/// deployment never touches the platform.
pub async fn handle_deploy_command(cmd: DeployCommand, config: &Config) -> Result<()> {
    print_stage_banner("deploy");

    let outputs_dir = PathBuf::from(OUTPUTS_DIR);
    let handoff = match check_handoff(&outputs_dir.join(BUILD_OUTPUT_VARS_FILE)) {
        DeployCheck::Deploy(handoff) => handoff,
        DeployCheck::Skip(reason) => {
            print_result(&DeployResult::Skipped(reason));
            return Ok(());
        }
    };

    let workspace = WorkspaceConfig::load(&PathBuf::from("."))?;
    let ctx = config.connect(&workspace)?;

    let args = DeployArgs {
        service_name: cmd.service_name,
        aks_name: cmd.aks_name,
        aks_region: cmd.aks_region,
        description: cmd.description,
        outputs_dir,
    };
    let result = deploy(&ctx, &handoff, &args).await?;
    print_result(&result);

    Ok(())
}

fn print_result(result: &DeployResult) {
    match result {
        DeployResult::Skipped(reason) => {
            println!("{}", "Nothing to deploy".yellow().bold());
            print_field("Reason", reason);
        }
        DeployResult::Deployed {
            service,
            descriptor,
            descriptor_path,
            cluster_created,
        } => {
            println!("{}", "✓ REST service deployed".green().bold());
            print_field("Service", service.name.bold());
            print_field("URL", descriptor.service_url.cyan());
            print_field("Image", &service.image_id);
            if *cluster_created {
                print_field("Cluster", format!("{} (created)", service.compute_name));
            } else {
                print_field("Cluster", &service.compute_name);
            }
            print_field("Descriptor", descriptor_path.display().to_string().dimmed());
        }
    }
}
