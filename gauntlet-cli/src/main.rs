//! Gauntlet CLI
//!
//! Stages of the champion/challenger model promotion pipeline. Each
//! subcommand runs one stage as its own process; stages hand state to each
//! other through JSON files.

mod commands;
mod config;
mod context;
mod stages;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "gauntlet")]
#[command(about = "Champion/challenger model promotion pipeline", long_about = None)]
struct Cli {
    /// Platform gateway URL; the local platform is used when unset
    #[arg(long, global = true, env = "GAUNTLET_PLATFORM_URL")]
    platform_url: Option<String>,

    /// Root directory of the local platform
    #[arg(
        long,
        global = true,
        env = "GAUNTLET_LOCAL_ROOT",
        default_value = ".gauntlet"
    )]
    local_root: PathBuf,

    /// Bearer token for the platform gateway
    #[arg(long, global = true, env = "GAUNTLET_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Experiment runs are recorded under
    #[arg(long, global = true, env = "GAUNTLET_EXPERIMENT")]
    experiment: Option<String>,

    /// Seconds between polls of long-running platform operations
    #[arg(long, global = true, env = "GAUNTLET_POLL_INTERVAL", default_value_t = 5)]
    poll_interval: u64,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "gauntlet_cli=info,gauntlet_client=info,gauntlet_core=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config {
        platform_url: cli.platform_url,
        local_root: cli.local_root,
        api_token: cli.api_token,
        experiment: cli.experiment,
        poll_interval: Duration::from_secs(cli.poll_interval),
    };

    handle_command(cli.command, &config).await
}
