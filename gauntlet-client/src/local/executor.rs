//! Pipeline step execution for the local platform
//!
//! A step runs one `gauntlet` subcommand. [`ProcessExecutor`] spawns it as a
//! child process pointed at the same local workspace, so the step sees every
//! model, image and service the parent created.

use async_trait::async_trait;
use gauntlet_core::{PlatformError, PlatformResult};
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, info};

/// Environment variable carrying the local workspace root
pub const LOCAL_ROOT_ENV: &str = "GAUNTLET_LOCAL_ROOT";
/// Environment variable carrying the experiment name
pub const EXPERIMENT_ENV: &str = "GAUNTLET_EXPERIMENT";

/// One step, ready to run
#[derive(Debug, Clone, PartialEq)]
pub struct StepInvocation {
    pub step_name: String,
    /// Stage subcommand (e.g. "containerize")
    pub command: String,
    /// Arguments with output references replaced by directories
    pub args: Vec<String>,
    pub compute_target: String,
    pub experiment: String,
    /// Root of the local workspace the step must use
    pub local_root: PathBuf,
}

/// Runs pipeline steps on behalf of the local platform
#[async_trait]
pub trait StepExecutor: Send + Sync {
    /// Runs a step to completion; an error marks the step failed
    async fn execute(&self, invocation: &StepInvocation) -> PlatformResult<()>;
}

/// Executes steps by spawning a program (normally the running `gauntlet` binary)
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    program: PathBuf,
}

impl ProcessExecutor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl StepExecutor for ProcessExecutor {
    async fn execute(&self, invocation: &StepInvocation) -> PlatformResult<()> {
        let local_root = std::path::absolute(&invocation.local_root)?;

        info!(
            "Running step {} ({} {}) on {}",
            invocation.step_name,
            invocation.command,
            invocation.args.join(" "),
            invocation.compute_target
        );

        let output = Command::new(&self.program)
            .arg(&invocation.command)
            .args(&invocation.args)
            .env(LOCAL_ROOT_ENV, &local_root)
            .env(EXPERIMENT_ENV, &invocation.experiment)
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(
            "Step {} finished: status={} stdout='{}' stderr='{}'",
            invocation.step_name,
            output.status,
            stdout.trim(),
            stderr.trim()
        );

        if !output.status.success() {
            let last_line = |text: &str| {
                text.lines()
                    .filter(|l| !l.trim().is_empty())
                    .last()
                    .map(str::to_string)
            };
            let detail = last_line(&stderr)
                .or_else(|| last_line(&stdout))
                .unwrap_or_else(|| "no output".to_string());
            return Err(PlatformError::OperationFailed {
                operation: format!("step {}", invocation.step_name),
                message: format!("{}: {}", output.status, detail.trim()),
            });
        }

        Ok(())
    }
}
