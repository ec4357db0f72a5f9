//! Configuration module
//!
//! Global CLI settings plus the workspace descriptor (`config.json`) that
//! names the ML workspace a stage operates on.

use anyhow::{Context, Result};
use gauntlet_client::{LocalPlatform, PlatformClient, ProcessExecutor};
use gauntlet_core::Platform;
use gauntlet_core::wait::WaitOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::context::PipelineContext;

/// Workspace descriptor file name
pub const WORKSPACE_CONFIG_FILE: &str = "config.json";

/// Experiment used when neither the CLI nor the workspace names one
pub const DEFAULT_EXPERIMENT: &str = "gauntlet";

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the platform gateway; `None` selects the local platform
    pub platform_url: Option<String>,
    /// Root directory of the local platform
    pub local_root: PathBuf,
    /// Bearer token for the platform gateway
    pub api_token: Option<String>,
    /// Experiment runs are recorded under
    pub experiment: Option<String>,
    /// Delay between polls of long-running operations
    pub poll_interval: Duration,
}

/// Workspace descriptor read from `<path>/config.json`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default)]
    pub subscription_id: String,
    #[serde(default)]
    pub resource_group: String,
    #[serde(default)]
    pub workspace_name: String,
    pub platform_url: Option<String>,
    pub experiment: Option<String>,
}

impl WorkspaceConfig {
    /// Load `config.json` from `dir`, falling back to defaults when absent
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(WORKSPACE_CONFIG_FILE);
        if !path.exists() {
            warn!(
                "No workspace config at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read workspace config: {}", path.display()))?;
        let workspace: WorkspaceConfig = serde_json::from_str(&content)
            .with_context(|| format!("Invalid workspace config: {}", path.display()))?;

        info!(
            "Loaded workspace {} (subscription {}, resource group {})",
            workspace.workspace_name, workspace.subscription_id, workspace.resource_group
        );
        Ok(workspace)
    }
}

impl Config {
    /// Connect to the platform selected by the CLI flags and `workspace`
    ///
    /// The CLI URL wins over the workspace's; without either, stages run
    /// against the local platform.
    pub fn connect(&self, workspace: &WorkspaceConfig) -> Result<PipelineContext> {
        let experiment = self
            .experiment
            .clone()
            .or_else(|| workspace.experiment.clone())
            .unwrap_or_else(|| DEFAULT_EXPERIMENT.to_string());

        let url = self
            .platform_url
            .as_deref()
            .or(workspace.platform_url.as_deref());

        let platform: Box<dyn Platform> = match url {
            Some(url) => {
                validate_url(url)?;
                info!("Using platform gateway at {}", url);
                let client = PlatformClient::new(url);
                match &self.api_token {
                    Some(token) => Box::new(client.with_token(token.clone())),
                    None => Box::new(client),
                }
            }
            None => {
                let program = std::env::current_exe()
                    .context("Failed to locate the gauntlet executable")?;
                info!("Using local platform at {}", self.local_root.display());
                Box::new(
                    LocalPlatform::new(&self.local_root)
                        .with_executor(Arc::new(ProcessExecutor::new(program))),
                )
            }
        };

        Ok(PipelineContext::new(platform, experiment)
            .with_wait(WaitOptions::unbounded(self.poll_interval)))
    }
}

fn validate_url(url: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        anyhow::bail!("Invalid platform URL '{}': expected http:// or https://", url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config() -> Config {
        Config {
            platform_url: None,
            local_root: PathBuf::from(".gauntlet"),
            api_token: None,
            experiment: None,
            poll_interval: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_missing_workspace_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let workspace = WorkspaceConfig::load(dir.path()).unwrap();
        assert!(workspace.platform_url.is_none());
        assert_eq!(workspace.workspace_name, "");
    }

    #[test]
    fn test_workspace_config_is_parsed() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(WORKSPACE_CONFIG_FILE),
            r#"{"subscription_id": "sub-1", "resource_group": "mlops-rg",
                "workspace_name": "mlops-ws", "experiment": "chd"}"#,
        )
        .unwrap();

        let workspace = WorkspaceConfig::load(dir.path()).unwrap();
        assert_eq!(workspace.workspace_name, "mlops-ws");
        assert_eq!(workspace.experiment.as_deref(), Some("chd"));
    }

    #[test]
    fn test_invalid_workspace_config_fails() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(WORKSPACE_CONFIG_FILE), "{not json").unwrap();
        assert!(WorkspaceConfig::load(dir.path()).is_err());
    }

    #[test]
    fn test_experiment_precedence() {
        let workspace = WorkspaceConfig {
            experiment: Some("from-workspace".to_string()),
            ..Default::default()
        };

        let ctx = config().connect(&workspace).unwrap();
        assert_eq!(ctx.experiment, "from-workspace");

        let mut explicit = config();
        explicit.experiment = Some("from-cli".to_string());
        assert_eq!(explicit.connect(&workspace).unwrap().experiment, "from-cli");

        let ctx = config().connect(&WorkspaceConfig::default()).unwrap();
        assert_eq!(ctx.experiment, DEFAULT_EXPERIMENT);
    }

    #[test]
    fn test_bad_platform_url_is_rejected() {
        let mut bad = config();
        bad.platform_url = Some("localhost:8080".to_string());
        assert!(bad.connect(&WorkspaceConfig::default()).is_err());

        let mut good = config();
        good.platform_url = Some("http://localhost:8080".to_string());
        assert!(good.connect(&WorkspaceConfig::default()).is_ok());
    }
}
