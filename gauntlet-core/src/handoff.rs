//! Hand-off records threaded between pipeline stages
//!
//! Stages run as separate processes, often on different machines. They pass
//! state through flat JSON files:
//!
//! - the gate stage writes a [`HandoffStatus`] to `containerize_info.json`
//!   in its step output,
//! - the build-pipeline driver relays that record verbatim to
//!   `outputs/build-pipeline-output-vars.json`,
//! - the deploy stage reads the relayed copy and, after deploying, writes a
//!   [`ServiceDescriptor`] to `outputs/aksRestServiceJson.json`.
//!
//! Records carry a `schema_version` key. Files written before the key
//! existed are read as version 1.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::domain::model::ModelRecord;
use crate::error::{CoreError, CoreResult};
use crate::platform::PipelineHost;

/// Current hand-off schema version
pub const HANDOFF_SCHEMA_VERSION: u32 = 1;

/// File written by the gate stage into its output directory
pub const CONTAINERIZE_INFO_FILE: &str = "containerize_info.json";
/// Relayed copy of the gate record, read by the deploy stage
pub const BUILD_OUTPUT_VARS_FILE: &str = "build-pipeline-output-vars.json";
/// Service descriptor written by the deploy stage
pub const SERVICE_DESCRIPTOR_FILE: &str = "aksRestServiceJson.json";
/// Directory (relative to the workspace path) holding relayed records
pub const OUTPUTS_DIR: &str = "outputs";

/// Pipeline step that produces the gate record
pub const CONTAINERIZE_STEP: &str = "containerize";
/// Named output of the gate step
pub const CONTAINERIZE_OUTPUT: &str = "containerize_output";

fn legacy_schema_version() -> u32 {
    1
}

/// Gate decision record passed from the containerize stage to the deploy stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffStatus {
    #[serde(default = "legacy_schema_version")]
    pub schema_version: u32,
    pub model_name: String,
    pub model_version: u32,
    pub model_path: String,
    /// Accuracy of the candidate model; `null` when its run reported none
    pub model_acc: Option<f64>,
    /// Whether the deploy stage should act on this record
    pub deploy_model_bool: bool,
    pub image_name: String,
    /// Id of the built image; empty unless the gate passed
    pub image_id: String,
}

impl HandoffStatus {
    /// Record for a candidate model before any decision is made
    ///
    /// Starts as "do not deploy" with no image.
    pub fn for_candidate(model: &ModelRecord, accuracy: Option<f64>, image_name: &str) -> Self {
        Self {
            schema_version: HANDOFF_SCHEMA_VERSION,
            model_name: model.name.clone(),
            model_version: model.version,
            model_path: model.path.clone(),
            model_acc: accuracy,
            deploy_model_bool: false,
            image_name: image_name.to_string(),
            image_id: String::new(),
        }
    }

    fn check_version(self) -> CoreResult<Self> {
        if self.schema_version > HANDOFF_SCHEMA_VERSION {
            return Err(CoreError::UnsupportedSchema {
                found: self.schema_version,
                supported: HANDOFF_SCHEMA_VERSION,
            });
        }
        Ok(self)
    }
}

/// Location of the deployed REST service, the pipeline's final artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    #[serde(rename = "aksServiceName")]
    pub service_name: String,
    #[serde(rename = "aks_service_url")]
    pub service_url: String,
    #[serde(rename = "aks_service_api_key")]
    pub api_key: String,
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> CoreResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
    }
    let bytes = serde_json::to_vec(value).map_err(|e| CoreError::json(path, e))?;
    fs::write(path, bytes).map_err(|e| CoreError::io(path, e))
}

/// Writes a hand-off record, creating parent directories
pub fn write_handoff(path: &Path, status: &HandoffStatus) -> CoreResult<()> {
    write_json(path, status)?;
    info!("Hand-off record saved to {}", path.display());
    Ok(())
}

/// Reads and validates a hand-off record
pub fn read_handoff(path: &Path) -> CoreResult<HandoffStatus> {
    let bytes = fs::read(path).map_err(|e| CoreError::io(path, e))?;
    parse_handoff(&bytes).map_err(|e| match e {
        CoreError::Json { source, .. } => CoreError::json(path, source),
        other => other,
    })
}

fn parse_handoff(bytes: &[u8]) -> CoreResult<HandoffStatus> {
    let status: HandoffStatus =
        serde_json::from_slice(bytes).map_err(|e| CoreError::json("<hand-off record>", e))?;
    status.check_version()
}

/// Writes the service descriptor
pub fn write_descriptor(path: &Path, descriptor: &ServiceDescriptor) -> CoreResult<()> {
    write_json(path, descriptor)?;
    info!("Service descriptor saved to {}", path.display());
    Ok(())
}

/// Republishes a downloaded gate record at `destination`
///
/// The record is validated as a [`HandoffStatus`] but written back exactly
/// as parsed: every key, including ones this version does not know, keeps
/// its value and position. Nothing is written if validation fails.
pub fn relay_record(bytes: &[u8], destination: &Path) -> CoreResult<HandoffStatus> {
    let raw: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| CoreError::json(destination, e))?;
    let status: HandoffStatus =
        serde_json::from_value(raw.clone()).map_err(|e| CoreError::json(destination, e))?;
    let status = status.check_version()?;

    write_json(destination, &raw)?;
    info!("Relayed hand-off record to {}", destination.display());
    Ok(status)
}

/// Fetches the gate record of a finished pipeline run and relays it locally
///
/// Callers must only invoke this after the run finished successfully; a
/// failed run must leave `destination` untouched.
pub async fn relay<P>(platform: &P, run_id: &str, destination: &Path) -> CoreResult<HandoffStatus>
where
    P: PipelineHost + ?Sized,
{
    let bytes = platform
        .download_step_output(
            run_id,
            CONTAINERIZE_STEP,
            CONTAINERIZE_OUTPUT,
            CONTAINERIZE_INFO_FILE,
        )
        .await?;
    relay_record(&bytes, destination)
}
