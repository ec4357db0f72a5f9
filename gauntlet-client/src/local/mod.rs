//! Filesystem-backed platform
//!
//! Keeps every platform record as a JSON document under a workspace root
//! (`.gauntlet` by default):
//!
//! ```text
//! <root>/
//!   models.json          registered model versions
//!   model_store/         copied model artifacts
//!   runs.json            experiment runs and their metrics
//!   images.json          built images
//!   services.json        deployed services and their keys
//!   compute.json         compute targets
//!   pipeline_runs.json   pipeline runs
//!   pipeline_outputs/    step outputs, one directory per run/step/output
//! ```
//!
//! Long-running operations complete before the call returns, so waits on
//! this backend settle on the first poll.

mod executor;
mod hosting;
mod pipelines;
mod registry;

pub use executor::{EXPERIMENT_ENV, LOCAL_ROOT_ENV, ProcessExecutor, StepExecutor, StepInvocation};

use gauntlet_core::{PlatformError, PlatformResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

pub(crate) const MODELS_FILE: &str = "models.json";
pub(crate) const RUNS_FILE: &str = "runs.json";
pub(crate) const IMAGES_FILE: &str = "images.json";
pub(crate) const SERVICES_FILE: &str = "services.json";
pub(crate) const COMPUTE_FILE: &str = "compute.json";
pub(crate) const PIPELINE_RUNS_FILE: &str = "pipeline_runs.json";

/// Platform backend that lives in a local directory
#[derive(Clone)]
pub struct LocalPlatform {
    root: PathBuf,
    executor: Option<Arc<dyn StepExecutor>>,
    /// Serializes read-modify-write cycles on the record files
    lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for LocalPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalPlatform")
            .field("root", &self.root)
            .field("executor", &self.executor.is_some())
            .finish()
    }
}

impl LocalPlatform {
    /// Create a platform rooted at `root`; the directory is created lazily
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            executor: None,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Run submitted pipeline steps with `executor`
    pub fn with_executor(mut self, executor: Arc<dyn StepExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub(crate) fn executor(&self) -> Option<&Arc<dyn StepExecutor>> {
        self.executor.as_ref()
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }

    /// Load a record collection; a missing file is an empty collection
    pub(crate) async fn load<T: DeserializeOwned>(&self, file: &str) -> PlatformResult<Vec<T>> {
        let path = self.root.join(file);
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| PlatformError::Parse(format!("{}: {}", path.display(), e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace a record collection
    pub(crate) async fn save<T: Serialize>(&self, file: &str, records: &[T]) -> PlatformResult<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(file);
        let bytes = serde_json::to_vec_pretty(records)
            .map_err(|e| PlatformError::Parse(format!("{}: {}", path.display(), e)))?;
        tokio::fs::write(&path, bytes).await?;
        debug!("Saved {} records to {}", records.len(), path.display());
        Ok(())
    }
}
