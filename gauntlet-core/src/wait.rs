//! Blocking waits on long-running platform operations
//!
//! The platform runs provisioning, image builds, deployments and pipeline
//! runs asynchronously. Stages block on them by polling the resource until
//! it reaches a terminal state, logging each state change. There is no
//! cancellation: the only way out of an unbounded wait is process
//! termination, which leaves the remote operation running.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::domain::compute::{ComputeTarget, ProvisioningState};
use crate::domain::image::{ImageRecord, ImageState};
use crate::domain::pipeline::{PipelineRun, PipelineRunStatus};
use crate::domain::service::{ServiceRecord, ServiceState};
use crate::error::{PlatformError, PlatformResult};
use crate::platform::{ComputeProvider, ImageService, PipelineHost, ServiceHost};

/// Compute provisioning is the only wait with a deadline
pub const COMPUTE_PROVISIONING_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// A resource whose state can be polled to completion
pub trait Pollable {
    /// Human readable state, logged on every change
    fn state_label(&self) -> String;

    /// Whether polling can stop
    fn is_terminal(&self) -> bool;

    /// Failure detail when the terminal state is a failure
    fn failure(&self) -> Option<String>;
}

/// Polling behaviour
#[derive(Debug, Clone)]
pub struct WaitOptions {
    /// Delay between polls
    pub interval: Duration,
    /// Give up after this long; `None` waits forever
    pub timeout: Option<Duration>,
}

impl WaitOptions {
    /// Poll every `interval` until the resource settles, however long it takes
    pub fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            timeout: None,
        }
    }

    /// Same polling interval with a deadline
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            interval: self.interval,
            timeout: Some(timeout),
        }
    }
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self::unbounded(Duration::from_secs(5))
    }
}

/// Polls `fetch` until the returned resource is terminal
///
/// Returns the terminal resource, `OperationFailed` if it settled in a
/// failure state, or `Timeout` once the deadline passes.
pub async fn wait_until_terminal<T, F, Fut>(
    operation: &str,
    options: &WaitOptions,
    mut fetch: F,
) -> PlatformResult<T>
where
    T: Pollable,
    F: FnMut() -> Fut,
    Fut: Future<Output = PlatformResult<T>>,
{
    let started = Instant::now();
    let mut last_state: Option<String> = None;

    loop {
        let current = fetch().await?;
        let state = current.state_label();

        if last_state.as_deref() != Some(state.as_str()) {
            info!("{}: {}", operation, state);
            last_state = Some(state);
        } else {
            debug!("{}: still {}", operation, state);
        }

        if current.is_terminal() {
            if let Some(message) = current.failure() {
                return Err(PlatformError::OperationFailed {
                    operation: operation.to_string(),
                    message,
                });
            }
            return Ok(current);
        }

        if let Some(limit) = options.timeout {
            let waited = started.elapsed();
            if waited >= limit {
                return Err(PlatformError::Timeout {
                    operation: operation.to_string(),
                    waited,
                });
            }
        }

        tokio::time::sleep(options.interval).await;
    }
}

/// Blocks until an image build finishes
pub async fn wait_for_image<P>(
    platform: &P,
    image_id: &str,
    options: &WaitOptions,
) -> PlatformResult<ImageRecord>
where
    P: ImageService + ?Sized,
{
    let operation = format!("image build {}", image_id);
    wait_until_terminal(&operation, options, || platform.get_image(image_id)).await
}

/// Blocks until a service deployment settles
pub async fn wait_for_deployment<P>(
    platform: &P,
    service_name: &str,
    options: &WaitOptions,
) -> PlatformResult<ServiceRecord>
where
    P: ServiceHost + ?Sized,
{
    let operation = format!("deployment of {}", service_name);
    wait_until_terminal(&operation, options, || platform.get_service(service_name)).await
}

/// Blocks until a compute target is provisioned
pub async fn wait_for_compute<P>(
    platform: &P,
    compute_name: &str,
    options: &WaitOptions,
) -> PlatformResult<ComputeTarget>
where
    P: ComputeProvider + ?Sized,
{
    let operation = format!("provisioning of {}", compute_name);
    wait_until_terminal(&operation, options, || platform.get_compute(compute_name)).await
}

/// Blocks until a pipeline run completes
pub async fn wait_for_pipeline_run<P>(
    platform: &P,
    run_id: &str,
    options: &WaitOptions,
) -> PlatformResult<PipelineRun>
where
    P: PipelineHost + ?Sized,
{
    let operation = format!("pipeline run {}", run_id);
    wait_until_terminal(&operation, options, || platform.get_pipeline_run(run_id)).await
}

impl Pollable for ImageRecord {
    fn state_label(&self) -> String {
        format!("{:?}", self.state)
    }

    fn is_terminal(&self) -> bool {
        self.state != ImageState::Running
    }

    fn failure(&self) -> Option<String> {
        (self.state == ImageState::Failed).then(|| {
            self.error
                .clone()
                .unwrap_or_else(|| "image build failed".to_string())
        })
    }
}

impl Pollable for ServiceRecord {
    fn state_label(&self) -> String {
        format!("{:?}", self.state)
    }

    fn is_terminal(&self) -> bool {
        self.state != ServiceState::Transitioning
    }

    fn failure(&self) -> Option<String> {
        match self.state {
            ServiceState::Failed | ServiceState::Unhealthy => Some(
                self.error
                    .clone()
                    .unwrap_or_else(|| format!("service is {:?}", self.state)),
            ),
            _ => None,
        }
    }
}

impl Pollable for ComputeTarget {
    fn state_label(&self) -> String {
        format!("{:?}", self.provisioning_state)
    }

    fn is_terminal(&self) -> bool {
        self.provisioning_state != ProvisioningState::Creating
    }

    fn failure(&self) -> Option<String> {
        match self.provisioning_state {
            ProvisioningState::Failed | ProvisioningState::Canceled => {
                Some(if self.provisioning_errors.is_empty() {
                    format!("provisioning {:?}", self.provisioning_state)
                } else {
                    self.provisioning_errors.join("; ")
                })
            }
            _ => None,
        }
    }
}

impl Pollable for PipelineRun {
    fn state_label(&self) -> String {
        format!("{:?}", self.status)
    }

    fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            PipelineRunStatus::Finished | PipelineRunStatus::Failed | PipelineRunStatus::Canceled
        )
    }

    fn failure(&self) -> Option<String> {
        if self.status == PipelineRunStatus::Finished {
            return None;
        }
        let failed_steps: Vec<String> = self
            .steps
            .iter()
            .filter(|s| s.status == PipelineRunStatus::Failed)
            .map(|s| match &s.error {
                Some(err) => format!("{} ({})", s.name, err),
                None => s.name.clone(),
            })
            .collect();
        Some(if failed_steps.is_empty() {
            format!("pipeline run {:?}", self.status)
        } else {
            format!("failed steps: {}", failed_steps.join(", "))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn image(state: ImageState) -> ImageRecord {
        ImageRecord {
            id: "chd-image:1".to_string(),
            name: "chd-image".to_string(),
            model_ids: vec!["chd-rf:1".to_string()],
            state,
            created_at: chrono::Utc::now(),
            error: None,
        }
    }

    fn fast() -> WaitOptions {
        WaitOptions::unbounded(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_wait_returns_terminal_resource() {
        let states = Mutex::new(vec![
            ImageState::Succeeded,
            ImageState::Running,
            ImageState::Running,
        ]);
        let polls = Mutex::new(0);

        let result = wait_until_terminal("build", &fast(), || {
            *polls.lock().unwrap() += 1;
            let state = states.lock().unwrap().pop().unwrap();
            async move { Ok(image(state)) }
        })
        .await
        .unwrap();

        assert_eq!(result.state, ImageState::Succeeded);
        assert_eq!(*polls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_wait_reports_failure() {
        let result = wait_until_terminal("build", &fast(), || async {
            let mut failed = image(ImageState::Failed);
            failed.error = Some("conda solve failed".to_string());
            Ok(failed)
        })
        .await;

        match result {
            Err(PlatformError::OperationFailed { message, .. }) => {
                assert_eq!(message, "conda solve failed")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let options = fast().with_timeout(Duration::from_millis(20));
        let result =
            wait_until_terminal("build", &options, || async { Ok(image(ImageState::Running)) })
                .await;

        assert!(matches!(result, Err(PlatformError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_wait_propagates_fetch_errors() {
        let result: PlatformResult<ImageRecord> = wait_until_terminal("build", &fast(), || async {
            Err(PlatformError::not_found("image", "chd-image:1"))
        })
        .await;

        assert!(result.unwrap_err().is_not_found());
    }

    #[test]
    fn test_pipeline_failure_names_failed_steps() {
        use crate::domain::pipeline::StepRun;

        let run = PipelineRun {
            id: "run-1".to_string(),
            experiment: "chd".to_string(),
            status: PipelineRunStatus::Failed,
            steps: vec![
                StepRun {
                    name: "train".to_string(),
                    status: PipelineRunStatus::Finished,
                    outputs: Default::default(),
                    error: None,
                },
                StepRun {
                    name: "containerize".to_string(),
                    status: PipelineRunStatus::Failed,
                    outputs: Default::default(),
                    error: Some("exit status 1".to_string()),
                },
            ],
            submitted_at: chrono::Utc::now(),
            completed_at: None,
        };

        assert!(run.is_terminal());
        assert_eq!(
            run.failure().unwrap(),
            "failed steps: containerize (exit status 1)"
        );
    }
}
