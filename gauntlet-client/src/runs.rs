//! Experiment run endpoints

use async_trait::async_trait;
use gauntlet_core::PlatformResult;
use gauntlet_core::domain::run::{RunRecord, RunStatus};
use gauntlet_core::dto::run::{CompleteRun, LogMetric, StartRun};
use gauntlet_core::platform::RunTracker;
use reqwest::Method;
use std::collections::HashMap;

use crate::PlatformClient;

#[async_trait]
impl RunTracker for PlatformClient {
    async fn start_run(&self, experiment: &str) -> PlatformResult<RunRecord> {
        let req = StartRun {
            experiment: experiment.to_string(),
        };
        let path = format!("/api/experiments/{}/runs", experiment);
        Ok(self.send_json(Method::POST, &path, &req).await?)
    }

    async fn log_metric(&self, run_id: &str, name: &str, value: f64) -> PlatformResult<()> {
        let req = LogMetric {
            name: name.to_string(),
            value,
        };
        let path = format!("/api/runs/{}/metrics", run_id);
        Ok(self.send_empty(Method::POST, &path, Some(&req)).await?)
    }

    async fn complete_run(&self, run_id: &str, status: RunStatus) -> PlatformResult<()> {
        let path = format!("/api/runs/{}/status", run_id);
        Ok(self
            .send_empty(Method::PUT, &path, Some(&CompleteRun { status }))
            .await?)
    }

    async fn get_metrics(&self, run_id: &str) -> PlatformResult<HashMap<String, f64>> {
        Ok(self.get_json(&format!("/api/runs/{}/metrics", run_id)).await?)
    }
}
