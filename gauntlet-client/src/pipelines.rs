//! Pipeline run endpoints

use async_trait::async_trait;
use gauntlet_core::domain::pipeline::{PipelineDefinition, PipelineRun};
use gauntlet_core::platform::PipelineHost;
use gauntlet_core::{PlatformError, PlatformResult};
use reqwest::Method;

use crate::PlatformClient;

#[async_trait]
impl PipelineHost for PlatformClient {
    async fn submit_pipeline(&self, definition: PipelineDefinition) -> PlatformResult<PipelineRun> {
        definition.validate()?;
        Ok(self
            .send_json(Method::POST, "/api/pipelines/runs", &definition)
            .await?)
    }

    async fn get_pipeline_run(&self, run_id: &str) -> PlatformResult<PipelineRun> {
        Ok(self
            .get_json(&format!("/api/pipelines/runs/{}", run_id))
            .await?)
    }

    async fn download_step_output(
        &self,
        run_id: &str,
        step_name: &str,
        output_name: &str,
        file_name: &str,
    ) -> PlatformResult<Vec<u8>> {
        let path = format!(
            "/api/pipelines/runs/{}/steps/{}/outputs/{}/files/{}",
            run_id, step_name, output_name, file_name
        );
        self.get_bytes(&path).await.map_err(|e| {
            if e.is_not_found() {
                PlatformError::not_found(
                    "step output",
                    format!("{}/{}/{}", step_name, output_name, file_name),
                )
            } else {
                e.into()
            }
        })
    }
}
