//! Compute target endpoints

use async_trait::async_trait;
use gauntlet_core::PlatformResult;
use gauntlet_core::domain::compute::ComputeTarget;
use gauntlet_core::dto::compute::CreateCompute;
use gauntlet_core::platform::ComputeProvider;
use reqwest::Method;

use crate::PlatformClient;

#[async_trait]
impl ComputeProvider for PlatformClient {
    async fn list_compute(&self) -> PlatformResult<Vec<ComputeTarget>> {
        Ok(self.get_json("/api/compute").await?)
    }

    async fn get_compute(&self, name: &str) -> PlatformResult<ComputeTarget> {
        Ok(self.get_json(&format!("/api/compute/{}", name)).await?)
    }

    async fn create_compute(&self, req: CreateCompute) -> PlatformResult<ComputeTarget> {
        Ok(self.send_json(Method::POST, "/api/compute", &req).await?)
    }
}
