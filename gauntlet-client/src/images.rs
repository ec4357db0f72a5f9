//! Image build endpoints

use async_trait::async_trait;
use gauntlet_core::PlatformResult;
use gauntlet_core::domain::image::ImageRecord;
use gauntlet_core::dto::image::CreateImage;
use gauntlet_core::platform::ImageService;
use reqwest::Method;

use crate::PlatformClient;

#[async_trait]
impl ImageService for PlatformClient {
    async fn create_image(&self, req: CreateImage) -> PlatformResult<ImageRecord> {
        Ok(self.send_json(Method::POST, "/api/images", &req).await?)
    }

    async fn get_image(&self, id: &str) -> PlatformResult<ImageRecord> {
        Ok(self.get_json(&format!("/api/images/{}", id)).await?)
    }
}
