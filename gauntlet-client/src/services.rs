//! Inference service endpoints

use async_trait::async_trait;
use gauntlet_core::PlatformResult;
use gauntlet_core::domain::service::{ServiceKeys, ServiceRecord};
use gauntlet_core::dto::service::{DeployService, UpdateService};
use gauntlet_core::platform::ServiceHost;
use reqwest::Method;

use crate::{ClientError, PlatformClient};

#[async_trait]
impl ServiceHost for PlatformClient {
    async fn list_services(&self, model_name: &str) -> PlatformResult<Vec<ServiceRecord>> {
        let response = self
            .request(Method::GET, "/api/services")
            .query(&[("model_name", model_name)])
            .send()
            .await
            .map_err(ClientError::from)?;
        Ok(self.handle_response(response).await?)
    }

    async fn get_service(&self, name: &str) -> PlatformResult<ServiceRecord> {
        Ok(self.get_json(&format!("/api/services/{}", name)).await?)
    }

    async fn delete_service(&self, name: &str) -> PlatformResult<()> {
        let path = format!("/api/services/{}", name);
        Ok(self.send_empty::<()>(Method::DELETE, &path, None).await?)
    }

    async fn deploy_service(&self, req: DeployService) -> PlatformResult<ServiceRecord> {
        Ok(self.send_json(Method::POST, "/api/services", &req).await?)
    }

    async fn get_keys(&self, name: &str) -> PlatformResult<ServiceKeys> {
        Ok(self.get_json(&format!("/api/services/{}/keys", name)).await?)
    }

    async fn update_service(
        &self,
        name: &str,
        update: UpdateService,
    ) -> PlatformResult<ServiceRecord> {
        let path = format!("/api/services/{}", name);
        Ok(self.send_json(Method::PATCH, &path, &update).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gauntlet_core::domain::service::ServiceState;

    const SERVICE_JSON: &str = r#"{
        "name": "chd-svc",
        "image_id": "chd-image:5",
        "compute_name": "aks-cluster",
        "scoring_uri": "http://10.0.0.4/api/v1/service/chd-svc/score",
        "state": "Healthy",
        "description": null,
        "tags": {"name": "aks-cluster", "image_id": "chd-image:5"},
        "app_insights_enabled": true,
        "collect_model_data": true,
        "error": null
    }"#;

    #[tokio::test]
    async fn test_list_services_by_model() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/services")
            .match_query(mockito::Matcher::UrlEncoded(
                "model_name".to_string(),
                "chd-rf".to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!("[{}]", SERVICE_JSON))
            .create_async()
            .await;

        let client = PlatformClient::new(server.url());
        let services = client.list_services("chd-rf").await.unwrap();

        assert_eq!(services.len(), 1);
        assert_eq!(services[0].state, ServiceState::Healthy);
        assert_eq!(services[0].tagged_image_id(), Some("chd-image:5"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_service() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/api/services/chd-svc")
            .with_status(204)
            .create_async()
            .await;

        let client = PlatformClient::new(server.url());
        client.delete_service("chd-svc").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_sends_only_set_fields() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PATCH", "/api/services/chd-svc")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "enable_app_insights": true,
                "collect_model_data": true
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(SERVICE_JSON)
            .create_async()
            .await;

        let client = PlatformClient::new(server.url());
        let service = client
            .update_service("chd-svc", UpdateService::enable_monitoring())
            .await
            .unwrap();

        assert!(service.app_insights_enabled);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_keys() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/services/chd-svc/keys")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"primary_key": "k3y", "secondary_key": "k4y"}"#)
            .create_async()
            .await;

        let client = PlatformClient::new(server.url());
        let keys = client.get_keys("chd-svc").await.unwrap();
        assert_eq!(keys.primary_key, "k3y");
    }
}
