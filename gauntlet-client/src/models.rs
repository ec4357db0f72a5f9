//! Model registry endpoints

use async_trait::async_trait;
use gauntlet_core::PlatformResult;
use gauntlet_core::domain::model::ModelRecord;
use gauntlet_core::dto::model::RegisterModel;
use gauntlet_core::platform::ModelRegistry;
use reqwest::Method;

use crate::PlatformClient;

#[async_trait]
impl ModelRegistry for PlatformClient {
    async fn register_model(&self, req: RegisterModel) -> PlatformResult<ModelRecord> {
        Ok(self.send_json(Method::POST, "/api/models", &req).await?)
    }

    async fn list_models(&self, name: &str) -> PlatformResult<Vec<ModelRecord>> {
        let response = self
            .request(Method::GET, "/api/models")
            .query(&[("name", name)])
            .send()
            .await
            .map_err(crate::ClientError::from)?;
        Ok(self.handle_response(response).await?)
    }

    async fn get_model(&self, id: &str) -> PlatformResult<ModelRecord> {
        Ok(self.get_json(&format!("/api/models/{}", id)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL_JSON: &str = r#"{
        "id": "chd-rf:3",
        "name": "chd-rf",
        "version": 3,
        "path": "chd-rf-model",
        "description": "Model to predict coronary heart disease",
        "tags": {"run_id": "run-7", "type": "classification"},
        "created_at": "2026-10-01T12:00:00Z"
    }"#;

    #[tokio::test]
    async fn test_list_models_filters_by_name() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/models")
            .match_query(mockito::Matcher::UrlEncoded(
                "name".to_string(),
                "chd-rf".to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!("[{}]", MODEL_JSON))
            .create_async()
            .await;

        let client = PlatformClient::new(server.url());
        let models = client.list_models("chd-rf").await.unwrap();

        assert_eq!(models.len(), 1);
        assert_eq!(models[0].version, 3);
        assert_eq!(models[0].run_id(), Some("run-7"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_register_model_sends_tags() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/models")
            .match_header("authorization", "Bearer t0ken")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"name":"chd-rf","tags":{"run_id":"run-7"}}"#.to_string(),
            ))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(MODEL_JSON)
            .create_async()
            .await;

        let client = PlatformClient::new(server.url()).with_token("t0ken");
        let record = client
            .register_model(RegisterModel {
                name: "chd-rf".to_string(),
                path: "outputs/chd-rf-model".to_string(),
                description: None,
                tags: [("run_id".to_string(), "run-7".to_string())].into(),
            })
            .await
            .unwrap();

        assert_eq!(record.id, "chd-rf:3");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_missing_model_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/models/chd-rf:9")
            .with_status(404)
            .with_body("no such model")
            .create_async()
            .await;

        let client = PlatformClient::new(server.url());
        let err = client.get_model("chd-rf:9").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
