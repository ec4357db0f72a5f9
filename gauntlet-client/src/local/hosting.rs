//! Local inference services and compute targets

use async_trait::async_trait;
use gauntlet_core::domain::compute::{ComputeKind, ComputeTarget, ProvisioningState};
use gauntlet_core::domain::image::ImageRecord;
use gauntlet_core::domain::model::ModelRecord;
use gauntlet_core::domain::service::{ServiceKeys, ServiceRecord, ServiceState};
use gauntlet_core::dto::compute::CreateCompute;
use gauntlet_core::dto::service::{DeployService, UpdateService};
use gauntlet_core::platform::{ComputeProvider, ServiceHost};
use gauntlet_core::{PlatformError, PlatformResult};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{COMPUTE_FILE, IMAGES_FILE, LocalPlatform, MODELS_FILE, SERVICES_FILE};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredService {
    #[serde(flatten)]
    record: ServiceRecord,
    keys: ServiceKeys,
}

fn scoring_uri(name: &str) -> String {
    format!("http://localhost/api/v1/service/{}/score", name)
}

#[async_trait]
impl ServiceHost for LocalPlatform {
    async fn list_services(&self, model_name: &str) -> PlatformResult<Vec<ServiceRecord>> {
        let models: Vec<ModelRecord> = self.load(MODELS_FILE).await?;
        let images: Vec<ImageRecord> = self.load(IMAGES_FILE).await?;
        let services: Vec<StoredService> = self.load(SERVICES_FILE).await?;

        let serves_model = |image_id: &str| {
            images
                .iter()
                .filter(|i| i.id == image_id)
                .flat_map(|i| i.model_ids.iter())
                .any(|id| models.iter().any(|m| &m.id == id && m.name == model_name))
        };

        Ok(services
            .into_iter()
            .map(|s| s.record)
            .filter(|s| serves_model(&s.image_id))
            .collect())
    }

    async fn get_service(&self, name: &str) -> PlatformResult<ServiceRecord> {
        let services: Vec<StoredService> = self.load(SERVICES_FILE).await?;
        services
            .into_iter()
            .find(|s| s.record.name == name)
            .map(|s| s.record)
            .ok_or_else(|| PlatformError::not_found("service", name))
    }

    async fn delete_service(&self, name: &str) -> PlatformResult<()> {
        let _guard = self.lock().await;
        let mut services: Vec<StoredService> = self.load(SERVICES_FILE).await?;
        let before = services.len();
        services.retain(|s| s.record.name != name);
        if services.len() == before {
            return Err(PlatformError::not_found("service", name));
        }
        self.save(SERVICES_FILE, &services).await?;
        info!("Deleted service {}", name);
        Ok(())
    }

    async fn deploy_service(&self, req: DeployService) -> PlatformResult<ServiceRecord> {
        let images: Vec<ImageRecord> = self.load(IMAGES_FILE).await?;
        if !images.iter().any(|i| i.id == req.image_id) {
            return Err(PlatformError::not_found("image", req.image_id));
        }

        let compute = self.get_compute(&req.compute_name).await?;
        if compute.kind != ComputeKind::Inference {
            return Err(PlatformError::InvalidRequest(format!(
                "{} is not an inference cluster",
                req.compute_name
            )));
        }

        let _guard = self.lock().await;
        let mut services: Vec<StoredService> = self.load(SERVICES_FILE).await?;
        if services.iter().any(|s| s.record.name == req.name) {
            return Err(PlatformError::conflict("service", req.name));
        }

        let record = ServiceRecord {
            scoring_uri: Some(scoring_uri(&req.name)),
            name: req.name,
            image_id: req.image_id,
            compute_name: req.compute_name,
            state: ServiceState::Healthy,
            description: req.description,
            tags: req.tags,
            app_insights_enabled: false,
            collect_model_data: false,
            error: None,
        };
        services.push(StoredService {
            record: record.clone(),
            keys: ServiceKeys {
                primary_key: Uuid::new_v4().simple().to_string(),
                secondary_key: Uuid::new_v4().simple().to_string(),
            },
        });
        self.save(SERVICES_FILE, &services).await?;

        info!("Deployed service {} on {}", record.name, record.compute_name);
        Ok(record)
    }

    async fn get_keys(&self, name: &str) -> PlatformResult<ServiceKeys> {
        let services: Vec<StoredService> = self.load(SERVICES_FILE).await?;
        services
            .into_iter()
            .find(|s| s.record.name == name)
            .map(|s| s.keys)
            .ok_or_else(|| PlatformError::not_found("service", name))
    }

    async fn update_service(
        &self,
        name: &str,
        update: UpdateService,
    ) -> PlatformResult<ServiceRecord> {
        let _guard = self.lock().await;
        let mut services: Vec<StoredService> = self.load(SERVICES_FILE).await?;
        let service = services
            .iter_mut()
            .find(|s| s.record.name == name)
            .ok_or_else(|| PlatformError::not_found("service", name))?;

        if let Some(enabled) = update.enable_app_insights {
            service.record.app_insights_enabled = enabled;
        }
        if let Some(enabled) = update.collect_model_data {
            service.record.collect_model_data = enabled;
        }
        let record = service.record.clone();
        self.save(SERVICES_FILE, &services).await?;
        Ok(record)
    }
}

#[async_trait]
impl ComputeProvider for LocalPlatform {
    async fn list_compute(&self) -> PlatformResult<Vec<ComputeTarget>> {
        self.load(COMPUTE_FILE).await
    }

    async fn get_compute(&self, name: &str) -> PlatformResult<ComputeTarget> {
        let targets: Vec<ComputeTarget> = self.load(COMPUTE_FILE).await?;
        targets
            .into_iter()
            .find(|t| t.name == name)
            .ok_or_else(|| PlatformError::not_found("compute target", name))
    }

    async fn create_compute(&self, req: CreateCompute) -> PlatformResult<ComputeTarget> {
        let _guard = self.lock().await;
        let mut targets: Vec<ComputeTarget> = self.load(COMPUTE_FILE).await?;
        if targets.iter().any(|t| t.name == req.name) {
            return Err(PlatformError::conflict("compute target", req.name));
        }

        let target = ComputeTarget {
            name: req.name,
            kind: req.kind,
            location: req.location,
            vm_size: req.vm_size,
            min_nodes: req.min_nodes,
            max_nodes: req.max_nodes,
            provisioning_state: ProvisioningState::Succeeded,
            provisioning_errors: Vec::new(),
        };
        targets.push(target.clone());
        self.save(COMPUTE_FILE, &targets).await?;

        info!("Provisioned {:?} compute {}", target.kind, target.name);
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gauntlet_core::dto::image::{CondaDependencies, CreateImage, ImageConfig};
    use gauntlet_core::dto::model::RegisterModel;
    use gauntlet_core::platform::{ImageService, ModelRegistry};
    use std::collections::HashMap;
    use tempfile::TempDir;

    async fn image_for(platform: &LocalPlatform, dir: &std::path::Path, model: &str) -> String {
        let artifact = dir.join(format!("{}.pkl", model));
        std::fs::write(&artifact, b"weights").unwrap();
        let record = platform
            .register_model(RegisterModel {
                name: model.to_string(),
                path: artifact.display().to_string(),
                description: None,
                tags: HashMap::new(),
            })
            .await
            .unwrap();
        platform
            .create_image(CreateImage {
                name: format!("{}-image", model),
                model_ids: vec![record.id],
                config: ImageConfig {
                    execution_script: "score.py".to_string(),
                    script_source: String::new(),
                    runtime: "python".to_string(),
                    dependencies: CondaDependencies::scoring(),
                },
            })
            .await
            .unwrap()
            .id
    }

    fn deploy(name: &str, image_id: &str) -> DeployService {
        DeployService {
            name: name.to_string(),
            image_id: image_id.to_string(),
            compute_name: "aks-cluster".to_string(),
            description: None,
            tags: HashMap::new(),
        }
    }

    async fn platform_with_cluster(dir: &TempDir) -> LocalPlatform {
        let platform = LocalPlatform::new(dir.path().join("ws"));
        platform
            .create_compute(CreateCompute::inference("aks-cluster", "eastus"))
            .await
            .unwrap();
        platform
    }

    #[tokio::test]
    async fn test_deploy_then_list_by_model() {
        let dir = TempDir::new().unwrap();
        let platform = platform_with_cluster(&dir).await;
        let rf_image = image_for(&platform, dir.path(), "chd-rf").await;
        let lr_image = image_for(&platform, dir.path(), "chd-lr").await;

        platform.deploy_service(deploy("rf-svc", &rf_image)).await.unwrap();
        platform.deploy_service(deploy("lr-svc", &lr_image)).await.unwrap();

        let services = platform.list_services("chd-rf").await.unwrap();
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].name, "rf-svc");
        assert_eq!(services[0].state, ServiceState::Healthy);
        assert!(services[0].scoring_uri.is_some());
        assert!(platform.list_services("chd-svm").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deploy_existing_name_conflicts() {
        let dir = TempDir::new().unwrap();
        let platform = platform_with_cluster(&dir).await;
        let image = image_for(&platform, dir.path(), "chd-rf").await;

        platform.deploy_service(deploy("chd-svc", &image)).await.unwrap();
        let err = platform.deploy_service(deploy("chd-svc", &image)).await.unwrap_err();
        assert!(matches!(err, PlatformError::Conflict { .. }));

        platform.delete_service("chd-svc").await.unwrap();
        platform.deploy_service(deploy("chd-svc", &image)).await.unwrap();
        assert!(platform.delete_service("other").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_deploy_requires_inference_cluster() {
        let dir = TempDir::new().unwrap();
        let platform = LocalPlatform::new(dir.path().join("ws"));
        let image = image_for(&platform, dir.path(), "chd-rf").await;

        let err = platform.deploy_service(deploy("chd-svc", &image)).await.unwrap_err();
        assert!(err.is_not_found());

        platform
            .create_compute(CreateCompute::training("aks-cluster"))
            .await
            .unwrap();
        let err = platform.deploy_service(deploy("chd-svc", &image)).await.unwrap_err();
        assert!(matches!(err, PlatformError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_monitoring_update_and_keys() {
        let dir = TempDir::new().unwrap();
        let platform = platform_with_cluster(&dir).await;
        let image = image_for(&platform, dir.path(), "chd-rf").await;
        platform.deploy_service(deploy("chd-svc", &image)).await.unwrap();

        let updated = platform
            .update_service("chd-svc", UpdateService::enable_monitoring())
            .await
            .unwrap();
        assert!(updated.app_insights_enabled);
        assert!(updated.collect_model_data);

        let keys = platform.get_keys("chd-svc").await.unwrap();
        assert_eq!(keys.primary_key.len(), 32);
        assert_ne!(keys.primary_key, keys.secondary_key);
    }

    #[tokio::test]
    async fn test_create_compute_twice_conflicts() {
        let dir = TempDir::new().unwrap();
        let platform = LocalPlatform::new(dir.path());

        let target = platform
            .create_compute(CreateCompute::training("cpu-cluster"))
            .await
            .unwrap();
        assert_eq!(target.provisioning_state, ProvisioningState::Succeeded);
        assert_eq!(target.max_nodes, 4);

        let err = platform
            .create_compute(CreateCompute::training("cpu-cluster"))
            .await
            .unwrap_err();
        assert!(matches!(err, PlatformError::Conflict { .. }));
        assert_eq!(platform.list_compute().await.unwrap().len(), 1);
    }
}
