//! Container image DTOs

use serde::{Deserialize, Serialize};

/// Request to build a container image around registered models
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateImage {
    pub name: String,
    pub model_ids: Vec<String>,
    pub config: ImageConfig,
}

/// How the image serves requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// File name of the scoring entry point inside the image
    pub execution_script: String,
    /// Rendered scoring script source
    pub script_source: String,
    pub runtime: String,
    pub dependencies: CondaDependencies,
}

/// Package requirements of the scoring environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CondaDependencies {
    pub conda_packages: Vec<String>,
    pub pip_packages: Vec<String>,
}

impl CondaDependencies {
    /// Packages needed to serve a scikit-learn classifier with monitoring
    pub fn scoring() -> Self {
        Self {
            conda_packages: vec!["numpy".to_string(), "scikit-learn".to_string()],
            pip_packages: vec![
                "azureml-sdk".to_string(),
                "azureml-monitoring".to_string(),
            ],
        }
    }
}
