//! Backend dataset endpoints: CRUD, example sets, generation, HF catalog.

use serde::{Deserialize, Serialize};

use super::{ApiClient, ApiError};
use crate::dataset::DatasetExample;

/// Dataset metadata as listed by the backend (no example data attached).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatasetMeta {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub size: usize,
    #[serde(default, rename = "createdAt")]
    pub created_at: String,
    #[serde(default, rename = "updatedAt")]
    pub updated_at: String,
}

/// Full dataset including its examples.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Dataset {
    #[serde(flatten)]
    pub meta: DatasetMeta,
    #[serde(default)]
    pub data: Vec<DatasetExample>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetCreate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub data: Vec<DatasetExample>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DatasetUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<DatasetExample>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetsResponse {
    pub datasets: Vec<DatasetMeta>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetResponse {
    pub dataset: Dataset,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExampleDatasetsResponse {
    pub examples: Vec<serde_json::Value>,
}

/// Synthetic dataset generation. Modes mirror the backend catalog:
/// `from_task`, `from_examples`, `from_prompt`, `edge_cases`.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetGenerateRequest {
    pub mode: String,
    pub task_type: String,
    pub count: u32,
    pub difficulty: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub include_edge_cases: bool,
    #[serde(default)]
    pub task_description: String,
    #[serde(default)]
    pub seed_examples: Vec<DatasetExample>,
    #[serde(default)]
    pub prompt_to_test: String,
    pub provider: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default)]
    pub save_as_dataset: bool,
    #[serde(default)]
    pub dataset_name: String,
    #[serde(default)]
    pub dataset_description: String,
}

impl DatasetGenerateRequest {
    pub fn from_task(task_description: impl Into<String>, count: u32) -> Self {
        Self {
            mode: "from_task".to_string(),
            task_type: "custom".to_string(),
            count,
            difficulty: "mixed".to_string(),
            domain: String::new(),
            include_edge_cases: false,
            task_description: task_description.into(),
            seed_examples: Vec::new(),
            prompt_to_test: String::new(),
            provider: "ollama".to_string(),
            model: "llama2".to_string(),
            api_key: None,
            save_as_dataset: false,
            dataset_name: String::new(),
            dataset_description: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HfImportRequest {
    pub dataset_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_key: Option<String>,
}

impl ApiClient {
    pub async fn datasets(&self) -> Result<DatasetsResponse, ApiError> {
        self.get_json("/api/datasets").await
    }

    pub async fn dataset(&self, dataset_id: &str) -> Result<DatasetResponse, ApiError> {
        self.get_json(&format!("/api/datasets/{dataset_id}")).await
    }

    pub async fn create_dataset(&self, request: &DatasetCreate) -> Result<DatasetResponse, ApiError> {
        self.post_json("/api/datasets", request).await
    }

    pub async fn update_dataset(
        &self,
        dataset_id: &str,
        request: &DatasetUpdate,
    ) -> Result<DatasetResponse, ApiError> {
        self.put_json(&format!("/api/datasets/{dataset_id}"), request).await
    }

    pub async fn delete_dataset(&self, dataset_id: &str) -> Result<serde_json::Value, ApiError> {
        self.delete_json(&format!("/api/datasets/{dataset_id}")).await
    }

    pub async fn example_datasets(&self) -> Result<ExampleDatasetsResponse, ApiError> {
        self.get_json("/api/datasets/examples/list").await
    }

    pub async fn dataset_generation_modes(&self) -> Result<serde_json::Value, ApiError> {
        self.get_json("/api/datasets/generate/modes").await
    }

    pub async fn generate_dataset(
        &self,
        request: &DatasetGenerateRequest,
    ) -> Result<serde_json::Value, ApiError> {
        self.post_json("/api/datasets/generate", request).await
    }

    pub async fn search_hf_catalog(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<serde_json::Value, ApiError> {
        self.get_json(&format!("/api/datasets/catalog/hf/search?q={query}&limit={limit}"))
            .await
    }

    pub async fn import_hf_dataset(
        &self,
        request: &HfImportRequest,
    ) -> Result<serde_json::Value, ApiError> {
        self.post_json("/api/datasets/catalog/hf/import", request).await
    }

    pub async fn inspect_hf_dataset(
        &self,
        request: &HfImportRequest,
    ) -> Result<serde_json::Value, ApiError> {
        self.post_json("/api/datasets/catalog/hf/inspect", request).await
    }
}
