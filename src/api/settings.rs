//! Backend settings endpoint.

use serde::Deserialize;

use super::{ApiClient, ApiError};

#[derive(Debug, Clone, Deserialize)]
pub struct BackendSettings {
    #[serde(default)]
    pub settings: serde_json::Value,
    #[serde(default)]
    pub message: String,
}

impl ApiClient {
    pub async fn backend_settings(&self) -> Result<BackendSettings, ApiError> {
        self.get_json("/api/settings").await
    }
}
