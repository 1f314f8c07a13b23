//! Backend generation history endpoints.

use serde::{Deserialize, Serialize};

use super::{ApiClient, ApiError};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HistoryEntry {
    pub id: String,
    #[serde(default)]
    pub timestamp: String,
    pub prompt: String,
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub techniques: Vec<String>,
    #[serde(default)]
    pub results: serde_json::Value,
    #[serde(default)]
    pub total_tokens: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub stats: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeletedResponse {
    pub message: String,
}

impl ApiClient {
    pub async fn history(&self, limit: Option<usize>) -> Result<HistoryResponse, ApiError> {
        let path = match limit {
            Some(limit) => format!("/api/history?limit={limit}"),
            None => "/api/history".to_string(),
        };
        self.get_json(&path).await
    }

    pub async fn history_entry(&self, generation_id: &str) -> Result<HistoryEntry, ApiError> {
        self.get_json(&format!("/api/history/{generation_id}")).await
    }

    pub async fn delete_history_entry(
        &self,
        generation_id: &str,
    ) -> Result<DeletedResponse, ApiError> {
        self.delete_json(&format!("/api/history/{generation_id}")).await
    }
}
