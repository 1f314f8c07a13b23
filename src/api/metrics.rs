//! Text/corpus metric endpoints.

use serde::Serialize;

use super::{ApiClient, ApiError};

#[derive(Debug, Clone, Serialize)]
pub struct TextMetricsRequest {
    pub prediction: String,
    pub reference: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CorpusMetricsRequest {
    pub predictions: Vec<String>,
    pub references: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JudgeRequest {
    pub prompt: String,
    pub response: String,
    pub criteria: String,
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchJudgeRequest {
    pub prompt: String,
    pub responses: Vec<String>,
    pub criteria: String,
    pub provider: String,
    pub model: String,
}

impl ApiClient {
    pub async fn text_metrics(
        &self,
        request: &TextMetricsRequest,
    ) -> Result<serde_json::Value, ApiError> {
        self.post_json("/api/metrics/text", request).await
    }

    pub async fn corpus_metrics(
        &self,
        request: &CorpusMetricsRequest,
    ) -> Result<serde_json::Value, ApiError> {
        self.post_json("/api/metrics/corpus", request).await
    }

    pub async fn bleu(&self, request: &CorpusMetricsRequest) -> Result<serde_json::Value, ApiError> {
        self.post_json("/api/metrics/bleu", request).await
    }

    pub async fn rouge(&self, request: &CorpusMetricsRequest) -> Result<serde_json::Value, ApiError> {
        self.post_json("/api/metrics/rouge", request).await
    }

    pub async fn judge(&self, request: &JudgeRequest) -> Result<serde_json::Value, ApiError> {
        self.post_json("/api/metrics/judge", request).await
    }

    pub async fn judge_batch(
        &self,
        request: &BatchJudgeRequest,
    ) -> Result<serde_json::Value, ApiError> {
        self.post_json("/api/metrics/judge/batch", request).await
    }

    pub async fn available_metrics(&self) -> Result<serde_json::Value, ApiError> {
        self.get_json("/api/metrics/available").await
    }
}
