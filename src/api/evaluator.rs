//! Evaluation suite endpoints.
//!
//! The reports the evaluator returns are analysis payloads rendered as-is, so
//! they stay `serde_json::Value`; the request side is fully typed.

use serde::Serialize;

use super::{ApiClient, ApiError};
use crate::dataset::DatasetExample;

#[derive(Debug, Clone, Serialize)]
pub struct OfflineEvaluationRequest {
    pub dataset: Vec<DatasetExample>,
    pub prompts: Vec<String>,
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsistencyRequest {
    pub prompt: String,
    pub n_samples: u32,
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RobustnessRequest {
    pub prompt: String,
    pub dataset: Vec<DatasetExample>,
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LengthRobustnessRequest {
    pub prompt: String,
    pub dataset: Vec<DatasetExample>,
    pub max_context_length: u32,
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdversarialRobustnessRequest {
    pub prompt: String,
    pub dataset: Vec<DatasetExample>,
    pub level: String,
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MutualConsistencyRequest {
    pub prompts: Vec<String>,
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FullReportRequest {
    pub prompt: String,
    pub dataset: Vec<DatasetExample>,
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizerRequest {
    pub base_prompt: String,
    pub dataset: Vec<DatasetExample>,
    pub provider: String,
    pub model: String,
}

impl ApiClient {
    pub async fn evaluate_offline(
        &self,
        request: &OfflineEvaluationRequest,
    ) -> Result<serde_json::Value, ApiError> {
        self.post_json("/api/evaluator/offline", request).await
    }

    pub async fn evaluate_consistency(
        &self,
        request: &ConsistencyRequest,
    ) -> Result<serde_json::Value, ApiError> {
        self.post_json("/api/evaluator/consistency", request).await
    }

    pub async fn evaluate_robustness(
        &self,
        request: &RobustnessRequest,
    ) -> Result<serde_json::Value, ApiError> {
        self.post_json("/api/evaluator/robustness", request).await
    }

    pub async fn evaluate_format_robustness(
        &self,
        request: &RobustnessRequest,
    ) -> Result<serde_json::Value, ApiError> {
        self.post_json("/api/evaluator/robustness/format", request).await
    }

    pub async fn evaluate_length_robustness(
        &self,
        request: &LengthRobustnessRequest,
    ) -> Result<serde_json::Value, ApiError> {
        self.post_json("/api/evaluator/robustness/length", request).await
    }

    pub async fn evaluate_adversarial_robustness(
        &self,
        request: &AdversarialRobustnessRequest,
    ) -> Result<serde_json::Value, ApiError> {
        self.post_json("/api/evaluator/robustness/adversarial", request)
            .await
    }

    pub async fn evaluate_mutual_consistency(
        &self,
        request: &MutualConsistencyRequest,
    ) -> Result<serde_json::Value, ApiError> {
        self.post_json("/api/evaluator/mutual-consistency", request).await
    }

    pub async fn full_report(
        &self,
        request: &FullReportRequest,
    ) -> Result<serde_json::Value, ApiError> {
        self.post_json("/api/evaluator/full_report", request).await
    }

    pub async fn optimize_prompt(
        &self,
        request: &OptimizerRequest,
    ) -> Result<serde_json::Value, ApiError> {
        self.post_json("/api/evaluator/optimizer", request).await
    }

    pub async fn evaluator_telemetry(
        &self,
        time_range: &str,
    ) -> Result<serde_json::Value, ApiError> {
        self.get_json(&format!("/api/evaluator/telemetry?time_range={time_range}"))
            .await
    }
}
