//! Prompt generation, title generation, and technique/analysis endpoints.

use serde::{Deserialize, Serialize};

use super::{ApiClient, ApiError};

#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub prompt: String,
    pub provider: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub techniques: Vec<String>,
}

/// One technique's generation outcome. The technique descriptor is backend
/// configuration (name, description, template hints) and stays opaque.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TechniqueResult {
    pub technique: serde_json::Value,
    pub response: String,
    #[serde(default)]
    pub tokens: u64,
    #[serde(default)]
    pub error: bool,
}

impl TechniqueResult {
    pub fn technique_name(&self) -> &str {
        self.technique
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    pub results: Vec<TechniqueResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TitleRequest {
    pub prompt_text: String,
    pub provider: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TitleResponse {
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TechniquesResponse {
    pub techniques: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct PromptSetupRequest {
    pub task_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_preview_examples: Option<u32>,
}

/// Advisor output for the prompt-setup screen. Hint blocks are free-form
/// advisor JSON; the plan steps are the part the client renders directly.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptSetupPlan {
    #[serde(default)]
    pub task_profile: serde_json::Value,
    #[serde(default)]
    pub dataset_hint: serde_json::Value,
    #[serde(default)]
    pub benchmark_hint: serde_json::Value,
    #[serde(default)]
    pub technique_suggestions: serde_json::Value,
    #[serde(default)]
    pub local_dataset_recommendations: serde_json::Value,
    #[serde(default)]
    pub hf_suggestions: serde_json::Value,
    #[serde(default)]
    pub generator_suggestion: serde_json::Value,
    #[serde(default)]
    pub dspy_recommendation: serde_json::Value,
    #[serde(default)]
    pub steps: Vec<String>,
}

impl ApiClient {
    pub async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ApiError> {
        self.post_json("/api/generate", request).await
    }

    pub async fn generate_title(&self, request: &TitleRequest) -> Result<TitleResponse, ApiError> {
        self.post_json("/api/generate-title", request).await
    }

    pub async fn techniques(&self) -> Result<TechniquesResponse, ApiError> {
        self.get_json("/api/techniques").await
    }

    pub async fn analyze_prompt_setup(
        &self,
        request: &PromptSetupRequest,
    ) -> Result<PromptSetupPlan, ApiError> {
        self.post_json("/api/analysis/prompt-setup", request).await
    }
}
