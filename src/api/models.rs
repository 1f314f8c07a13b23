//! Model listing per provider.

use serde::Deserialize;

use super::{ApiClient, ApiError};

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<String>,
}

impl ApiClient {
    /// `GET /api/models/{provider}` — providers the backend knows are
    /// `ollama`, `gemini`, and `openai`; anything else is a 400.
    pub async fn list_models(&self, provider: &str) -> Result<ModelsResponse, ApiError> {
        self.get_json(&format!("/api/models/{provider}")).await
    }
}
