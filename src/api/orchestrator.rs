//! Non-streaming orchestration endpoints: fallback run, artifacts, testing.
//!
//! The streaming variant lives in [`crate::run`]; everything here is a plain
//! request/response call.

use serde::{Deserialize, Serialize};

use super::{ApiClient, ApiError};
use crate::run::OrchestrateRequest;

#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsResponse {
    pub artifacts: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactDetail {
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub program_code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestArtifactRequest {
    pub artifact_id: String,
    pub input: String,
    pub target_lm: String,
    pub program_code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestArtifactResponse {
    pub output: String,
}

impl ApiClient {
    /// Blocking fallback for environments where SSE is unavailable. The
    /// response is the same terminal payload the stream delivers on `complete`.
    pub async fn orchestrate(
        &self,
        request: &OrchestrateRequest,
    ) -> Result<serde_json::Value, ApiError> {
        self.post_json("/api/dspy/orchestrate", request).await
    }

    pub async fn artifacts(&self) -> Result<ArtifactsResponse, ApiError> {
        self.get_json("/api/dspy/artifacts").await
    }

    pub async fn artifact(&self, artifact_id: &str) -> Result<ArtifactDetail, ApiError> {
        self.get_json(&format!("/api/dspy/artifacts/{artifact_id}")).await
    }

    /// Post-run action; failures here are isolated from any run state.
    pub async fn test_artifact(
        &self,
        request: &TestArtifactRequest,
    ) -> Result<TestArtifactResponse, ApiError> {
        self.post_json("/api/dspy/test", request).await
    }
}
