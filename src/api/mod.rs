//! Typed client for the PE Studio backend API.
//!
//! One `ApiClient` per process; endpoint groups live in the submodules. All
//! calls are single-shot — a failed request is surfaced, never retried.

pub mod datasets;
pub mod evaluator;
pub mod generate;
pub mod history;
pub mod metrics;
pub mod models;
pub mod orchestrator;
pub mod settings;
pub mod templates;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::core::StudioConfig;
use crate::net::join_endpoint;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend returned {status}: {detail}")]
    Status { status: u16, detail: String },
}

impl ApiError {
    /// HTTP status of a backend-side rejection, when there is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(_) => None,
        }
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: StudioConfig,
}

impl ApiClient {
    pub fn new(http: reqwest::Client, config: StudioConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    fn url(&self, path: &str) -> String {
        join_endpoint(&self.config.base_url, path)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let rid = format!("req-{}", Uuid::new_v4());
        let resp = builder
            .header("X-Request-Id", rid)
            .timeout(self.config.request_timeout)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let detail = match resp.text().await {
                Ok(text) if !text.is_empty() => extract_detail(&text),
                _ => status
                    .canonical_reason()
                    .unwrap_or("upstream failure")
                    .to_string(),
            };
            return Err(ApiError::Status {
                status: status.as_u16(),
                detail,
            });
        }
        Ok(resp.json().await?)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute(self.http.get(self.url(path))).await
    }

    pub(crate) async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.execute(self.http.post(self.url(path)).json(body)).await
    }

    pub(crate) async fn put_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.execute(self.http.put(self.url(path)).json(body)).await
    }

    pub(crate) async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute(self.http.delete(self.url(path))).await
    }
}

/// FastAPI wraps error messages as `{"detail": "..."}`; unwrap when present so
/// the user sees the message, not the envelope.
fn extract_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(String::from))
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_unwraps_fastapi_envelope() {
        assert_eq!(
            extract_detail(r#"{"detail":"Dataset must have at least 5 examples"}"#),
            "Dataset must have at least 5 examples"
        );
        assert_eq!(extract_detail("plain text"), "plain text");
    }
}
