//! Backend prompt template (library) endpoints.

use serde::{Deserialize, Serialize};

use super::{ApiClient, ApiError};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub prompt: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub usage_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateCreate {
    pub name: String,
    pub prompt: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TemplateUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplatesResponse {
    pub templates: Vec<Template>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateResponse {
    pub template: Template,
}

impl ApiClient {
    pub async fn templates(
        &self,
        category: Option<&str>,
        search: Option<&str>,
    ) -> Result<TemplatesResponse, ApiError> {
        let mut path = "/api/templates".to_string();
        let mut sep = '?';
        if let Some(category) = category {
            path.push(sep);
            path.push_str(&format!("category={category}"));
            sep = '&';
        }
        if let Some(search) = search {
            path.push(sep);
            path.push_str(&format!("search={search}"));
        }
        self.get_json(&path).await
    }

    pub async fn create_template(
        &self,
        request: &TemplateCreate,
    ) -> Result<TemplateResponse, ApiError> {
        self.post_json("/api/templates", request).await
    }

    pub async fn template(&self, template_id: &str) -> Result<TemplateResponse, ApiError> {
        self.get_json(&format!("/api/templates/{template_id}")).await
    }

    pub async fn update_template(
        &self,
        template_id: &str,
        request: &TemplateUpdate,
    ) -> Result<TemplateResponse, ApiError> {
        self.put_json(&format!("/api/templates/{template_id}"), request)
            .await
    }

    pub async fn delete_template(&self, template_id: &str) -> Result<serde_json::Value, ApiError> {
        self.delete_json(&format!("/api/templates/{template_id}")).await
    }

    /// Bump the backend-side usage counter when a template is applied.
    pub async fn record_template_use(
        &self,
        template_id: &str,
    ) -> Result<serde_json::Value, ApiError> {
        self.post_json(&format!("/api/templates/{template_id}/use"), &serde_json::json!({}))
            .await
    }
}
