//! Prompt library store.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{params, Connection};
use uuid::Uuid;

use super::StoreError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalTemplate {
    pub id: String,
    pub name: String,
    pub prompt: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub usage_count: u64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Input for creating a template; everything else is assigned by the store.
#[derive(Debug, Clone, Default)]
pub struct TemplateDraft {
    pub name: String,
    pub prompt: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
}

#[derive(Clone)]
pub struct TemplateStore {
    db: Connection,
}

impl TemplateStore {
    pub fn new(db: Connection) -> Self {
        Self { db }
    }

    pub async fn create(&self, draft: TemplateDraft) -> Result<LocalTemplate, StoreError> {
        let template = LocalTemplate {
            id: Uuid::new_v4().to_string(),
            name: draft.name,
            prompt: draft.prompt,
            description: draft.description,
            category: if draft.category.is_empty() {
                "General".to_string()
            } else {
                draft.category
            },
            tags: draft.tags,
            usage_count: 0,
            created_at: Utc::now().timestamp(),
            updated_at: Utc::now().timestamp(),
        };
        let row = template.clone();
        let tags_json = serde_json::to_string(&row.tags)?;
        self.db
            .call(move |conn| -> tokio_rusqlite::Result<()> {
                conn.execute(
                    "INSERT INTO template (id, name, prompt, description, category, tags_json, usage_count, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        row.id,
                        row.name,
                        row.prompt,
                        row.description,
                        row.category,
                        tags_json,
                        row.usage_count as i64,
                        row.created_at,
                        row.updated_at
                    ],
                )
                .map(|_| ())
                .map_err(tokio_rusqlite::Error::from)
            })
            .await?;
        Ok(template)
    }

    pub async fn list(&self, category: Option<String>) -> Result<Vec<LocalTemplate>, StoreError> {
        let rows = self
            .db
            .call(move |conn| -> tokio_rusqlite::Result<Vec<LocalTemplate>> {
                let (sql, filter) = match &category {
                    Some(cat) => (
                        "SELECT id, name, prompt, description, category, tags_json, usage_count, created_at, updated_at
                         FROM template WHERE category = ?1 ORDER BY updated_at DESC",
                        Some(cat.clone()),
                    ),
                    None => (
                        "SELECT id, name, prompt, description, category, tags_json, usage_count, created_at, updated_at
                         FROM template ORDER BY updated_at DESC",
                        None,
                    ),
                };
                let mut stmt = conn.prepare(sql)?;
                let rows = match filter {
                    Some(cat) => stmt
                        .query_map(params![cat], map_template)?
                        .collect::<rusqlite::Result<Vec<_>>>()?,
                    None => stmt
                        .query_map([], map_template)?
                        .collect::<rusqlite::Result<Vec<_>>>()?,
                };
                Ok(rows)
            })
            .await?;
        Ok(rows)
    }

    pub async fn get(&self, template_id: &str) -> Result<LocalTemplate, StoreError> {
        let id = template_id.to_string();
        let found = self
            .db
            .call(move |conn| -> tokio_rusqlite::Result<Option<LocalTemplate>> {
                let mut stmt = conn.prepare(
                    "SELECT id, name, prompt, description, category, tags_json, usage_count, created_at, updated_at
                     FROM template WHERE id = ?1",
                )?;
                let mut rows = stmt.query(params![id])?;
                match rows.next()? {
                    Some(row) => Ok(Some(map_template(row)?)),
                    None => Ok(None),
                }
            })
            .await?;
        found.ok_or_else(|| StoreError::NotFound(format!("template {template_id}")))
    }

    /// Apply a partial update; untouched fields keep their values.
    pub async fn update(
        &self,
        template_id: &str,
        name: Option<String>,
        prompt: Option<String>,
        description: Option<String>,
        category: Option<String>,
        tags: Option<Vec<String>>,
    ) -> Result<LocalTemplate, StoreError> {
        let mut template = self.get(template_id).await?;
        if let Some(name) = name {
            template.name = name;
        }
        if let Some(prompt) = prompt {
            template.prompt = prompt;
        }
        if let Some(description) = description {
            template.description = description;
        }
        if let Some(category) = category {
            template.category = category;
        }
        if let Some(tags) = tags {
            template.tags = tags;
        }
        template.updated_at = Utc::now().timestamp();

        let row = template.clone();
        let tags_json = serde_json::to_string(&row.tags)?;
        self.db
            .call(move |conn| -> tokio_rusqlite::Result<()> {
                conn.execute(
                    "UPDATE template SET name = ?2, prompt = ?3, description = ?4, category = ?5, tags_json = ?6, updated_at = ?7
                     WHERE id = ?1",
                    params![row.id, row.name, row.prompt, row.description, row.category, tags_json, row.updated_at],
                )
                .map(|_| ())
                .map_err(tokio_rusqlite::Error::from)
            })
            .await?;
        Ok(template)
    }

    pub async fn delete(&self, template_id: &str) -> Result<bool, StoreError> {
        let id = template_id.to_string();
        let deleted = self
            .db
            .call(move |conn| -> tokio_rusqlite::Result<usize> {
                conn.execute("DELETE FROM template WHERE id = ?1", params![id])
                    .map_err(tokio_rusqlite::Error::from)
            })
            .await?;
        Ok(deleted > 0)
    }

    /// Bump the usage counter when a template is applied to a prompt form.
    pub async fn record_use(&self, template_id: &str) -> Result<(), StoreError> {
        let id = template_id.to_string();
        let changed = self
            .db
            .call(move |conn| -> tokio_rusqlite::Result<usize> {
                conn.execute(
                    "UPDATE template SET usage_count = usage_count + 1, updated_at = ?2 WHERE id = ?1",
                    params![id, Utc::now().timestamp()],
                )
                .map_err(tokio_rusqlite::Error::from)
            })
            .await?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("template {template_id}")));
        }
        Ok(())
    }
}

fn map_template(row: &rusqlite::Row<'_>) -> rusqlite::Result<LocalTemplate> {
    let tags_json: String = row.get(5)?;
    Ok(LocalTemplate {
        id: row.get(0)?,
        name: row.get(1)?,
        prompt: row.get(2)?,
        description: row.get(3)?,
        category: row.get(4)?,
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        usage_count: row.get::<_, i64>(6)? as u64,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_util::fresh_db;

    fn draft(name: &str) -> TemplateDraft {
        TemplateDraft {
            name: name.to_string(),
            prompt: "Summarize: {input}".to_string(),
            description: "test".to_string(),
            category: String::new(),
            tags: vec!["summarization".to_string()],
        }
    }

    #[tokio::test]
    async fn create_get_roundtrip() {
        let (_dir, db) = fresh_db().await;
        let store = TemplateStore::new(db);
        let created = store.create(draft("Summarizer")).await.expect("create");
        assert_eq!(created.category, "General");

        let fetched = store.get(&created.id).await.expect("get");
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn update_is_partial() {
        let (_dir, db) = fresh_db().await;
        let store = TemplateStore::new(db);
        let created = store.create(draft("Original")).await.expect("create");

        let updated = store
            .update(&created.id, Some("Renamed".to_string()), None, None, None, None)
            .await
            .expect("update");
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.prompt, created.prompt);
        assert_eq!(updated.tags, created.tags);
    }

    #[tokio::test]
    async fn record_use_counts_and_missing_id_errors() {
        let (_dir, db) = fresh_db().await;
        let store = TemplateStore::new(db);
        let created = store.create(draft("Counted")).await.expect("create");

        store.record_use(&created.id).await.expect("use 1");
        store.record_use(&created.id).await.expect("use 2");
        let fetched = store.get(&created.id).await.expect("get");
        assert_eq!(fetched.usage_count, 2);

        assert!(matches!(
            store.record_use("missing").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_reports_whether_anything_went() {
        let (_dir, db) = fresh_db().await;
        let store = TemplateStore::new(db);
        let created = store.create(draft("Doomed")).await.expect("create");
        assert!(store.delete(&created.id).await.expect("delete"));
        assert!(!store.delete(&created.id).await.expect("redelete"));
    }
}
