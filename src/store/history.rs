//! Local generation history store.
//!
//! Every successful generation is recorded so past prompts and their results
//! survive restarts and stay diffable against new attempts.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{params, Connection};
use uuid::Uuid;

use super::StoreError;
use crate::config::limits;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub id: String,
    pub prompt: String,
    pub provider: String,
    pub model: String,
    pub techniques: Vec<String>,
    pub results: serde_json::Value,
    pub total_tokens: u64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HistoryStats {
    pub total_generations: usize,
    pub total_tokens: u64,
    pub providers: HashMap<String, usize>,
    pub techniques: HashMap<String, usize>,
    pub most_used_technique: Option<String>,
}

#[derive(Clone)]
pub struct HistoryStore {
    db: Connection,
}

impl HistoryStore {
    pub fn new(db: Connection) -> Self {
        Self { db }
    }

    pub async fn save(
        &self,
        prompt: &str,
        provider: &str,
        model: &str,
        techniques: &[String],
        results: serde_json::Value,
        total_tokens: u64,
    ) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let record_id = id.clone();
        let prompt = prompt.to_string();
        let provider = provider.to_string();
        let model = model.to_string();
        let techniques_json = serde_json::to_string(techniques)?;
        let results_json = serde_json::to_string(&results)?;
        self.db
            .call(move |conn| -> tokio_rusqlite::Result<()> {
                conn.execute(
                    "INSERT INTO generation (id, prompt, provider, model, techniques_json, results_json, total_tokens, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        record_id,
                        prompt,
                        provider,
                        model,
                        techniques_json,
                        results_json,
                        total_tokens as i64,
                        Utc::now().timestamp()
                    ],
                )
                .map(|_| ())
                .map_err(tokio_rusqlite::Error::from)
            })
            .await?;
        tracing::debug!(generation_id = %id, "generation saved to history");
        Ok(id)
    }

    /// Most recent first. `None` falls back to the default listing cap.
    pub async fn list(&self, limit: Option<usize>) -> Result<Vec<GenerationRecord>, StoreError> {
        let limit = limit.unwrap_or(limits::DEFAULT_HISTORY_LIMIT);
        let rows = self
            .db
            .call(move |conn| -> tokio_rusqlite::Result<Vec<GenerationRecord>> {
                let mut stmt = conn.prepare(
                    "SELECT id, prompt, provider, model, techniques_json, results_json, total_tokens, created_at
                     FROM generation ORDER BY created_at DESC, id DESC LIMIT ?1",
                )?;
                let rows = stmt
                    .query_map(params![limit as i64], map_generation)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;
        Ok(rows)
    }

    pub async fn get(&self, generation_id: &str) -> Result<GenerationRecord, StoreError> {
        let id = generation_id.to_string();
        let found = self
            .db
            .call(move |conn| -> tokio_rusqlite::Result<Option<GenerationRecord>> {
                let mut stmt = conn.prepare(
                    "SELECT id, prompt, provider, model, techniques_json, results_json, total_tokens, created_at
                     FROM generation WHERE id = ?1",
                )?;
                let mut rows = stmt.query(params![id])?;
                match rows.next()? {
                    Some(row) => Ok(Some(map_generation(row)?)),
                    None => Ok(None),
                }
            })
            .await?;
        found.ok_or_else(|| StoreError::NotFound(format!("generation {generation_id}")))
    }

    pub async fn delete(&self, generation_id: &str) -> Result<bool, StoreError> {
        let id = generation_id.to_string();
        let deleted = self
            .db
            .call(move |conn| -> tokio_rusqlite::Result<usize> {
                conn.execute("DELETE FROM generation WHERE id = ?1", params![id])
                    .map_err(tokio_rusqlite::Error::from)
            })
            .await?;
        Ok(deleted > 0)
    }

    pub async fn clear(&self) -> Result<usize, StoreError> {
        let deleted = self
            .db
            .call(|conn| -> tokio_rusqlite::Result<usize> {
                conn.execute("DELETE FROM generation", [])
                    .map_err(tokio_rusqlite::Error::from)
            })
            .await?;
        Ok(deleted)
    }

    /// Aggregate counts over the full history, not just the listing window.
    pub async fn stats(&self) -> Result<HistoryStats, StoreError> {
        let records = self
            .db
            .call(|conn| -> tokio_rusqlite::Result<Vec<GenerationRecord>> {
                let mut stmt = conn.prepare(
                    "SELECT id, prompt, provider, model, techniques_json, results_json, total_tokens, created_at
                     FROM generation",
                )?;
                let rows = stmt
                    .query_map([], map_generation)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;

        let mut stats = HistoryStats {
            total_generations: records.len(),
            ..Default::default()
        };
        for record in &records {
            stats.total_tokens += record.total_tokens;
            *stats.providers.entry(record.provider.clone()).or_default() += 1;
            for technique in &record.techniques {
                *stats.techniques.entry(technique.clone()).or_default() += 1;
            }
        }
        stats.most_used_technique = stats
            .techniques
            .iter()
            .max_by_key(|(_, count)| **count)
            .map(|(name, _)| name.clone());
        Ok(stats)
    }
}

fn map_generation(row: &rusqlite::Row<'_>) -> rusqlite::Result<GenerationRecord> {
    let techniques_json: String = row.get(4)?;
    let results_json: String = row.get(5)?;
    Ok(GenerationRecord {
        id: row.get(0)?,
        prompt: row.get(1)?,
        provider: row.get(2)?,
        model: row.get(3)?,
        techniques: serde_json::from_str(&techniques_json).unwrap_or_default(),
        results: serde_json::from_str(&results_json).unwrap_or(serde_json::Value::Null),
        total_tokens: row.get::<_, i64>(6)? as u64,
        created_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_util::fresh_db;

    async fn seed(store: &HistoryStore, provider: &str, techniques: &[&str], tokens: u64) -> String {
        store
            .save(
                "prompt",
                provider,
                "llama2",
                &techniques.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
                serde_json::json!([{"response": "ok"}]),
                tokens,
            )
            .await
            .expect("save")
    }

    #[tokio::test]
    async fn save_list_get_delete() {
        let (_dir, db) = fresh_db().await;
        let store = HistoryStore::new(db);
        let id = seed(&store, "ollama", &["cot"], 42).await;

        let listed = store.list(None).await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, id);

        let fetched = store.get(&id).await.expect("get");
        assert_eq!(fetched.total_tokens, 42);
        assert_eq!(fetched.techniques, vec!["cot".to_string()]);

        assert!(store.delete(&id).await.expect("delete"));
        assert!(matches!(store.get(&id).await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn list_honors_limit() {
        let (_dir, db) = fresh_db().await;
        let store = HistoryStore::new(db);
        for _ in 0..3 {
            seed(&store, "ollama", &["cot"], 1).await;
        }
        let listed = store.list(Some(2)).await.expect("list");
        assert_eq!(listed.len(), 2);
    }

    #[tokio::test]
    async fn stats_aggregate_across_records() {
        let (_dir, db) = fresh_db().await;
        let store = HistoryStore::new(db);
        seed(&store, "ollama", &["cot", "few_shot"], 10).await;
        seed(&store, "openai", &["cot"], 20).await;

        let stats = store.stats().await.expect("stats");
        assert_eq!(stats.total_generations, 2);
        assert_eq!(stats.total_tokens, 30);
        assert_eq!(stats.providers.get("ollama"), Some(&1));
        assert_eq!(stats.techniques.get("cot"), Some(&2));
        assert_eq!(stats.most_used_technique.as_deref(), Some("cot"));

        assert_eq!(store.clear().await.expect("clear"), 2);
        let empty = store.stats().await.expect("stats");
        assert_eq!(empty.total_generations, 0);
        assert!(empty.most_used_technique.is_none());
    }
}
