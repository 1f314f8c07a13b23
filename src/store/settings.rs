//! Client settings store.
//!
//! Plain preferences are key/value rows. Provider API keys go through
//! `secrecy` so they never show up in debug output or serialized settings;
//! the UI only ever learns whether a key exists.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{params, Connection};

use super::StoreError;

const KEY_THEME: &str = "theme";
const KEY_DEFAULT_PROVIDER: &str = "default_provider";
const KEY_AUTO_SAVE: &str = "auto_save";
const API_KEY_PREFIX: &str = "api_key:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudioSettings {
    pub theme: String,
    pub default_provider: String,
    pub auto_save: bool,
}

impl Default for StudioSettings {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
            default_provider: "ollama".to_string(),
            auto_save: true,
        }
    }
}

#[derive(Clone)]
pub struct SettingsStore {
    db: Connection,
}

impl SettingsStore {
    pub fn new(db: Connection) -> Self {
        Self { db }
    }

    async fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        let key = key.to_string();
        let value = self
            .db
            .call(move |conn| -> tokio_rusqlite::Result<Option<String>> {
                let mut stmt = conn.prepare("SELECT value FROM setting WHERE key = ?1")?;
                let mut rows = stmt.query(params![key])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row.get(0)?)),
                    None => Ok(None),
                }
            })
            .await?;
        Ok(value)
    }

    async fn set_raw(&self, key: &str, value: String) -> Result<(), StoreError> {
        let key = key.to_string();
        self.db
            .call(move |conn| -> tokio_rusqlite::Result<()> {
                conn.execute(
                    "INSERT OR REPLACE INTO setting (key, value, updated_at) VALUES (?1, ?2, ?3)",
                    params![key, value, chrono::Utc::now().timestamp()],
                )
                .map(|_| ())
                .map_err(tokio_rusqlite::Error::from)
            })
            .await?;
        Ok(())
    }

    async fn delete_raw(&self, key: &str) -> Result<bool, StoreError> {
        let key = key.to_string();
        let deleted = self
            .db
            .call(move |conn| -> tokio_rusqlite::Result<usize> {
                conn.execute("DELETE FROM setting WHERE key = ?1", params![key])
                    .map_err(tokio_rusqlite::Error::from)
            })
            .await?;
        Ok(deleted > 0)
    }

    /// Missing rows resolve to defaults, so a fresh database behaves like a
    /// fresh install rather than an error.
    pub async fn load(&self) -> Result<StudioSettings, StoreError> {
        let defaults = StudioSettings::default();
        let theme = self.get_raw(KEY_THEME).await?.unwrap_or(defaults.theme);
        let default_provider = self
            .get_raw(KEY_DEFAULT_PROVIDER)
            .await?
            .unwrap_or(defaults.default_provider);
        let auto_save = self
            .get_raw(KEY_AUTO_SAVE)
            .await?
            .map(|v| v == "true")
            .unwrap_or(defaults.auto_save);
        Ok(StudioSettings {
            theme,
            default_provider,
            auto_save,
        })
    }

    pub async fn save(&self, settings: &StudioSettings) -> Result<(), StoreError> {
        self.set_raw(KEY_THEME, settings.theme.clone()).await?;
        self.set_raw(KEY_DEFAULT_PROVIDER, settings.default_provider.clone())
            .await?;
        self.set_raw(KEY_AUTO_SAVE, settings.auto_save.to_string())
            .await?;
        Ok(())
    }

    pub async fn set_api_key(&self, provider: &str, key: SecretString) -> Result<(), StoreError> {
        self.set_raw(
            &format!("{API_KEY_PREFIX}{provider}"),
            key.expose_secret().to_string(),
        )
        .await
    }

    pub async fn api_key(&self, provider: &str) -> Result<Option<SecretString>, StoreError> {
        Ok(self
            .get_raw(&format!("{API_KEY_PREFIX}{provider}"))
            .await?
            .map(SecretString::new))
    }

    pub async fn delete_api_key(&self, provider: &str) -> Result<bool, StoreError> {
        self.delete_raw(&format!("{API_KEY_PREFIX}{provider}")).await
    }

    pub async fn has_api_key(&self, provider: &str) -> Result<bool, StoreError> {
        Ok(self.api_key(provider).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_util::fresh_db;

    #[tokio::test]
    async fn fresh_store_yields_defaults() {
        let (_dir, db) = fresh_db().await;
        let store = SettingsStore::new(db);
        let settings = store.load().await.expect("load");
        assert_eq!(settings, StudioSettings::default());
    }

    #[tokio::test]
    async fn save_load_roundtrip() {
        let (_dir, db) = fresh_db().await;
        let store = SettingsStore::new(db);
        let settings = StudioSettings {
            theme: "light".to_string(),
            default_provider: "openai".to_string(),
            auto_save: false,
        };
        store.save(&settings).await.expect("save");
        assert_eq!(store.load().await.expect("load"), settings);
    }

    #[tokio::test]
    async fn api_keys_set_read_delete() {
        let (_dir, db) = fresh_db().await;
        let store = SettingsStore::new(db);

        assert!(!store.has_api_key("openai").await.expect("has"));
        store
            .set_api_key("openai", SecretString::new("sk-test".to_string()))
            .await
            .expect("set");
        let key = store.api_key("openai").await.expect("get").expect("some");
        assert_eq!(key.expose_secret(), "sk-test");

        assert!(store.delete_api_key("openai").await.expect("delete"));
        assert!(!store.has_api_key("openai").await.expect("has"));
    }
}
