use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use chrono::Utc;
use dirs::data_dir;
use once_cell::sync::Lazy;
use reqwest::Client;
use rusqlite::{params, Connection, OptionalExtension};
use tokio_rusqlite::Connection as AsyncConn;

use crate::config::{paths, timeouts};

// ----------------------------------------------------------------------------
// Constants and paths
// ----------------------------------------------------------------------------

pub static APP_NAME: &str = "PEStudio";
pub static BACKEND_BASE_DEFAULT: &str = "http://127.0.0.1:8000";

pub static DATA_DIR: Lazy<PathBuf> = Lazy::new(|| {
    if let Ok(dir) = std::env::var("PESTUDIO_DATA_DIR") {
        return PathBuf::from(dir);
    }
    let base = data_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join(APP_NAME)
});

pub static LOGS_DIR: Lazy<PathBuf> = Lazy::new(|| DATA_DIR.join("logs"));

pub fn studio_db_path() -> PathBuf {
    DATA_DIR.join(paths::STUDIO_DB)
}

// ----------------------------------------------------------------------------
// Client configuration
// ----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StudioConfig {
    pub base_url: String,
    pub handshake_timeout: Duration,
    pub request_timeout: Duration,
    pub stream_idle_timeout: Duration,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            base_url: BACKEND_BASE_DEFAULT.to_string(),
            handshake_timeout: Duration::from_secs(timeouts::HANDSHAKE_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(timeouts::REQUEST_TIMEOUT_SECS),
            stream_idle_timeout: Duration::from_millis(timeouts::STREAM_IDLE_TIMEOUT_MS),
        }
    }
}

impl StudioConfig {
    /// Load configuration from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - PESTUDIO_BASE_URL: Backend base URL (default: http://127.0.0.1:8000)
    /// - PESTUDIO_STREAM_IDLE_MS: Idle window before an orchestration stream is failed
    /// - PESTUDIO_REQUEST_TIMEOUT_SECS: Per-request timeout for plain API calls
    pub fn from_env() -> Self {
        let base_url = std::env::var("PESTUDIO_BASE_URL")
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| BACKEND_BASE_DEFAULT.to_string());

        let stream_idle_timeout = std::env::var("PESTUDIO_STREAM_IDLE_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(timeouts::STREAM_IDLE_TIMEOUT_MS));

        let request_timeout = std::env::var("PESTUDIO_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(timeouts::REQUEST_TIMEOUT_SECS));

        Self {
            base_url,
            handshake_timeout: Duration::from_secs(timeouts::HANDSHAKE_TIMEOUT_SECS),
            request_timeout,
            stream_idle_timeout,
        }
    }

    pub fn user_agent() -> String {
        format!("{}/cli {}", APP_NAME, env!("CARGO_PKG_VERSION"))
    }
}

/// Shared HTTP client. One connection pool for the whole process.
pub fn build_http_client() -> Client {
    Client::builder()
        .user_agent(StudioConfig::user_agent())
        .build()
        .unwrap_or_default()
}

// ----------------------------------------------------------------------------
// Local database
// ----------------------------------------------------------------------------

pub fn configure_sqlite(conn: &Connection) -> anyhow::Result<()> {
    conn.busy_timeout(Duration::from_millis(5_000))
        .context("sqlite busy_timeout 5s")?;
    conn.pragma_update(None, "journal_mode", "WAL")
        .context("sqlite journal_mode=WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .context("sqlite synchronous=NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .context("sqlite foreign_keys=ON")?;
    Ok(())
}

pub fn init_database(db_path: &PathBuf) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).context("create data dir")?;
    }
    let conn = Connection::open(db_path).context("open sqlite")?;
    configure_sqlite(&conn).context("configure sqlite init")?;

    ensure_schema_version_table(&conn).context("ensure schema_version table")?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS template (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            prompt TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            category TEXT NOT NULL DEFAULT 'General',
            tags_json TEXT NOT NULL DEFAULT '[]',
            usage_count INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS generation (
            id TEXT PRIMARY KEY,
            prompt TEXT NOT NULL,
            provider TEXT NOT NULL,
            model TEXT NOT NULL,
            techniques_json TEXT NOT NULL,
            results_json TEXT NOT NULL,
            total_tokens INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS setting (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_generation_created ON generation (created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_template_category ON template (category);
        "#,
    )
    .context("apply migrations")?;

    record_schema_version(&conn, paths::SCHEMA_VERSION).context("record schema version")?;

    Ok(())
}

pub async fn open_database(db_path: &PathBuf) -> anyhow::Result<AsyncConn> {
    init_database(db_path)?;
    let conn = AsyncConn::open(db_path.clone())
        .await
        .context("open async sqlite")?;
    conn.call(|conn| configure_sqlite(conn).map_err(|err| tokio_rusqlite::Error::Other(err.into())))
        .await
        .context("configure async sqlite")?;
    Ok(conn)
}

/// Ensure schema_version table exists for tracking migrations.
fn ensure_schema_version_table(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            component TEXT PRIMARY KEY,
            version INTEGER NOT NULL,
            applied_at INTEGER NOT NULL
        );
        "#,
    )
    .context("create schema_version table")?;
    Ok(())
}

/// Record a successful schema migration.
fn record_schema_version(conn: &Connection, version: i64) -> anyhow::Result<()> {
    let now = Utc::now().timestamp();
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (component, version, applied_at) \
         VALUES (?1, ?2, ?3)",
        params![paths::SCHEMA_COMPONENT, version, now],
    )
    .context("record schema version")?;
    Ok(())
}

/// Get current schema version for a component.
pub fn get_schema_version(conn: &Connection, component: &str) -> anyhow::Result<Option<i64>> {
    let version = conn
        .query_row(
            "SELECT version FROM schema_version WHERE component = ?1",
            params![component],
            |row| row.get(0),
        )
        .optional()
        .context("query schema version")?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_database_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("studio.db");
        init_database(&path).expect("first init");
        init_database(&path).expect("second init");

        let conn = Connection::open(&path).expect("open");
        let version = get_schema_version(&conn, paths::SCHEMA_COMPONENT).expect("version");
        assert_eq!(version, Some(paths::SCHEMA_VERSION));
    }

    #[test]
    fn config_default_points_at_local_backend() {
        let cfg = StudioConfig::default();
        assert_eq!(cfg.base_url, BACKEND_BASE_DEFAULT);
        assert!(cfg.stream_idle_timeout > Duration::from_secs(120));
    }
}
