//! Local persistent stores: prompt library, generation history, settings.
//!
//! All state that the studio keeps on the client side lives in one SQLite
//! database and is reached through explicitly passed store handles — there is
//! no ambient global state.

pub mod history;
pub mod settings;
pub mod templates;

pub use history::{GenerationRecord, HistoryStats, HistoryStore};
pub use settings::{SettingsStore, StudioSettings};
pub use templates::{LocalTemplate, TemplateDraft, TemplateStore};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] tokio_rusqlite::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("not found: {0}")]
    NotFound(String),
}

#[cfg(test)]
pub(crate) mod test_util {
    use crate::core::open_database;
    use tokio_rusqlite::Connection;

    /// Fresh database in a tempdir; the dir guard must outlive the connection.
    pub async fn fresh_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("studio.db");
        let conn = open_database(&path).await.expect("open db");
        (dir, conn)
    }
}
