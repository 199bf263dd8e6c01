//! SQLite-backed checkpoint store (SqliteSaver). Persistent across process restarts.
//!
//! One row per conversation key; the state is stored as a JSON payload.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};

use crate::memory::checkpointer::{CheckpointError, CheckpointStore};
use crate::state::ConversationState;

/// SQLite-backed checkpoint store. Uses spawn_blocking for async.
pub struct SqliteSaver {
    db_path: PathBuf,
}

impl SqliteSaver {
    /// Opens the database and ensures the table exists.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, CheckpointError> {
        let db_path = path.as_ref().to_path_buf();
        let conn = rusqlite::Connection::open(&db_path)
            .map_err(|e| CheckpointError::Storage(e.to_string()))?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                conversation_key TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            [],
        )
        .map_err(|e| CheckpointError::Storage(e.to_string()))?;
        Ok(Self { db_path })
    }
}

#[async_trait]
impl CheckpointStore for SqliteSaver {
    async fn load(&self, key: &str) -> Result<Option<ConversationState>, CheckpointError> {
        let db_path = self.db_path.clone();
        let key = key.to_string();
        let payload: Option<String> = tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&db_path)
                .map_err(|e| CheckpointError::Storage(e.to_string()))?;
            conn.query_row(
                "SELECT payload FROM conversations WHERE conversation_key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| CheckpointError::Storage(e.to_string()))
        })
        .await
        .map_err(|e| CheckpointError::Storage(e.to_string()))??;

        payload
            .map(|p| {
                serde_json::from_str(&p).map_err(|e| CheckpointError::Serialization(e.to_string()))
            })
            .transpose()
    }

    async fn save(&self, key: &str, state: &ConversationState) -> Result<(), CheckpointError> {
        let payload = serde_json::to_string(state)
            .map_err(|e| CheckpointError::Serialization(e.to_string()))?;
        let updated_at = state.updated_at.to_rfc3339();
        let db_path = self.db_path.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&db_path)
                .map_err(|e| CheckpointError::Storage(e.to_string()))?;
            conn.execute(
                "INSERT OR REPLACE INTO conversations (conversation_key, payload, updated_at)
                 VALUES (?1, ?2, ?3)",
                params![key, payload, updated_at],
            )
            .map_err(|e| CheckpointError::Storage(e.to_string()))?;
            Ok::<(), CheckpointError>(())
        })
        .await
        .map_err(|e| CheckpointError::Storage(e.to_string()))?
    }
}
