//! SQLite checkpointer.
//!
//! Each conversation is one row holding its JSON snapshot. Commits are a
//! single `INSERT ... ON CONFLICT DO UPDATE` statement.
//!
//! # Example
//!
//! ```rust,ignore
//! use finsight_session::sqlite::SqliteCheckpointer;
//!
//! let checkpointer = SqliteCheckpointer::new("sqlite://checkpoints.db?mode=rwc").await?;
//! let state = checkpointer.load("conv-1").await?;
//! ```

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::checkpointer::Checkpointer;
use crate::error::{Result, SessionError};
use crate::state::ConversationState;

/// A [`Checkpointer`] persisting snapshots to SQLite.
pub struct SqliteCheckpointer {
    pool: SqlitePool,
}

impl SqliteCheckpointer {
    /// Connect to `database_url` and create the checkpoint table if needed.
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(Self::map_err)?;
        Self::from_pool(pool).await
    }

    /// Use an existing pool, creating the checkpoint table if needed.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS conversation_checkpoints (\
                thread_id TEXT PRIMARY KEY, \
                snapshot TEXT NOT NULL, \
                updated_at TEXT NOT NULL\
            )",
        )
        .execute(&pool)
        .await
        .map_err(Self::map_err)?;
        Ok(Self { pool })
    }

    fn map_err(e: sqlx::Error) -> SessionError {
        SessionError::Storage { backend: "sqlite".to_string(), message: e.to_string() }
    }
}

#[async_trait]
impl Checkpointer for SqliteCheckpointer {
    async fn load(&self, conversation_id: &str) -> Result<ConversationState> {
        let row = sqlx::query("SELECT snapshot FROM conversation_checkpoints WHERE thread_id = ?1")
            .bind(conversation_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::map_err)?;

        match row {
            Some(row) => {
                let snapshot: String = row.try_get("snapshot").map_err(Self::map_err)?;
                Ok(serde_json::from_str(&snapshot)?)
            }
            None => Ok(ConversationState::new(conversation_id)),
        }
    }

    async fn commit(&self, state: &ConversationState) -> Result<()> {
        let snapshot = serde_json::to_string(state)?;
        sqlx::query(
            "INSERT INTO conversation_checkpoints (thread_id, snapshot, updated_at) \
             VALUES (?1, ?2, ?3) \
             ON CONFLICT (thread_id) DO UPDATE SET \
                snapshot = excluded.snapshot, \
                updated_at = excluded.updated_at",
        )
        .bind(state.conversation_id())
        .bind(&snapshot)
        .bind(state.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(Self::map_err)?;

        debug!(
            conversation_id = state.conversation_id(),
            turns = state.turns().len(),
            "committed sqlite checkpoint"
        );
        Ok(())
    }
}
