//! Conversation records: title, type and document scope.
//!
//! Turn history lives in the checkpointer; the catalog only tracks what is
//! needed to list conversations and to scope new turns. Use the SQLite
//! catalog together with the SQLite checkpointer so both survive a restart.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

pub const DEFAULT_TITLE: &str = "New conversation";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    #[default]
    General,
    /// Scoped to one document for its whole lifetime.
    ReportBased,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::ReportBased => "report_based",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "general" => Some(Self::General),
            "report_based" => Some(Self::ReportBased),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: String,
    pub title: String,
    pub session_type: SessionType,
    pub document_id: Option<String>,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewConversation {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub session_type: SessionType,
    #[serde(default)]
    pub document_id: Option<String>,
}

impl NewConversation {
    /// Validate the request and turn it into a fresh record.
    pub fn into_record(self) -> Result<ConversationRecord, CatalogError> {
        let document_id = self.document_id.filter(|id| !id.trim().is_empty());
        if self.session_type == SessionType::ReportBased && document_id.is_none() {
            return Err(CatalogError::MissingDocument);
        }
        let title = self
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());

        let now = Utc::now();
        Ok(ConversationRecord {
            id: Uuid::new_v4().to_string(),
            title,
            session_type: self.session_type,
            document_id,
            message_count: 0,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("report_based conversations require a document_id")]
    MissingDocument,

    #[error("Catalog storage error ({backend}): {message}")]
    Storage { backend: String, message: String },
}

/// Stores conversation records.
#[async_trait]
pub trait ConversationCatalog: Send + Sync {
    async fn insert(&self, record: ConversationRecord) -> Result<(), CatalogError>;

    async fn get(&self, id: &str) -> Result<Option<ConversationRecord>, CatalogError>;

    /// A page of records, most recently updated first (ties by id), plus the
    /// total count.
    async fn list(
        &self,
        skip: usize,
        limit: usize,
    ) -> Result<(Vec<ConversationRecord>, usize), CatalogError>;

    /// Record that a turn added `messages` messages. `None` for an unknown id.
    async fn touch(
        &self,
        id: &str,
        messages: usize,
    ) -> Result<Option<ConversationRecord>, CatalogError>;

    async fn create(&self, request: NewConversation) -> Result<ConversationRecord, CatalogError> {
        let record = request.into_record()?;
        self.insert(record.clone()).await?;
        Ok(record)
    }
}

/// Records held in process memory. Lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    records: RwLock<HashMap<String, ConversationRecord>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationCatalog for InMemoryCatalog {
    async fn insert(&self, record: ConversationRecord) -> Result<(), CatalogError> {
        self.records.write().await.insert(record.id.clone(), record);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<ConversationRecord>, CatalogError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn list(
        &self,
        skip: usize,
        limit: usize,
    ) -> Result<(Vec<ConversationRecord>, usize), CatalogError> {
        let records = self.records.read().await;
        let mut all: Vec<&ConversationRecord> = records.values().collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        let page = all.into_iter().skip(skip).take(limit).cloned().collect();
        Ok((page, records.len()))
    }

    async fn touch(
        &self,
        id: &str,
        messages: usize,
    ) -> Result<Option<ConversationRecord>, CatalogError> {
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(id) else {
            return Ok(None);
        };
        record.message_count += messages;
        record.updated_at = Utc::now();
        Ok(Some(record.clone()))
    }
}

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteCatalog;

#[cfg(feature = "sqlite")]
mod sqlite {
    use async_trait::async_trait;
    use chrono::{DateTime, SecondsFormat, Utc};
    use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
    use sqlx::Row;
    use tracing::debug;

    use super::{CatalogError, ConversationCatalog, ConversationRecord, SessionType};

    const COLUMNS: &str =
        "id, title, session_type, document_id, message_count, created_at, updated_at";

    /// A [`ConversationCatalog`] in the `conversations` table, next to the
    /// checkpointer's `conversation_checkpoints`.
    pub struct SqliteCatalog {
        pool: SqlitePool,
    }

    impl SqliteCatalog {
        /// Connect to `database_url` and create the table if needed.
        pub async fn new(database_url: &str) -> Result<Self, CatalogError> {
            let pool = SqlitePoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await
                .map_err(map_err)?;
            Self::from_pool(pool).await
        }

        /// Use an existing pool, creating the table if needed.
        pub async fn from_pool(pool: SqlitePool) -> Result<Self, CatalogError> {
            sqlx::query(
                "CREATE TABLE IF NOT EXISTS conversations (\
                    id TEXT PRIMARY KEY, \
                    title TEXT NOT NULL, \
                    session_type TEXT NOT NULL, \
                    document_id TEXT, \
                    message_count INTEGER NOT NULL DEFAULT 0, \
                    created_at TEXT NOT NULL, \
                    updated_at TEXT NOT NULL\
                )",
            )
            .execute(&pool)
            .await
            .map_err(map_err)?;
            Ok(Self { pool })
        }
    }

    fn map_err(e: sqlx::Error) -> CatalogError {
        CatalogError::Storage { backend: "sqlite".to_string(), message: e.to_string() }
    }

    fn corrupt(message: String) -> CatalogError {
        CatalogError::Storage { backend: "sqlite".to_string(), message }
    }

    /// Fixed-width UTC timestamps so `ORDER BY updated_at` sorts chronologically.
    fn timestamp(at: &DateTime<Utc>) -> String {
        at.to_rfc3339_opts(SecondsFormat::Nanos, true)
    }

    fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, CatalogError> {
        DateTime::parse_from_rfc3339(raw)
            .map(|at| at.with_timezone(&Utc))
            .map_err(|e| corrupt(format!("invalid timestamp '{raw}': {e}")))
    }

    fn from_row(row: &SqliteRow) -> Result<ConversationRecord, CatalogError> {
        let session_type: String = row.try_get("session_type").map_err(map_err)?;
        let message_count: i64 = row.try_get("message_count").map_err(map_err)?;
        let created_at: String = row.try_get("created_at").map_err(map_err)?;
        let updated_at: String = row.try_get("updated_at").map_err(map_err)?;
        Ok(ConversationRecord {
            id: row.try_get("id").map_err(map_err)?,
            title: row.try_get("title").map_err(map_err)?,
            session_type: SessionType::parse(&session_type)
                .ok_or_else(|| corrupt(format!("unknown session_type '{session_type}'")))?,
            document_id: row.try_get("document_id").map_err(map_err)?,
            message_count: usize::try_from(message_count).unwrap_or_default(),
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        })
    }

    #[async_trait]
    impl ConversationCatalog for SqliteCatalog {
        async fn insert(&self, record: ConversationRecord) -> Result<(), CatalogError> {
            sqlx::query(&format!(
                "INSERT INTO conversations ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
            ))
            .bind(&record.id)
            .bind(&record.title)
            .bind(record.session_type.as_str())
            .bind(&record.document_id)
            .bind(record.message_count as i64)
            .bind(timestamp(&record.created_at))
            .bind(timestamp(&record.updated_at))
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
            debug!(conversation_id = %record.id, "inserted sqlite conversation record");
            Ok(())
        }

        async fn get(&self, id: &str) -> Result<Option<ConversationRecord>, CatalogError> {
            let row = sqlx::query(&format!("SELECT {COLUMNS} FROM conversations WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_err)?;
            row.as_ref().map(from_row).transpose()
        }

        async fn list(
            &self,
            skip: usize,
            limit: usize,
        ) -> Result<(Vec<ConversationRecord>, usize), CatalogError> {
            let rows = sqlx::query(&format!(
                "SELECT {COLUMNS} FROM conversations \
                 ORDER BY updated_at DESC, id ASC LIMIT ?1 OFFSET ?2"
            ))
            .bind(limit as i64)
            .bind(skip as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(map_err)?;
            let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM conversations")
                .fetch_one(&self.pool)
                .await
                .map_err(map_err)?
                .try_get("total")
                .map_err(map_err)?;

            let records = rows.iter().map(from_row).collect::<Result<Vec<_>, _>>()?;
            Ok((records, usize::try_from(total).unwrap_or_default()))
        }

        async fn touch(
            &self,
            id: &str,
            messages: usize,
        ) -> Result<Option<ConversationRecord>, CatalogError> {
            let updated = sqlx::query(
                "UPDATE conversations \
                 SET message_count = message_count + ?1, updated_at = ?2 WHERE id = ?3",
            )
            .bind(messages as i64)
            .bind(timestamp(&Utc::now()))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
            if updated.rows_affected() == 0 {
                return Ok(None);
            }
            self.get(id).await
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::catalog::NewConversation;

        async fn shared_pool() -> SqlitePool {
            SqlitePoolOptions::new().max_connections(1).connect("sqlite::memory:").await.unwrap()
        }

        #[tokio::test]
        async fn records_are_visible_to_a_second_catalog_on_the_same_database() {
            let pool = shared_pool().await;
            let first = SqliteCatalog::from_pool(pool.clone()).await.unwrap();
            let record = first
                .create(NewConversation {
                    title: Some("Q3 results".into()),
                    session_type: SessionType::ReportBased,
                    document_id: Some("report-1".into()),
                })
                .await
                .unwrap();
            first.touch(&record.id, 2).await.unwrap();

            let reopened = SqliteCatalog::from_pool(pool).await.unwrap();
            let loaded = reopened.get(&record.id).await.unwrap().unwrap();
            assert_eq!(loaded.title, "Q3 results");
            assert_eq!(loaded.session_type, SessionType::ReportBased);
            assert_eq!(loaded.document_id.as_deref(), Some("report-1"));
            assert_eq!(loaded.message_count, 2);
            assert_eq!(loaded.created_at, record.created_at);
        }

        #[tokio::test]
        async fn list_orders_by_last_update_and_counts_all() {
            let catalog = SqliteCatalog::from_pool(shared_pool().await).await.unwrap();
            let first = catalog.create(NewConversation::default()).await.unwrap();
            let second = catalog.create(NewConversation::default()).await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            catalog.touch(&first.id, 2).await.unwrap();

            let (page, total) = catalog.list(0, 10).await.unwrap();
            assert_eq!(total, 2);
            assert_eq!(page[0].id, first.id);
            assert_eq!(page[1].id, second.id);

            let (page, total) = catalog.list(1, 1).await.unwrap();
            assert_eq!((page.len(), total), (1, 2));
            assert!(catalog.touch("missing", 2).await.unwrap().is_none());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn report_based_requires_document() {
        let catalog = InMemoryCatalog::new();
        let err = catalog
            .create(NewConversation { session_type: SessionType::ReportBased, ..Default::default() })
            .await
            .unwrap_err();
        assert_eq!(err, CatalogError::MissingDocument);
        assert_eq!(catalog.list(0, 10).await.unwrap().1, 0);
    }

    #[tokio::test]
    async fn blank_title_falls_back_to_default() {
        let catalog = InMemoryCatalog::new();
        let record = catalog
            .create(NewConversation { title: Some("  ".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(record.title, DEFAULT_TITLE);
        assert_eq!(record.session_type, SessionType::General);
        assert_eq!(catalog.get(&record.id).await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn list_orders_by_last_update() {
        let catalog = InMemoryCatalog::new();
        let first = catalog.create(NewConversation::default()).await.unwrap();
        let second = catalog.create(NewConversation::default()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        catalog.touch(&first.id, 2).await.unwrap();

        let (page, total) = catalog.list(0, 10).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(page[0].id, first.id);
        assert_eq!(page[0].message_count, 2);
        assert_eq!(page[1].id, second.id);

        let (page, _) = catalog.list(1, 10).await.unwrap();
        assert_eq!(page.len(), 1);
    }

    #[test]
    fn session_type_text_round_trips() {
        for kind in [SessionType::General, SessionType::ReportBased] {
            assert_eq!(SessionType::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(SessionType::parse("other"), None);
    }
}
