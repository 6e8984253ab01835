//! The SQLite-backed store.
//!
//! Connection handling, migrations, and row mapping follow the same shape
//! throughout: every statement maps its own error into a `StoreError`
//! variant, and reads go through a per-entity `row_to_*` helper.

use aura_core::error::StoreError;
use aura_core::model::{Attachment, ChatMessage, Conversation, Feedback, Role, UsageMetric};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, info};

/// Fields for a conversation to be created.
#[derive(Debug, Clone)]
pub struct NewConversation {
    pub title: String,
    pub system_prompt: Option<String>,
    pub temperature: f64,
    pub selected_model: String,
}

/// Partial update of a conversation. `None` fields are left untouched.
///
/// `system_prompt` is doubly optional so a patch can distinguish "leave as
/// is" (`None`) from "clear to NULL" (`Some(None)`).
#[derive(Debug, Clone, Default)]
pub struct ConversationPatch {
    pub title: Option<String>,
    pub system_prompt: Option<Option<String>>,
    pub temperature: Option<f64>,
    pub selected_model: Option<String>,
}

impl ConversationPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.system_prompt.is_none()
            && self.temperature.is_none()
            && self.selected_model.is_none()
    }
}

/// Aggregate usage and feedback counts.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsSummary {
    pub total_messages: i64,
    pub total_tokens: i64,
    pub model_distribution: HashMap<String, i64>,
    pub positive_feedback_count: i64,
    pub negative_feedback_count: i64,
}

/// The SQLite store for all chat entities.
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (or create) the database at `path` and run migrations.
    ///
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database
    /// (useful for tests).
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite store initialized at {path}");
        Ok(store)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run schema migrations — creates all five tables.
    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                title           TEXT NOT NULL DEFAULT 'New Chat',
                system_prompt   TEXT,
                temperature     REAL NOT NULL DEFAULT 0.7,
                selected_model  TEXT NOT NULL DEFAULT 'aura-standard',
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("conversations table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id INTEGER NOT NULL
                                REFERENCES conversations(id) ON DELETE CASCADE,
                role            TEXT NOT NULL,
                content         TEXT NOT NULL,
                created_at      TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("messages table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS attachments (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id INTEGER NOT NULL
                                REFERENCES conversations(id) ON DELETE CASCADE,
                filename        TEXT NOT NULL,
                content         TEXT NOT NULL,
                created_at      TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("attachments table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feedback (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                message_id      INTEGER NOT NULL
                                REFERENCES messages(id) ON DELETE CASCADE,
                conversation_id INTEGER NOT NULL,
                is_positive     INTEGER NOT NULL,
                comment         TEXT,
                created_at      TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("feedback table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS usage_metrics (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                endpoint    TEXT NOT NULL,
                model_used  TEXT NOT NULL,
                token_count INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("usage_metrics table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("messages index: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_attachments_conversation ON attachments(conversation_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("attachments index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    // ── Row mapping ───────────────────────────────────────────────────────

    fn parse_timestamp(raw: &str) -> DateTime<Utc> {
        chrono::DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn row_to_conversation(row: &sqlx::sqlite::SqliteRow) -> Result<Conversation, StoreError> {
        let created_at: String = row
            .try_get("created_at")
            .map_err(|e| StoreError::QueryFailed(format!("created_at column: {e}")))?;
        let updated_at: String = row
            .try_get("updated_at")
            .map_err(|e| StoreError::QueryFailed(format!("updated_at column: {e}")))?;

        Ok(Conversation {
            id: row
                .try_get("id")
                .map_err(|e| StoreError::QueryFailed(format!("id column: {e}")))?,
            title: row
                .try_get("title")
                .map_err(|e| StoreError::QueryFailed(format!("title column: {e}")))?,
            system_prompt: row
                .try_get("system_prompt")
                .map_err(|e| StoreError::QueryFailed(format!("system_prompt column: {e}")))?,
            temperature: row
                .try_get("temperature")
                .map_err(|e| StoreError::QueryFailed(format!("temperature column: {e}")))?,
            selected_model: row
                .try_get("selected_model")
                .map_err(|e| StoreError::QueryFailed(format!("selected_model column: {e}")))?,
            created_at: Self::parse_timestamp(&created_at),
            updated_at: Self::parse_timestamp(&updated_at),
        })
    }

    fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<ChatMessage, StoreError> {
        let role_str: String = row
            .try_get("role")
            .map_err(|e| StoreError::QueryFailed(format!("role column: {e}")))?;
        let role = Role::from_str(&role_str).map_err(StoreError::QueryFailed)?;
        let created_at: String = row
            .try_get("created_at")
            .map_err(|e| StoreError::QueryFailed(format!("created_at column: {e}")))?;

        Ok(ChatMessage {
            id: row
                .try_get("id")
                .map_err(|e| StoreError::QueryFailed(format!("id column: {e}")))?,
            conversation_id: row
                .try_get("conversation_id")
                .map_err(|e| StoreError::QueryFailed(format!("conversation_id column: {e}")))?,
            role,
            content: row
                .try_get("content")
                .map_err(|e| StoreError::QueryFailed(format!("content column: {e}")))?,
            created_at: Self::parse_timestamp(&created_at),
        })
    }

    fn row_to_attachment(row: &sqlx::sqlite::SqliteRow) -> Result<Attachment, StoreError> {
        let created_at: String = row
            .try_get("created_at")
            .map_err(|e| StoreError::QueryFailed(format!("created_at column: {e}")))?;

        Ok(Attachment {
            id: row
                .try_get("id")
                .map_err(|e| StoreError::QueryFailed(format!("id column: {e}")))?,
            conversation_id: row
                .try_get("conversation_id")
                .map_err(|e| StoreError::QueryFailed(format!("conversation_id column: {e}")))?,
            filename: row
                .try_get("filename")
                .map_err(|e| StoreError::QueryFailed(format!("filename column: {e}")))?,
            content: row
                .try_get("content")
                .map_err(|e| StoreError::QueryFailed(format!("content column: {e}")))?,
            created_at: Self::parse_timestamp(&created_at),
        })
    }

    // ── Conversations ─────────────────────────────────────────────────────

    pub async fn create_conversation(
        &self,
        new: NewConversation,
    ) -> Result<Conversation, StoreError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO conversations (title, system_prompt, temperature, selected_model, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
        )
        .bind(&new.title)
        .bind(&new.system_prompt)
        .bind(new.temperature)
        .bind(&new.selected_model)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT conversation: {e}")))?;

        let id = result.last_insert_rowid();
        debug!(conversation_id = id, "Created conversation");

        Ok(Conversation {
            id,
            title: new.title,
            system_prompt: new.system_prompt,
            temperature: new.temperature,
            selected_model: new.selected_model,
            created_at: now,
            updated_at: now,
        })
    }

    /// List conversations ordered by most recent activity.
    pub async fn list_conversations(
        &self,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Conversation>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM conversations ORDER BY updated_at DESC LIMIT ?1 OFFSET ?2",
        )
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("LIST conversations: {e}")))?;

        rows.iter().map(Self::row_to_conversation).collect()
    }

    pub async fn get_conversation(&self, id: i64) -> Result<Option<Conversation>, StoreError> {
        let row = sqlx::query("SELECT * FROM conversations WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("GET conversation: {e}")))?;

        match row {
            Some(ref r) => Ok(Some(Self::row_to_conversation(r)?)),
            None => Ok(None),
        }
    }

    /// Apply a partial update and refresh `updated_at`.
    ///
    /// Returns the updated row, or `None` when the conversation does not exist.
    pub async fn update_conversation(
        &self,
        id: i64,
        patch: ConversationPatch,
    ) -> Result<Option<Conversation>, StoreError> {
        let Some(existing) = self.get_conversation(id).await? else {
            return Ok(None);
        };

        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE conversations
            SET title = ?1, system_prompt = ?2, temperature = ?3, selected_model = ?4, updated_at = ?5
            WHERE id = ?6
            "#,
        )
        .bind(patch.title.as_deref().unwrap_or(&existing.title))
        .bind(match &patch.system_prompt {
            Some(new_value) => new_value.as_deref(),
            None => existing.system_prompt.as_deref(),
        })
        .bind(patch.temperature.unwrap_or(existing.temperature))
        .bind(patch.selected_model.as_deref().unwrap_or(&existing.selected_model))
        .bind(now.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("UPDATE conversation: {e}")))?;

        self.get_conversation(id).await
    }

    /// Delete a conversation; messages and attachments cascade.
    ///
    /// Returns `false` when no such conversation exists.
    pub async fn delete_conversation(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM conversations WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("DELETE conversation: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    // ── Messages ──────────────────────────────────────────────────────────

    pub async fn insert_message(
        &self,
        conversation_id: i64,
        role: Role,
        content: &str,
    ) -> Result<ChatMessage, StoreError> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO messages (conversation_id, role, content, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(conversation_id)
        .bind(role.as_str())
        .bind(content)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT message: {e}")))?;

        Ok(ChatMessage {
            id: result.last_insert_rowid(),
            conversation_id,
            role,
            content: content.to_string(),
            created_at: now,
        })
    }

    pub async fn list_messages(&self, conversation_id: i64) -> Result<Vec<ChatMessage>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM messages WHERE conversation_id = ?1 ORDER BY id ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("LIST messages: {e}")))?;

        rows.iter().map(Self::row_to_message).collect()
    }

    pub async fn message_exists(&self, id: i64) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM messages WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("EXISTS message: {e}")))?;

        Ok(row.is_some())
    }

    // ── Attachments ───────────────────────────────────────────────────────

    pub async fn insert_attachment(
        &self,
        conversation_id: i64,
        filename: &str,
        content: &str,
    ) -> Result<Attachment, StoreError> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO attachments (conversation_id, filename, content, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(conversation_id)
        .bind(filename)
        .bind(content)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT attachment: {e}")))?;

        Ok(Attachment {
            id: result.last_insert_rowid(),
            conversation_id,
            filename: filename.to_string(),
            content: content.to_string(),
            created_at: now,
        })
    }

    /// List attachments in creation order — the order the context corpus uses.
    pub async fn list_attachments(
        &self,
        conversation_id: i64,
    ) -> Result<Vec<Attachment>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM attachments WHERE conversation_id = ?1 ORDER BY id ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("LIST attachments: {e}")))?;

        rows.iter().map(Self::row_to_attachment).collect()
    }

    // ── Feedback ──────────────────────────────────────────────────────────

    /// Record feedback for a message. The message must exist at creation time.
    pub async fn insert_feedback(
        &self,
        message_id: i64,
        conversation_id: i64,
        is_positive: bool,
        comment: Option<&str>,
    ) -> Result<Feedback, StoreError> {
        if !self.message_exists(message_id).await? {
            return Err(StoreError::NotFound { entity: "Message" });
        }

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO feedback (message_id, conversation_id, is_positive, comment, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(message_id)
        .bind(conversation_id)
        .bind(is_positive)
        .bind(comment)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT feedback: {e}")))?;

        Ok(Feedback {
            id: result.last_insert_rowid(),
            message_id,
            conversation_id,
            is_positive,
            comment: comment.map(String::from),
            created_at: now,
        })
    }

    // ── Usage metrics & analytics ─────────────────────────────────────────

    pub async fn insert_usage_metric(
        &self,
        endpoint: &str,
        model_used: &str,
        token_count: i64,
    ) -> Result<UsageMetric, StoreError> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO usage_metrics (endpoint, model_used, token_count, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(endpoint)
        .bind(model_used)
        .bind(token_count)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT usage metric: {e}")))?;

        Ok(UsageMetric {
            id: result.last_insert_rowid(),
            endpoint: endpoint.to_string(),
            model_used: model_used.to_string(),
            token_count,
            created_at: now,
        })
    }

    /// Aggregate counts for the analytics endpoint.
    pub async fn analytics(&self) -> Result<AnalyticsSummary, StoreError> {
        let total_messages: i64 = sqlx::query("SELECT COUNT(*) AS cnt FROM messages")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("COUNT messages: {e}")))?
            .try_get("cnt")
            .map_err(|e| StoreError::QueryFailed(format!("cnt column: {e}")))?;

        let total_tokens: i64 =
            sqlx::query("SELECT COALESCE(SUM(token_count), 0) AS total FROM usage_metrics")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| StoreError::QueryFailed(format!("SUM tokens: {e}")))?
                .try_get("total")
                .map_err(|e| StoreError::QueryFailed(format!("total column: {e}")))?;

        let positive_feedback_count: i64 =
            sqlx::query("SELECT COUNT(*) AS cnt FROM feedback WHERE is_positive = 1")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| StoreError::QueryFailed(format!("COUNT positive feedback: {e}")))?
                .try_get("cnt")
                .map_err(|e| StoreError::QueryFailed(format!("cnt column: {e}")))?;

        let negative_feedback_count: i64 =
            sqlx::query("SELECT COUNT(*) AS cnt FROM feedback WHERE is_positive = 0")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| StoreError::QueryFailed(format!("COUNT negative feedback: {e}")))?
                .try_get("cnt")
                .map_err(|e| StoreError::QueryFailed(format!("cnt column: {e}")))?;

        let rows = sqlx::query(
            "SELECT model_used, COUNT(*) AS cnt FROM usage_metrics GROUP BY model_used",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("GROUP BY model: {e}")))?;

        let mut model_distribution = HashMap::new();
        for row in &rows {
            let model: String = row
                .try_get("model_used")
                .map_err(|e| StoreError::QueryFailed(format!("model_used column: {e}")))?;
            let count: i64 = row
                .try_get("cnt")
                .map_err(|e| StoreError::QueryFailed(format!("cnt column: {e}")))?;
            model_distribution.insert(model, count);
        }

        Ok(AnalyticsSummary {
            total_messages,
            total_tokens,
            model_distribution,
            positive_feedback_count,
            negative_feedback_count,
        })
    }
}
