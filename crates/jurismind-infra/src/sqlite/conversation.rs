//! SQLite conversation store implementation.
//!
//! Implements `ConversationStore` from `jurismind-core` using sqlx with split
//! read/write pools: raw queries, private Row structs, reader pool for
//! SELECTs and the single-connection writer pool for INSERT/UPDATE.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use jurismind_core::chat::repository::ConversationStore;
use jurismind_types::chat::{AuthorKind, Conversation, Turn};
use jurismind_types::error::RepositoryError;
use jurismind_types::role::Role;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ConversationStore`.
pub struct SqliteConversationStore {
    pool: DatabasePool,
}

impl SqliteConversationStore {
    /// Create a new store backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

/// Internal row type for mapping SQLite rows to domain Conversation.
struct ConversationRow {
    id: String,
    owner_id: String,
    title: String,
    role_context: String,
    created_at: String,
    updated_at: String,
}

impl ConversationRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            title: row.try_get("title")?,
            role_context: row.try_get("role_context")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_conversation(self) -> Result<Conversation, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid conversation id: {e}")))?;
        let owner_id = Uuid::parse_str(&self.owner_id)
            .map_err(|e| RepositoryError::Query(format!("invalid owner_id: {e}")))?;
        let role_context: Role = self
            .role_context
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(Conversation {
            id,
            owner_id,
            title: self.title,
            role_context,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

/// Internal row type for mapping SQLite rows to domain Turn.
struct MessageRow {
    id: String,
    conversation_id: String,
    author_kind: String,
    content: String,
    created_at: String,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            conversation_id: row.try_get("conversation_id")?,
            author_kind: row.try_get("author_kind")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_turn(self) -> Result<Turn, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid message id: {e}")))?;
        let conversation_id = Uuid::parse_str(&self.conversation_id)
            .map_err(|e| RepositoryError::Query(format!("invalid conversation_id: {e}")))?;
        let author: AuthorKind = self
            .author_kind
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(Turn {
            id,
            conversation_id,
            author,
            content: self.content,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

/// Fixed-width RFC 3339 so that text order equals time order.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current time at the precision stored, so returned records equal what a
/// later read yields.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn query_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

// ---------------------------------------------------------------------------
// ConversationStore implementation
// ---------------------------------------------------------------------------

impl ConversationStore for SqliteConversationStore {
    async fn list_conversations(&self, owner_id: &Uuid) -> Result<Vec<Conversation>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM conversations WHERE owner_id = ? ORDER BY updated_at DESC, id DESC",
        )
        .bind(owner_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        let mut conversations = Vec::with_capacity(rows.len());
        for row in &rows {
            let conversation_row = ConversationRow::from_row(row).map_err(query_error)?;
            conversations.push(conversation_row.into_conversation()?);
        }

        Ok(conversations)
    }

    async fn get_conversation(&self, conversation_id: &Uuid) -> Result<Option<Conversation>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM conversations WHERE id = ?")
            .bind(conversation_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        match row {
            Some(row) => {
                let conversation_row = ConversationRow::from_row(&row).map_err(query_error)?;
                Ok(Some(conversation_row.into_conversation()?))
            }
            None => Ok(None),
        }
    }

    async fn create_conversation(
        &self,
        owner_id: &Uuid,
        role: Role,
        title: &str,
    ) -> Result<Conversation, RepositoryError> {
        let at = now();
        let conversation = Conversation {
            id: Uuid::now_v7(),
            owner_id: *owner_id,
            title: title.to_string(),
            role_context: role,
            created_at: at,
            updated_at: at,
        };

        sqlx::query(
            r#"INSERT INTO conversations (id, owner_id, title, role_context, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(conversation.id.to_string())
        .bind(conversation.owner_id.to_string())
        .bind(&conversation.title)
        .bind(conversation.role_context.as_str())
        .bind(format_datetime(&conversation.created_at))
        .bind(format_datetime(&conversation.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        tracing::debug!(conversation_id = %conversation.id, role = %role, "conversation inserted");
        Ok(conversation)
    }

    async fn update_conversation_title(&self, conversation_id: &Uuid, title: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE conversations SET title = ? WHERE id = ?")
            .bind(title)
            .bind(conversation_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn list_messages(&self, conversation_id: &Uuid) -> Result<Vec<Turn>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM messages WHERE conversation_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(conversation_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        let mut turns = Vec::with_capacity(rows.len());
        for row in &rows {
            let message_row = MessageRow::from_row(row).map_err(query_error)?;
            turns.push(message_row.into_turn()?);
        }

        Ok(turns)
    }

    async fn append_message(
        &self,
        conversation_id: &Uuid,
        author_id: &Uuid,
        author: AuthorKind,
        content: &str,
    ) -> Result<Turn, RepositoryError> {
        let turn = Turn {
            id: Uuid::now_v7(),
            conversation_id: *conversation_id,
            author,
            content: content.to_string(),
            created_at: now(),
        };

        // INSERT message + bump the conversation's last activity together.
        let mut tx = self.pool.writer.begin().await.map_err(query_error)?;

        sqlx::query(
            r#"INSERT INTO messages (id, conversation_id, author_id, author_kind, content, created_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(turn.id.to_string())
        .bind(turn.conversation_id.to_string())
        .bind(author_id.to_string())
        .bind(turn.author.to_string())
        .bind(&turn.content)
        .bind(format_datetime(&turn.created_at))
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.message().contains("FOREIGN KEY") {
                    return RepositoryError::NotFound;
                }
            }
            query_error(e)
        })?;

        sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ?")
            .bind(format_datetime(&turn.created_at))
            .bind(turn.conversation_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(query_error)?;

        tx.commit().await.map_err(query_error)?;

        tracing::debug!(
            conversation_id = %turn.conversation_id,
            turn_id = %turn.id,
            author = %turn.author,
            "message appended"
        );
        Ok(turn)
    }
}
