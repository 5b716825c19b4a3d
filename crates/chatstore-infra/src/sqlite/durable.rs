//! SQLite durable tier implementation.
//!
//! Implements `DurableTier` from `chatstore-core` using sqlx with split
//! read/write pools. Messages and their attachments are written in one
//! transaction; range scans hit the `(chat_id, id)` primary key.

use std::collections::HashMap;

use chatstore_core::repository::durable::DurableTier;
use chatstore_types::error::RepositoryError;
use chatstore_types::message::{Attachment, Message};
use chrono::{DateTime, Utc};
use sqlx::Row;

use super::pool::DatabasePool;
use super::{bind_id, query_error, read_id, stored_id, stored_range};

/// SQLite-backed implementation of `DurableTier`.
pub struct SqliteDurableTier {
    pool: DatabasePool,
}

impl SqliteDurableTier {
    /// Create a new tier backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn scan(&self, chat_id: &str, start: u64, end: u64, include_deleted: bool) -> Result<Vec<Message>, RepositoryError> {
        let Some((lo, hi)) = stored_range(start, end) else {
            return Ok(Vec::new());
        };

        let sql = if include_deleted {
            "SELECT * FROM messages WHERE chat_id = ? AND id BETWEEN ? AND ? ORDER BY id ASC"
        } else {
            "SELECT * FROM messages WHERE chat_id = ? AND id BETWEEN ? AND ? AND deleted_at IS NULL ORDER BY id ASC"
        };

        let rows = sqlx::query(sql)
            .bind(chat_id)
            .bind(lo)
            .bind(hi)
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_error)?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let attachment_rows = sqlx::query(
            "SELECT * FROM attachments WHERE chat_id = ? AND message_id BETWEEN ? AND ? ORDER BY rowid ASC",
        )
        .bind(chat_id)
        .bind(lo)
        .bind(hi)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        let mut attachments: HashMap<u64, Vec<Attachment>> = HashMap::new();
        for row in &attachment_rows {
            let attachment = AttachmentRow::from_row(row)
                .map_err(query_error)?
                .into_attachment()?;
            attachments.entry(attachment.message_id).or_default().push(attachment);
        }

        tracing::debug!(chat_id, start, end, rows = rows.len(), "durable range scan");

        rows.iter()
            .map(|row| -> Result<Message, RepositoryError> {
                let message = MessageRow::from_row(row).map_err(query_error)?.into_message()?;
                Ok(Message {
                    attachments: attachments.remove(&message.id).unwrap_or_default(),
                    ..message
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct MessageRow {
    chat_id: String,
    id: i64,
    sender: String,
    content: String,
    created_at: String,
    deleted_at: Option<String>,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            chat_id: row.try_get("chat_id")?,
            id: row.try_get("id")?,
            sender: row.try_get("sender")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
            deleted_at: row.try_get("deleted_at")?,
        })
    }

    fn into_message(self) -> Result<Message, RepositoryError> {
        Ok(Message {
            id: read_id(self.id)?,
            chat_id: self.chat_id,
            sender: self.sender,
            content: self.content,
            attachments: Vec::new(),
            created_at: parse_datetime(&self.created_at)?,
            deleted_at: self.deleted_at.as_deref().map(parse_datetime).transpose()?,
        })
    }
}

struct AttachmentRow {
    id: String,
    chat_id: String,
    message_id: i64,
    url: String,
}

impl AttachmentRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            chat_id: row.try_get("chat_id")?,
            message_id: row.try_get("message_id")?,
            url: row.try_get("url")?,
        })
    }

    fn into_attachment(self) -> Result<Attachment, RepositoryError> {
        Ok(Attachment {
            id: self.id,
            message_id: read_id(self.message_id)?,
            chat_id: self.chat_id,
            url: self.url,
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

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn constraint_error(e: sqlx::Error, conflict: impl FnOnce() -> String) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e {
        let message = db_err.message();
        if message.contains("UNIQUE") {
            return RepositoryError::Conflict(conflict());
        }
        if message.contains("FOREIGN KEY") {
            return RepositoryError::NotFound;
        }
    }
    query_error(e)
}

impl DurableTier for SqliteDurableTier {
    async fn create_chat(&self, chat_id: &str) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO chats (id, created_at) VALUES (?, ?)")
            .bind(chat_id)
            .bind(format_datetime(&Utc::now()))
            .execute(&self.pool.writer)
            .await
            .map_err(|e| constraint_error(e, || format!("chat '{chat_id}' already exists")))?;
        Ok(())
    }

    async fn save(&self, message: &Message) -> Result<(), RepositoryError> {
        let id = bind_id(message.id)?;

        let mut tx = self.pool.writer.begin().await.map_err(query_error)?;

        sqlx::query(
            "INSERT INTO messages (chat_id, id, sender, content, created_at, deleted_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&message.chat_id)
        .bind(id)
        .bind(&message.sender)
        .bind(&message.content)
        .bind(format_datetime(&message.created_at))
        .bind(message.deleted_at.as_ref().map(format_datetime))
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            constraint_error(e, || {
                format!("message {} already exists in chat '{}'", message.id, message.chat_id)
            })
        })?;

        for attachment in &message.attachments {
            sqlx::query("INSERT INTO attachments (id, chat_id, message_id, url) VALUES (?, ?, ?, ?)")
                .bind(&attachment.id)
                .bind(&message.chat_id)
                .bind(id)
                .bind(&attachment.url)
                .execute(&mut *tx)
                .await
                .map_err(|e| constraint_error(e, || format!("attachment '{}' already exists", attachment.id)))?;
        }

        tx.commit().await.map_err(query_error)?;
        Ok(())
    }

    async fn get_range(&self, chat_id: &str, start: u64, end: u64) -> Result<Vec<Message>, RepositoryError> {
        self.scan(chat_id, start, end, false).await
    }

    async fn get_range_with_tombstones(
        &self,
        chat_id: &str,
        start: u64,
        end: u64,
    ) -> Result<Vec<Message>, RepositoryError> {
        self.scan(chat_id, start, end, true).await
    }

    async fn delete(&self, chat_id: &str, message_id: u64) -> Result<(), RepositoryError> {
        let Some(id) = stored_id(message_id) else {
            return Ok(());
        };

        let result = sqlx::query(
            "UPDATE messages SET deleted_at = ? WHERE chat_id = ? AND id = ? AND deleted_at IS NULL",
        )
        .bind(format_datetime(&Utc::now()))
        .bind(chat_id)
        .bind(id)
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        tracing::debug!(chat_id, message_id, tombstoned = result.rows_affected(), "durable delete");
        Ok(())
    }

    async fn next_message_id(&self, chat_id: &str) -> Result<u64, RepositoryError> {
        // Never hand out an id at or below one that was saved explicitly.
        let next: i64 = sqlx::query_scalar(
            "INSERT INTO message_counters (chat_id, last_id)
             VALUES (?1, COALESCE((SELECT MAX(id) FROM messages WHERE chat_id = ?1), 0) + 1)
             ON CONFLICT(chat_id) DO UPDATE SET last_id = MAX(
                 last_id,
                 COALESCE((SELECT MAX(id) FROM messages WHERE chat_id = ?1), 0)
             ) + 1
             RETURNING last_id",
        )
        .bind(chat_id)
        .fetch_one(&self.pool.writer)
        .await
        .map_err(|e| constraint_error(e, || format!("counter for chat '{chat_id}'")))?;

        read_id(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::pool::Schema;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("durable.db");
        std::mem::forget(dir);
        DatabasePool::open(&db_path, Schema::Durable, 4).await.unwrap()
    }

    async fn tier_with_chat(chat_id: &str) -> SqliteDurableTier {
        let tier = SqliteDurableTier::new(test_pool().await);
        tier.create_chat(chat_id).await.unwrap();
        tier
    }

    fn make_message(chat_id: &str, id: u64) -> Message {
        Message {
            id,
            chat_id: chat_id.to_string(),
            sender: "alice".to_string(),
            content: format!("message {id}"),
            attachments: Vec::new(),
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn ids(messages: &[Message]) -> Vec<u64> {
        messages.iter().map(|m| m.id).collect()
    }

    #[tokio::test]
    async fn test_create_chat_twice_conflicts() {
        let tier = tier_with_chat("c").await;
        let err = tier.create_chat("c").await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_save_and_get_range_roundtrip() {
        let tier = tier_with_chat("c").await;
        let mut message = make_message("c", 1);
        message.attachments = vec![
            Attachment {
                id: "a1".to_string(),
                message_id: 1,
                chat_id: "c".to_string(),
                url: "https://files.example/one.png".to_string(),
            },
            Attachment {
                id: "a2".to_string(),
                message_id: 1,
                chat_id: "c".to_string(),
                url: "https://files.example/two.png".to_string(),
            },
        ];
        tier.save(&message).await.unwrap();
        tier.save(&make_message("c", 2)).await.unwrap();

        let loaded = tier.get_range("c", 1, 2).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0], message);
        assert!(loaded[1].attachments.is_empty());
    }

    #[tokio::test]
    async fn test_save_unknown_chat_is_not_found() {
        let tier = SqliteDurableTier::new(test_pool().await);
        let err = tier.save(&make_message("ghost", 1)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_save_duplicate_id_conflicts() {
        let tier = tier_with_chat("c").await;
        tier.save(&make_message("c", 1)).await.unwrap();
        let err = tier.save(&make_message("c", 1)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_failed_attachment_rolls_back_message() {
        let tier = tier_with_chat("c").await;
        let attachment = Attachment {
            id: "dup".to_string(),
            message_id: 1,
            chat_id: "c".to_string(),
            url: "https://files.example/x".to_string(),
        };
        let mut first = make_message("c", 1);
        first.attachments = vec![attachment.clone()];
        tier.save(&first).await.unwrap();

        let mut second = make_message("c", 2);
        second.attachments = vec![Attachment {
            message_id: 2,
            ..attachment
        }];
        assert!(tier.save(&second).await.is_err());
        assert_eq!(ids(&tier.get_range("c", 1, 10).await.unwrap()), vec![1]);
    }

    #[tokio::test]
    async fn test_get_range_is_ascending_and_bounded() {
        let tier = tier_with_chat("c").await;
        for id in [5, 1, 3, 2, 4] {
            tier.save(&make_message("c", id)).await.unwrap();
        }

        assert_eq!(ids(&tier.get_range("c", 2, 4).await.unwrap()), vec![2, 3, 4]);
        assert_eq!(ids(&tier.get_range("c", 0, u64::MAX).await.unwrap()), vec![1, 2, 3, 4, 5]);
        assert!(tier.get_range("c", 6, 10).await.unwrap().is_empty());
        assert!(tier.get_range("c", 4, 2).await.unwrap().is_empty());
        assert!(tier.get_range("other", 1, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_sets_tombstone_once() {
        let tier = tier_with_chat("c").await;
        for id in 1..=3 {
            tier.save(&make_message("c", id)).await.unwrap();
        }

        tier.delete("c", 2).await.unwrap();
        let first = tier.get_range_with_tombstones("c", 2, 2).await.unwrap()[0].deleted_at;
        assert!(first.is_some());

        tier.delete("c", 2).await.unwrap();
        let second = tier.get_range_with_tombstones("c", 2, 2).await.unwrap()[0].deleted_at;
        assert_eq!(first, second);

        assert_eq!(ids(&tier.get_range("c", 1, 3).await.unwrap()), vec![1, 3]);
        assert_eq!(ids(&tier.get_range_with_tombstones("c", 1, 3).await.unwrap()), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_delete_missing_is_noop() {
        let tier = tier_with_chat("c").await;
        tier.delete("c", 42).await.unwrap();
        tier.delete("ghost", 1).await.unwrap();
    }

    #[tokio::test]
    async fn test_next_message_id_sequence() {
        let tier = tier_with_chat("c").await;
        tier.create_chat("d").await.unwrap();

        assert_eq!(tier.next_message_id("c").await.unwrap(), 1);
        assert_eq!(tier.next_message_id("c").await.unwrap(), 2);
        assert_eq!(tier.next_message_id("d").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_next_message_id_skips_explicit_ids() {
        let tier = tier_with_chat("c").await;
        tier.save(&make_message("c", 7)).await.unwrap();
        assert_eq!(tier.next_message_id("c").await.unwrap(), 8);
        assert_eq!(tier.next_message_id("c").await.unwrap(), 9);
    }

    #[tokio::test]
    async fn test_next_message_id_unknown_chat() {
        let tier = SqliteDurableTier::new(test_pool().await);
        let err = tier.next_message_id("ghost").await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_save_rejects_id_beyond_storage_range() {
        let tier = tier_with_chat("c").await;
        let err = tier.save(&make_message("c", u64::MAX)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Query(_)));
    }

    #[tokio::test]
    async fn test_ids_beyond_storage_range_never_match() {
        let tier = tier_with_chat("c").await;
        let max = i64::MAX as u64;
        tier.save(&make_message("c", max)).await.unwrap();

        assert!(tier.get_range("c", max + 1, max + 10).await.unwrap().is_empty());
        assert!(tier.get_range_with_tombstones("c", max + 1, u64::MAX).await.unwrap().is_empty());
        assert_eq!(ids(&tier.get_range("c", max, u64::MAX).await.unwrap()), vec![max]);

        tier.delete("c", u64::MAX).await.unwrap();
        assert!(!tier.get_range_with_tombstones("c", max, max).await.unwrap()[0].is_deleted());
    }
}
