//! SQLite fast tier implementation.
//!
//! Implements `FastTier` from `chatstore-core`. Cached messages are stored as
//! JSON payloads keyed by `(chat_id, message_id)`; the window descriptor is a
//! `"start:end"` string per chat, parsed strictly on read.

use chatstore_core::repository::fast::FastTier;
use chatstore_types::error::RepositoryError;
use chatstore_types::message::Message;
use chatstore_types::window::CacheWindow;
use chrono::Utc;
use sqlx::Row;

use super::pool::DatabasePool;
use super::{bind_id, query_error, stored_id, stored_range};

/// SQLite-backed implementation of `FastTier`.
pub struct SqliteFastTier {
    pool: DatabasePool,
}

impl SqliteFastTier {
    /// Create a new tier backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }
}

fn decode_payload(payload: &str) -> Result<Message, RepositoryError> {
    serde_json::from_str(payload).map_err(|e| RepositoryError::Corrupt(format!("invalid cached payload: {e}")))
}

impl FastTier for SqliteFastTier {
    async fn save(&self, message: &Message) -> Result<(), RepositoryError> {
        let payload = serde_json::to_string(message).map_err(|e| RepositoryError::Query(e.to_string()))?;

        sqlx::query(
            "INSERT INTO cached_messages (chat_id, message_id, payload, deleted) VALUES (?, ?, ?, ?)
             ON CONFLICT(chat_id, message_id) DO UPDATE SET payload = excluded.payload, deleted = excluded.deleted",
        )
        .bind(&message.chat_id)
        .bind(bind_id(message.id)?)
        .bind(&payload)
        .bind(message.is_deleted())
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(())
    }

    async fn get_range(&self, chat_id: &str, start: u64, end: u64) -> Result<Vec<Message>, RepositoryError> {
        let Some((lo, hi)) = stored_range(start, end) else {
            return Ok(Vec::new());
        };

        let rows = sqlx::query(
            "SELECT payload FROM cached_messages
             WHERE chat_id = ? AND message_id BETWEEN ? AND ? AND deleted = 0
             ORDER BY message_id ASC",
        )
        .bind(chat_id)
        .bind(lo)
        .bind(hi)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        tracing::debug!(chat_id, start, end, rows = rows.len(), "fast range read");

        rows.iter()
            .map(|row| -> Result<Message, RepositoryError> {
                let payload: String = row.try_get("payload").map_err(query_error)?;
                decode_payload(&payload)
            })
            .collect()
    }

    async fn delete(&self, chat_id: &str, message_id: u64) -> Result<(), RepositoryError> {
        let id = stored_id(message_id).ok_or(RepositoryError::NotFound)?;
        let mut tx = self.pool.writer.begin().await.map_err(query_error)?;

        let payload: Option<String> =
            sqlx::query_scalar("SELECT payload FROM cached_messages WHERE chat_id = ? AND message_id = ?")
                .bind(chat_id)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(query_error)?;

        let mut message = decode_payload(&payload.ok_or(RepositoryError::NotFound)?)?;
        if !message.tombstone(Utc::now()) {
            return Ok(());
        }

        let payload = serde_json::to_string(&message).map_err(|e| RepositoryError::Query(e.to_string()))?;
        sqlx::query("UPDATE cached_messages SET payload = ?, deleted = 1 WHERE chat_id = ? AND message_id = ?")
            .bind(&payload)
            .bind(chat_id)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(query_error)?;

        tx.commit().await.map_err(query_error)?;
        Ok(())
    }

    async fn get_window(&self, chat_id: &str) -> Result<Option<CacheWindow>, RepositoryError> {
        let limits: Option<String> = sqlx::query_scalar("SELECT limits FROM cache_windows WHERE chat_id = ?")
            .bind(chat_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        limits
            .map(|raw| {
                CacheWindow::from_limits(chat_id, &raw).map_err(|e| RepositoryError::Corrupt(e.to_string()))
            })
            .transpose()
    }

    async fn set_window(&self, window: &CacheWindow) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO cache_windows (chat_id, limits) VALUES (?, ?)
             ON CONFLICT(chat_id) DO UPDATE SET limits = excluded.limits",
        )
        .bind(&window.chat_id)
        .bind(window.to_limits())
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        tracing::debug!(chat_id = %window.chat_id, start = window.start, end = window.end, "window stored");
        Ok(())
    }
}
