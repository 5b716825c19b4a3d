//! Durable tier trait definition.
//!
//! The durable tier is the system of record: it holds every message of every
//! chat, supports range scans by id, and owns the per-chat id counter.

use chatstore_types::error::RepositoryError;
use chatstore_types::message::Message;

/// Repository trait for the authoritative message history.
///
/// Implementations live in chatstore-infra (e.g., `SqliteDurableTier`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait DurableTier: Send + Sync {
    /// Create a chat. Returns `Conflict` if it already exists.
    fn create_chat(
        &self,
        chat_id: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Persist a message and its attachments atomically.
    ///
    /// Returns `NotFound` if the chat does not exist and `Conflict` if the
    /// `(chat_id, id)` slot is taken.
    fn save(
        &self,
        message: &Message,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Live messages with ids in `[start, end]`, ascending by id.
    ///
    /// Empty (not an error) for empty or out-of-bounds ranges and for
    /// unknown chats.
    fn get_range(
        &self,
        chat_id: &str,
        start: u64,
        end: u64,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, RepositoryError>> + Send;

    /// Like `get_range`, but tombstoned messages are included.
    fn get_range_with_tombstones(
        &self,
        chat_id: &str,
        start: u64,
        end: u64,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, RepositoryError>> + Send;

    /// Set the tombstone on a message. No-op if the id does not exist or is
    /// already deleted.
    fn delete(
        &self,
        chat_id: &str,
        message_id: u64,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Atomically allocate the next message id for a chat, starting at 1.
    ///
    /// Returns `NotFound` if the chat does not exist.
    fn next_message_id(
        &self,
        chat_id: &str,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
