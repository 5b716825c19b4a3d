//! Fast tier trait definition.
//!
//! The fast tier is a keyed mirror of the most recent contiguous slice of a
//! chat: one entry per `(chat_id, message_id)` plus one window descriptor per
//! chat. It never decides what belongs in the window; `WindowTracker` does.

use chatstore_types::error::RepositoryError;
use chatstore_types::message::Message;
use chatstore_types::window::CacheWindow;

/// Trait for the cache mirror.
///
/// Implementations live in chatstore-infra (e.g., `SqliteFastTier`).
pub trait FastTier: Send + Sync {
    /// Write a message, overwriting any cached copy of the same id.
    fn save(
        &self,
        message: &Message,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Cached, live messages with ids in `[start, end]`, ascending by id.
    /// Ids that are not cached are omitted.
    fn get_range(
        &self,
        chat_id: &str,
        start: u64,
        end: u64,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, RepositoryError>> + Send;

    /// Tombstone the cached copy of a message.
    ///
    /// Returns `NotFound` if the id is not cached; callers treat that as
    /// nothing to invalidate.
    fn delete(
        &self,
        chat_id: &str,
        message_id: u64,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// The window for a chat, `None` if the chat has never been cached.
    ///
    /// Returns `Corrupt` if the stored descriptor cannot be parsed.
    fn get_window(
        &self,
        chat_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<CacheWindow>, RepositoryError>> + Send;

    /// Replace the window for `window.chat_id`.
    fn set_window(
        &self,
        window: &CacheWindow,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
