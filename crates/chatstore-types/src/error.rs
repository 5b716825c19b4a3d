use std::fmt;

use thiserror::Error;

/// Errors from tier repository operations (used by trait definitions in
/// chatstore-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Errors from parsing or constructing a cache window.
#[derive(Debug, Error)]
pub enum WindowError {
    #[error("malformed cache limits '{0}'")]
    Malformed(String),

    #[error("inverted cache limits: start {start} > end {end}")]
    Inverted { start: u64, end: u64 },
}

/// Which storage tier an operation touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Durable,
    Fast,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Durable => write!(f, "durable"),
            Tier::Fast => write!(f, "fast"),
        }
    }
}

/// Errors surfaced by the chat storage service.
///
/// Tier-level `NotFound` is absorbed before it gets here wherever reads and
/// deletes define it as empty or no-op; everything else carries the chat id
/// and the operation that failed.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("chat '{0}' not found")]
    ChatNotFound(String),

    #[error("chat '{0}' already exists")]
    AlreadyExists(String),

    #[error("message {message_id} already exists in chat '{chat_id}'")]
    MessageExists { chat_id: String, message_id: u64 },

    #[error("invalid chat id '{0}'")]
    InvalidChatId(String),

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("corrupt {tier} tier data during {operation} for chat '{chat_id}': {detail}")]
    Corrupt {
        tier: Tier,
        operation: &'static str,
        chat_id: String,
        detail: String,
    },

    #[error("{tier} tier unavailable during {operation} for chat '{chat_id}': {source}")]
    TierUnavailable {
        tier: Tier,
        operation: &'static str,
        chat_id: String,
        #[source]
        source: RepositoryError,
    },

    #[error("range resolution fell through for chat '{chat_id}': {detail}")]
    InvariantViolation { chat_id: String, detail: String },
}

impl StoreError {
    /// Wrap a tier failure with the chat and operation it happened in.
    ///
    /// `Corrupt` keeps its own kind so unreadable stored data (a window
    /// descriptor, a cached payload, a row) is never reported as a transport
    /// failure.
    pub fn from_tier(
        tier: Tier,
        operation: &'static str,
        chat_id: &str,
        source: RepositoryError,
    ) -> Self {
        match source {
            RepositoryError::Corrupt(detail) => StoreError::Corrupt {
                tier,
                operation,
                chat_id: chat_id.to_string(),
                detail,
            },
            source => StoreError::TierUnavailable {
                tier,
                operation,
                chat_id: chat_id.to_string(),
                source,
            },
        }
    }
}
