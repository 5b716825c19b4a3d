//! Chat message and attachment types.
//!
//! A message's `id` is the only ordering key inside a chat. `created_at` is
//! informational and never used to sort.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single message in a chat history.
///
/// A message with `deleted_at` set is logically deleted: it keeps its id slot
/// in both tiers but is never returned by reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub chat_id: String,
    pub sender: String,
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Message {
    /// A live message sent now, with one attachment per URL.
    pub fn new(id: u64, chat_id: &str, sender: &str, content: &str, attachment_urls: &[String]) -> Self {
        Self {
            id,
            chat_id: chat_id.to_string(),
            sender: sender.to_string(),
            content: content.to_string(),
            attachments: attachment_urls
                .iter()
                .map(|url| Attachment::new(id, chat_id, url))
                .collect(),
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    /// Whether this message carries a tombstone.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Set the tombstone if it is not already set.
    ///
    /// The first deletion timestamp wins; returns `true` if the message
    /// changed.
    pub fn tombstone(&mut self, at: DateTime<Utc>) -> bool {
        if self.deleted_at.is_some() {
            return false;
        }
        self.deleted_at = Some(at);
        true
    }

    /// Point every attachment at this message.
    pub fn normalize_attachments(&mut self) {
        for attachment in &mut self.attachments {
            attachment.message_id = self.id;
            attachment.chat_id.clone_from(&self.chat_id);
        }
    }
}

/// A file reference owned by exactly one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub message_id: u64,
    pub chat_id: String,
    pub url: String,
}

impl Attachment {
    /// A new attachment with a time-ordered id.
    pub fn new(message_id: u64, chat_id: &str, url: &str) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            message_id,
            chat_id: chat_id.to_string(),
            url: url.to_string(),
        }
    }
}
