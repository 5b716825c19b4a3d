//! Chat storage service.
//!
//! Orchestrates the two tiers: writes go to the durable tier first (system of
//! record) and are then mirrored into the fast tier; reads go through
//! [`RangeResolver`]; re-warms reload a window from the durable tier.
//!
//! There is no transaction spanning both tiers. A mirror failure after a
//! successful durable write leaves the cache lagging; what the caller sees
//! in that case is decided by [`MirrorPolicy`].

use chatstore_types::config::MirrorPolicy;
use chatstore_types::error::{RepositoryError, StoreError, Tier};
use chatstore_types::message::Message;
use chatstore_types::window::CacheWindow;
use tracing::{debug, info, warn};

use crate::repository::durable::DurableTier;
use crate::repository::fast::FastTier;
use crate::resolver::{IdRange, RangeResolver};
use crate::window::{self, WindowTracker};

/// Whether the fast tier reflects a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorOutcome {
    Mirrored,
    /// The durable write succeeded but the fast tier could not be updated.
    Lagging,
}

/// Service owning both tiers and the per-chat window tracker.
///
/// Generic over the tier traits -- chatstore-core never depends on
/// chatstore-infra.
pub struct ChatStorageService<D: DurableTier, F: FastTier> {
    durable: D,
    fast: F,
    tracker: WindowTracker,
    mirror_policy: MirrorPolicy,
}

impl<D: DurableTier, F: FastTier> ChatStorageService<D, F> {
    pub fn new(durable: D, fast: F, mirror_policy: MirrorPolicy) -> Self {
        Self {
            durable,
            fast,
            tracker: WindowTracker::new(),
            mirror_policy,
        }
    }

    pub fn durable(&self) -> &D {
        &self.durable
    }

    pub fn fast(&self) -> &F {
        &self.fast
    }

    pub fn mirror_policy(&self) -> MirrorPolicy {
        self.mirror_policy
    }

    /// Create a chat. Creating an existing chat fails with `AlreadyExists`
    /// and leaves its messages untouched.
    pub async fn create_chat(&self, chat_id: &str) -> Result<(), StoreError> {
        validate_chat_id(chat_id)?;

        self.durable
            .create_chat(chat_id)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => StoreError::AlreadyExists(chat_id.to_string()),
                other => StoreError::from_tier(Tier::Durable, "create_chat", chat_id, other),
            })?;

        info!(chat_id, "chat created");
        Ok(())
    }

    /// Save a message with a caller-assigned id.
    ///
    /// The durable write must succeed. The mirror write follows the
    /// configured [`MirrorPolicy`].
    pub async fn save_message(&self, mut message: Message) -> Result<MirrorOutcome, StoreError> {
        validate_chat_id(&message.chat_id)?;
        if message.id == 0 {
            return Err(StoreError::InvalidMessage("message id 0 is reserved".to_string()));
        }
        message.normalize_attachments();

        let chat_id = message.chat_id.as_str();
        self.durable.save(&message).await.map_err(|e| match e {
            RepositoryError::NotFound => StoreError::ChatNotFound(chat_id.to_string()),
            RepositoryError::Conflict(_) => StoreError::MessageExists {
                chat_id: chat_id.to_string(),
                message_id: message.id,
            },
            other => StoreError::from_tier(Tier::Durable, "save", chat_id, other),
        })?;
        debug!(chat_id, message_id = message.id, "message saved to durable tier");

        let guard = self.tracker.lock(chat_id).await;
        let mirrored = match self.fast.save(&message).await {
            Ok(()) => self
                .tracker
                .record_write(&guard, &self.fast, message.id)
                .await
                .map(|_| ()),
            Err(e) => Err(e),
        };

        match mirrored {
            Ok(()) => Ok(MirrorOutcome::Mirrored),
            Err(e) => self.mirror_failed(chat_id, "save", e),
        }
    }

    /// Allocate the next id for a chat and save a new message under it.
    pub async fn post_message(
        &self,
        chat_id: &str,
        sender: &str,
        content: &str,
        attachment_urls: &[String],
    ) -> Result<(Message, MirrorOutcome), StoreError> {
        validate_chat_id(chat_id)?;

        let id = self
            .durable
            .next_message_id(chat_id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => StoreError::ChatNotFound(chat_id.to_string()),
                other => StoreError::from_tier(Tier::Durable, "next_message_id", chat_id, other),
            })?;

        let message = Message::new(id, chat_id, sender, content, attachment_urls);

        let outcome = self.save_message(message.clone()).await?;
        Ok((message, outcome))
    }

    /// Live messages with ids in `[offset, offset + limit - 1]`, ascending.
    pub async fn get_messages(&self, chat_id: &str, limit: u64, offset: u64) -> Result<Vec<Message>, StoreError> {
        let Some(requested) = IdRange::from_page(limit, offset) else {
            return Ok(Vec::new());
        };

        RangeResolver::new(&self.durable, &self.fast)
            .resolve(chat_id, requested)
            .await
    }

    /// Logically delete a message in both tiers.
    ///
    /// Deleting a missing or already-deleted message succeeds.
    pub async fn delete_message(&self, chat_id: &str, message_id: u64) -> Result<MirrorOutcome, StoreError> {
        self.durable
            .delete(chat_id, message_id)
            .await
            .map_err(|e| StoreError::from_tier(Tier::Durable, "delete", chat_id, e))?;

        let _guard = self.tracker.lock(chat_id).await;
        match self.fast.delete(chat_id, message_id).await {
            Ok(()) => {
                debug!(chat_id, message_id, "tombstone mirrored");
                Ok(MirrorOutcome::Mirrored)
            }
            Err(RepositoryError::NotFound) => {
                debug!(chat_id, message_id, "message not cached, nothing to invalidate");
                Ok(MirrorOutcome::Mirrored)
            }
            Err(e) => self.mirror_failed(chat_id, "delete", e),
        }
    }

    /// Reload `[offset, offset + limit - 1]` from the durable tier into the
    /// fast tier and make it the chat's window.
    ///
    /// Tombstoned records are mirrored too, so a re-warm repairs cached
    /// copies whose deletion never reached the fast tier. Returns the live
    /// messages of the range. An empty range leaves the fast tier untouched.
    pub async fn cache_last_messages(&self, chat_id: &str, limit: u64, offset: u64) -> Result<Vec<Message>, StoreError> {
        let Some(requested) = IdRange::from_page(limit, offset) else {
            return Ok(Vec::new());
        };

        // Held from the durable read onwards: a delete that lands after the
        // read must mirror its tombstone after these writes, not before.
        let guard = self.tracker.lock(chat_id).await;
        let records = self
            .durable
            .get_range_with_tombstones(chat_id, requested.start, requested.end)
            .await
            .map_err(|e| StoreError::from_tier(Tier::Durable, "get_range_with_tombstones", chat_id, e))?;

        let Some(covering) = window::covering(chat_id, &records) else {
            debug!(chat_id, start = requested.start, end = requested.end, "nothing to re-warm");
            return Ok(Vec::new());
        };

        // Entries first, window last: the window never names ids that are
        // not cached yet.
        for record in &records {
            self.fast
                .save(record)
                .await
                .map_err(|e| StoreError::from_tier(Tier::Fast, "save", chat_id, e))?;
        }
        self.tracker
            .replace(&guard, &self.fast, covering.start, covering.end)
            .await
            .map_err(|e| StoreError::from_tier(Tier::Fast, "set_window", chat_id, e))?;
        drop(guard);

        info!(
            chat_id,
            start = covering.start,
            end = covering.end,
            records = records.len(),
            "cache re-warmed"
        );

        Ok(records.into_iter().filter(|m| !m.is_deleted()).collect())
    }

    /// The chat's current cache window, if any.
    pub async fn window(&self, chat_id: &str) -> Result<Option<CacheWindow>, StoreError> {
        self.fast
            .get_window(chat_id)
            .await
            .map_err(|e| StoreError::from_tier(Tier::Fast, "get_window", chat_id, e))
    }

    fn mirror_failed(
        &self,
        chat_id: &str,
        operation: &'static str,
        err: RepositoryError,
    ) -> Result<MirrorOutcome, StoreError> {
        match self.mirror_policy {
            MirrorPolicy::BestEffort => {
                warn!(chat_id, operation, error = %err, "fast tier mirror failed, cache is lagging");
                Ok(MirrorOutcome::Lagging)
            }
            MirrorPolicy::Strict => Err(StoreError::from_tier(Tier::Fast, operation, chat_id, err)),
        }
    }
}

fn validate_chat_id(chat_id: &str) -> Result<(), StoreError> {
    if chat_id.trim().is_empty() {
        return Err(StoreError::InvalidChatId(chat_id.to_string()));
    }
    Ok(())
}
