//! Cache window maintenance.
//!
//! `WindowTracker` owns one async mutex per chat. Every fast-tier mutation
//! for a chat (mirror write, tombstone, re-warm) happens while holding that
//! chat's [`ChatGuard`], so the read-modify-write of the window descriptor
//! cannot lose updates. Reads never take the lock.

use std::sync::Arc;

use chatstore_types::error::RepositoryError;
use chatstore_types::message::Message;
use chatstore_types::window::CacheWindow;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use crate::repository::fast::FastTier;

/// How a write changed the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowChange {
    /// No window existed; one was created around the written id.
    Created,
    /// The written id is past the end and contiguous with it.
    Extended,
    /// The written id is already covered (or older than the window).
    Unchanged,
    /// The written id left a gap after the end; the window restarted at it.
    Reanchored,
}

/// Compute the window after mirroring message `id`.
///
/// Ids never extend the window across a gap: if `id > end + 1` the cache is
/// missing the ids in between, so the window restarts at `[id, id]`.
pub fn advance(current: Option<&CacheWindow>, chat_id: &str, id: u64) -> (CacheWindow, WindowChange) {
    let Some(window) = current else {
        return (CacheWindow::single(chat_id, id), WindowChange::Created);
    };

    if id <= window.end {
        return (window.clone(), WindowChange::Unchanged);
    }

    if id == window.end.saturating_add(1) {
        let extended = CacheWindow {
            chat_id: window.chat_id.clone(),
            start: window.start,
            end: id,
        };
        return (extended, WindowChange::Extended);
    }

    (CacheWindow::single(chat_id, id), WindowChange::Reanchored)
}

/// The window spanning every message in `messages`, `None` if empty.
pub fn covering(chat_id: &str, messages: &[Message]) -> Option<CacheWindow> {
    let start = messages.iter().map(|m| m.id).min()?;
    let end = messages.iter().map(|m| m.id).max()?;
    Some(CacheWindow {
        chat_id: chat_id.to_string(),
        start,
        end,
    })
}

/// Exclusive write access to one chat's fast-tier state.
///
/// Dropping the last guard for a chat removes its lock from the tracker, so
/// the tracker only holds entries for chats with a writer in flight.
pub struct ChatGuard<'a> {
    tracker: &'a WindowTracker,
    chat_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl ChatGuard<'_> {
    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }
}

impl Drop for ChatGuard<'_> {
    fn drop(&mut self) {
        // Release the mutex (and its Arc) before checking for other holders.
        self.guard.take();
        self.tracker
            .locks
            .remove_if(&self.chat_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Per-chat locks plus the window arithmetic applied under them.
#[derive(Default)]
pub struct WindowTracker {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl WindowTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive write access to a chat.
    pub async fn lock(&self, chat_id: &str) -> ChatGuard<'_> {
        // Clone the Arc out so the shard lock is released before awaiting.
        let lock = self
            .locks
            .entry(chat_id.to_string())
            .or_default()
            .value()
            .clone();

        ChatGuard {
            tracker: self,
            chat_id: chat_id.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Number of chats with a lock entry.
    pub fn tracked_chats(&self) -> usize {
        self.locks.len()
    }

    /// Advance the window after `message_id` was written to the fast tier.
    pub async fn record_write<F: FastTier>(
        &self,
        guard: &ChatGuard<'_>,
        fast: &F,
        message_id: u64,
    ) -> Result<(CacheWindow, WindowChange), RepositoryError> {
        let chat_id = guard.chat_id();
        let current = fast.get_window(chat_id).await?;
        let (next, change) = advance(current.as_ref(), chat_id, message_id);

        match change {
            WindowChange::Unchanged => {}
            WindowChange::Reanchored => {
                warn!(
                    chat_id,
                    message_id,
                    previous = ?current,
                    "cache window re-anchored after a gap"
                );
                fast.set_window(&next).await?;
            }
            WindowChange::Created | WindowChange::Extended => {
                fast.set_window(&next).await?;
            }
        }

        debug!(chat_id, start = next.start, end = next.end, ?change, "window updated");
        Ok((next, change))
    }

    /// Overwrite the window wholesale (re-warm).
    pub async fn replace<F: FastTier>(
        &self,
        guard: &ChatGuard<'_>,
        fast: &F,
        start: u64,
        end: u64,
    ) -> Result<CacheWindow, RepositoryError> {
        let window = CacheWindow::new(guard.chat_id(), start, end)
            .map_err(|e| RepositoryError::Corrupt(e.to_string()))?;
        fast.set_window(&window).await?;
        debug!(chat_id = guard.chat_id(), start, end, "window replaced");
        Ok(window)
    }
}
