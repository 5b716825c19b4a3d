//! In-memory tiers for unit tests.
//!
//! Both mocks record the ranges they were asked to read so tests can assert
//! which tier served which part of a request, and both can be told to fail.

use std::collections::{BTreeMap, HashMap};
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chatstore_types::error::RepositoryError;
use chatstore_types::message::Message;
use chatstore_types::window::CacheWindow;
use chrono::Utc;
use tokio::sync::Notify;

use crate::repository::durable::DurableTier;
use crate::repository::fast::FastTier;

/// A live message with predictable content.
pub fn message(chat_id: &str, id: u64) -> Message {
    Message::new(id, chat_id, "tester", &format!("message {id}"), &[])
}

/// Pauses a tier call after it has read its data.
///
/// The tier signals `reached` once the read is done, then waits for
/// `release` before returning.
#[derive(Default)]
pub struct ScanGate {
    pub reached: Notify,
    pub release: Notify,
}

fn unavailable() -> RepositoryError {
    RepositoryError::Query("simulated outage".to_string())
}

// ---------------------------------------------------------------------------
// Durable tier
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryDurableTier {
    chats: Mutex<HashMap<String, BTreeMap<u64, Message>>>,
    counters: Mutex<HashMap<String, u64>>,
    reads: Mutex<Vec<(u64, u64)>>,
    tombstone_scan_gate: Mutex<Option<Arc<ScanGate>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryDurableTier {
    /// A tier holding one chat with live messages for every id in `ids`.
    pub fn with_messages(chat_id: &str, ids: RangeInclusive<u64>) -> Self {
        let tier = Self::default();
        let log = ids.map(|id| (id, message(chat_id, id))).collect();
        tier.chats.lock().unwrap().insert(chat_id.to_string(), log);
        tier
    }

    pub fn range_reads(&self) -> Vec<(u64, u64)> {
        self.reads.lock().unwrap().clone()
    }

    /// Hold the next `get_range_with_tombstones` call at the returned gate.
    pub fn pause_next_tombstone_scan(&self) -> Arc<ScanGate> {
        let gate = Arc::new(ScanGate::default());
        *self.tombstone_scan_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn fail_next_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_next_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// The stored record, tombstoned or not.
    pub fn stored(&self, chat_id: &str, id: u64) -> Option<Message> {
        self.chats.lock().unwrap().get(chat_id)?.get(&id).cloned()
    }

    fn scan(&self, chat_id: &str, start: u64, end: u64, include_deleted: bool) -> Result<Vec<Message>, RepositoryError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.reads.lock().unwrap().push((start, end));
        let chats = self.chats.lock().unwrap();
        let Some(log) = chats.get(chat_id) else {
            return Ok(Vec::new());
        };
        if start > end {
            return Ok(Vec::new());
        }
        Ok(log
            .range(start..=end)
            .map(|(_, m)| m)
            .filter(|m| include_deleted || !m.is_deleted())
            .cloned()
            .collect())
    }
}

impl DurableTier for MemoryDurableTier {
    async fn create_chat(&self, chat_id: &str) -> Result<(), RepositoryError> {
        let mut chats = self.chats.lock().unwrap();
        if chats.contains_key(chat_id) {
            return Err(RepositoryError::Conflict(format!("chat '{chat_id}' already exists")));
        }
        chats.insert(chat_id.to_string(), BTreeMap::new());
        Ok(())
    }

    async fn save(&self, message: &Message) -> Result<(), RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let mut chats = self.chats.lock().unwrap();
        let log = chats.get_mut(&message.chat_id).ok_or(RepositoryError::NotFound)?;
        if log.contains_key(&message.id) {
            return Err(RepositoryError::Conflict(format!("message {} exists", message.id)));
        }
        log.insert(message.id, message.clone());
        Ok(())
    }

    async fn get_range(&self, chat_id: &str, start: u64, end: u64) -> Result<Vec<Message>, RepositoryError> {
        self.scan(chat_id, start, end, false)
    }

    async fn get_range_with_tombstones(
        &self,
        chat_id: &str,
        start: u64,
        end: u64,
    ) -> Result<Vec<Message>, RepositoryError> {
        let records = self.scan(chat_id, start, end, true)?;
        let gate = self.tombstone_scan_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.reached.notify_one();
            gate.release.notified().await;
        }
        Ok(records)
    }

    async fn delete(&self, chat_id: &str, message_id: u64) -> Result<(), RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let mut chats = self.chats.lock().unwrap();
        if let Some(message) = chats.get_mut(chat_id).and_then(|log| log.get_mut(&message_id)) {
            message.tombstone(Utc::now());
        }
        Ok(())
    }

    async fn next_message_id(&self, chat_id: &str) -> Result<u64, RepositoryError> {
        let highest_saved = {
            let chats = self.chats.lock().unwrap();
            let log = chats.get(chat_id).ok_or(RepositoryError::NotFound)?;
            log.keys().next_back().copied().unwrap_or(0)
        };
        let mut counters = self.counters.lock().unwrap();
        let counter = counters.entry(chat_id.to_string()).or_insert(0);
        *counter = (*counter).max(highest_saved) + 1;
        Ok(*counter)
    }
}

// ---------------------------------------------------------------------------
// Fast tier
// ---------------------------------------------------------------------------

enum WindowSlot {
    Raw(String),
    Parsed(CacheWindow),
}

#[derive(Default)]
pub struct MemoryFastTier {
    entries: Mutex<BTreeMap<(String, u64), Message>>,
    windows: Mutex<HashMap<String, WindowSlot>>,
    reads: Mutex<Vec<(u64, u64)>>,
    fail_writes: AtomicBool,
}

impl MemoryFastTier {
    /// A tier caching live messages for every id in `ids` with a matching
    /// window.
    pub fn with_window(chat_id: &str, ids: RangeInclusive<u64>) -> Self {
        let tier = Self::default();
        {
            let mut entries = tier.entries.lock().unwrap();
            for id in ids.clone() {
                entries.insert((chat_id.to_string(), id), message(chat_id, id));
            }
        }
        tier.set_raw_window(chat_id, &format!("{}:{}", ids.start(), ids.end()));
        tier
    }

    pub fn range_reads(&self) -> Vec<(u64, u64)> {
        self.reads.lock().unwrap().clone()
    }

    pub fn fail_next_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Store a descriptor exactly as given, bypassing validation.
    pub fn set_raw_window(&self, chat_id: &str, raw: &str) {
        self.windows
            .lock()
            .unwrap()
            .insert(chat_id.to_string(), WindowSlot::Raw(raw.to_string()));
    }

    /// Store a window the way a buggy tier might hand it back, without the
    /// `start <= end` check.
    pub fn set_raw_window_unchecked(&self, chat_id: &str, start: u64, end: u64) {
        let window = CacheWindow {
            chat_id: chat_id.to_string(),
            start,
            end,
        };
        self.windows
            .lock()
            .unwrap()
            .insert(chat_id.to_string(), WindowSlot::Parsed(window));
    }

    /// The cached record, tombstoned or not.
    pub fn cached(&self, chat_id: &str, id: u64) -> Option<Message> {
        self.entries.lock().unwrap().get(&(chat_id.to_string(), id)).cloned()
    }
}

impl FastTier for MemoryFastTier {
    async fn save(&self, message: &Message) -> Result<(), RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.entries
            .lock()
            .unwrap()
            .insert((message.chat_id.clone(), message.id), message.clone());
        Ok(())
    }

    async fn get_range(&self, chat_id: &str, start: u64, end: u64) -> Result<Vec<Message>, RepositoryError> {
        self.reads.lock().unwrap().push((start, end));
        if start > end {
            return Ok(Vec::new());
        }
        let entries = self.entries.lock().unwrap();
        let lo = (chat_id.to_string(), start);
        let hi = (chat_id.to_string(), end);
        Ok(entries
            .range(lo..=hi)
            .map(|(_, m)| m)
            .filter(|m| !m.is_deleted())
            .cloned()
            .collect())
    }

    async fn delete(&self, chat_id: &str, message_id: u64) -> Result<(), RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let mut entries = self.entries.lock().unwrap();
        let message = entries
            .get_mut(&(chat_id.to_string(), message_id))
            .ok_or(RepositoryError::NotFound)?;
        message.tombstone(Utc::now());
        Ok(())
    }

    async fn get_window(&self, chat_id: &str) -> Result<Option<CacheWindow>, RepositoryError> {
        match self.windows.lock().unwrap().get(chat_id) {
            None => Ok(None),
            Some(WindowSlot::Parsed(window)) => Ok(Some(window.clone())),
            Some(WindowSlot::Raw(raw)) => CacheWindow::from_limits(chat_id, raw)
                .map(Some)
                .map_err(|e| RepositoryError::Corrupt(e.to_string())),
        }
    }

    async fn set_window(&self, window: &CacheWindow) -> Result<(), RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.set_raw_window(&window.chat_id, &window.to_limits());
        Ok(())
    }
}
