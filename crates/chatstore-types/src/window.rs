//! Per-chat cache window descriptor.
//!
//! The window `[start, end]` names the message ids mirrored into the fast
//! tier for one chat. It is stored as two colon-joined integers, e.g. `"8:10"`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::WindowError;

/// Inclusive id bounds currently mirrored into the fast tier for a chat.
///
/// Every message id in `[start, end]` that exists in the chat is present in
/// the fast tier with deletions reflected. Constructors enforce
/// `start <= end`; the fields stay public so callers can inspect them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheWindow {
    pub chat_id: String,
    pub start: u64,
    pub end: u64,
}

impl CacheWindow {
    /// Build a window, rejecting inverted bounds.
    pub fn new(chat_id: impl Into<String>, start: u64, end: u64) -> Result<Self, WindowError> {
        if start > end {
            return Err(WindowError::Inverted { start, end });
        }
        Ok(Self {
            chat_id: chat_id.into(),
            start,
            end,
        })
    }

    /// A window covering exactly one id.
    pub fn single(chat_id: impl Into<String>, id: u64) -> Self {
        Self {
            chat_id: chat_id.into(),
            start: id,
            end: id,
        }
    }

    /// Parse a stored `"start:end"` descriptor.
    ///
    /// Anything other than two unsigned integers with `start <= end` is
    /// rejected. Malformed values are never coerced to zero.
    pub fn from_limits(chat_id: impl Into<String>, raw: &str) -> Result<Self, WindowError> {
        let mut parts = raw.split(':');
        let (Some(start), Some(end), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(WindowError::Malformed(raw.to_string()));
        };

        let start: u64 = start
            .parse()
            .map_err(|_| WindowError::Malformed(raw.to_string()))?;
        let end: u64 = end
            .parse()
            .map_err(|_| WindowError::Malformed(raw.to_string()))?;

        Self::new(chat_id, start, end)
    }

    /// Serialize to the stored `"start:end"` form.
    pub fn to_limits(&self) -> String {
        format!("{}:{}", self.start, self.end)
    }

    /// Whether `id` falls inside the window.
    pub fn contains(&self, id: u64) -> bool {
        self.start <= id && id <= self.end
    }
}

impl fmt::Display for CacheWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}, {}]", self.chat_id, self.start, self.end)
    }
}
