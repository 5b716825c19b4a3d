//! Cache maintenance commands.

use anyhow::Result;
use chatstore_types::message::Message;
use chatstore_types::window::CacheWindow;
use console::style;

use super::message::print_messages;
use crate::state::AppState;

/// Reload `[offset, offset + limit - 1]` from the durable store into the
/// cache and print the live messages of that range.
pub async fn rewarm(state: &AppState, chat_id: &str, limit: u64, offset: u64, json: bool) -> Result<()> {
    let messages = state.storage.cache_last_messages(chat_id, limit, offset).await?;

    if !json {
        let window = state.storage.window(chat_id).await?;
        if let Some(line) = window_line(chat_id, &messages, window) {
            println!();
            println!("{line}");
        }
    }

    print_messages(chat_id, &messages, json)
}

/// The window after a re-warm that returned messages. An empty result says
/// nothing about the window, so no line is shown for it.
fn window_line(chat_id: &str, messages: &[Message], window: Option<CacheWindow>) -> Option<String> {
    if messages.is_empty() {
        return None;
    }
    let window = window?;
    Some(format!(
        "  {} Cache window for '{}': ids {} to {}",
        style("ok").green(),
        style(chat_id).cyan(),
        window.start,
        window.end,
    ))
}
