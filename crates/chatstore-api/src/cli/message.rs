//! Message commands: send, save, get, delete.

use anyhow::Result;
use chatstore_core::service::MirrorOutcome;
use chatstore_types::message::Message;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use crate::state::AppState;

const PREVIEW_CHARS: usize = 60;

/// Post a message under the next allocated id.
pub async fn send_message(
    state: &AppState,
    chat_id: &str,
    sender: &str,
    content: &str,
    attachment_urls: &[String],
    json: bool,
) -> Result<()> {
    let (message, outcome) = state
        .storage
        .post_message(chat_id, sender, content, attachment_urls)
        .await?;

    print_stored(&message, outcome, json)
}

/// Save a message under a caller-chosen id.
pub async fn save_message(
    state: &AppState,
    chat_id: &str,
    id: u64,
    sender: &str,
    content: &str,
    attachment_urls: &[String],
    json: bool,
) -> Result<()> {
    let message = Message::new(id, chat_id, sender, content, attachment_urls);
    let outcome = state.storage.save_message(message.clone()).await?;
    print_stored(&message, outcome, json)
}

/// Print messages in `[offset, offset + limit - 1]`.
pub async fn get_messages(state: &AppState, chat_id: &str, limit: u64, offset: u64, json: bool) -> Result<()> {
    let messages = state.storage.get_messages(chat_id, limit, offset).await?;
    print_messages(chat_id, &messages, json)
}

/// Logically delete a message.
pub async fn delete_message(state: &AppState, chat_id: &str, id: u64, json: bool) -> Result<()> {
    let outcome = state.storage.delete_message(chat_id, id).await?;

    if json {
        let result = serde_json::json!({
            "chat": chat_id,
            "deleted": id,
            "cache_lagging": outcome == MirrorOutcome::Lagging,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!();
        println!(
            "  {} Deleted message {} from '{}'",
            style("ok").green(),
            style(id).bold(),
            style(chat_id).cyan(),
        );
        print_lagging_hint(chat_id, outcome);
        println!();
    }

    Ok(())
}

fn print_stored(message: &Message, outcome: MirrorOutcome, json: bool) -> Result<()> {
    if json {
        let result = serde_json::json!({
            "message": message,
            "cache_lagging": outcome == MirrorOutcome::Lagging,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Stored message {} in '{}'",
        style("ok").green(),
        style(message.id).bold(),
        style(&message.chat_id).cyan(),
    );
    print_lagging_hint(&message.chat_id, outcome);
    println!();
    Ok(())
}

fn print_lagging_hint(chat_id: &str, outcome: MirrorOutcome) {
    if outcome == MirrorOutcome::Lagging {
        println!(
            "  {} Cache was not updated; run `chatstore rewarm {chat_id}` to resync.",
            style("!").yellow().bold(),
        );
    }
}

/// Render a list of messages as a table, or as JSON.
pub(crate) fn print_messages(chat_id: &str, messages: &[Message], json: bool) -> Result<()> {
    if json {
        let result = serde_json::json!({
            "chat": chat_id,
            "count": messages.len(),
            "messages": messages,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if messages.is_empty() {
        println!();
        println!(
            "  {} No messages in that range of '{}'.",
            style("i").blue().bold(),
            style(chat_id).cyan(),
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("ID").fg(Color::White),
        Cell::new("Sender").fg(Color::White),
        Cell::new("Content").fg(Color::White),
        Cell::new("Files").fg(Color::White),
        Cell::new("Sent").fg(Color::White),
    ]);

    for message in messages {
        table.add_row(vec![
            Cell::new(message.id).fg(Color::Cyan),
            Cell::new(&message.sender),
            Cell::new(preview(&message.content)),
            Cell::new(message.attachments.len()).fg(Color::DarkGrey),
            Cell::new(message.created_at.format("%Y-%m-%d %H:%M:%S")).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("  Messages in '{}' ({})", style(chat_id).cyan(), messages.len());
    println!();
    println!("{table}");
    println!();
    Ok(())
}

fn preview(content: &str) -> String {
    let single_line = content.replace('\n', " ");
    if single_line.chars().count() > PREVIEW_CHARS {
        let cut: String = single_line.chars().take(PREVIEW_CHARS - 3).collect();
        format!("{cut}...")
    } else {
        single_line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_keeps_short_content() {
        assert_eq!(preview("hello"), "hello");
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "é".repeat(80);
        let shown = preview(&long);
        assert!(shown.ends_with("..."));
        assert_eq!(shown.chars().count(), PREVIEW_CHARS);
    }

    #[test]
    fn test_preview_flattens_newlines() {
        assert_eq!(preview("a\nb"), "a b");
    }
}
