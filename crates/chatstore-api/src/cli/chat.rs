//! Chat-level commands: creation and cache window inspection.

use anyhow::Result;
use console::style;

use crate::state::AppState;

/// Create a new chat.
pub async fn create_chat(state: &AppState, chat_id: &str, json: bool) -> Result<()> {
    state.storage.create_chat(chat_id).await?;

    if json {
        let result = serde_json::json!({ "created": chat_id });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!();
        println!("  {} Created chat '{}'", style("ok").green(), style(chat_id).cyan());
        println!();
    }

    Ok(())
}

/// Show which ids of the chat are mirrored in the cache.
pub async fn show_window(state: &AppState, chat_id: &str, json: bool) -> Result<()> {
    let window = state.storage.window(chat_id).await?;

    if json {
        let result = serde_json::json!({
            "chat": chat_id,
            "window": window,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!();
    match window {
        Some(window) => println!(
            "  Cache window for '{}': ids {} to {}",
            style(chat_id).cyan(),
            style(window.start).bold(),
            style(window.end).bold(),
        ),
        None => {
            println!(
                "  {} No cache window for '{}'.",
                style("i").blue().bold(),
                style(chat_id).cyan(),
            );
            println!("     Warm one with: chatstore rewarm {chat_id}");
        }
    }
    println!();

    Ok(())
}
