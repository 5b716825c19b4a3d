//! CLI command definitions and dispatch for the `chatstore` binary.
//!
//! Uses clap derive macros for argument parsing. Commands are verbs acting on
//! a chat (e.g., `chatstore send general --sender ann "hi"`).

pub mod cache;
pub mod chat;
pub mod message;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;

use crate::state::AppState;

/// Two-tier chat message storage.
#[derive(Parser)]
#[command(name = "chatstore", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new chat.
    #[command(name = "create-chat")]
    CreateChat {
        /// Chat identifier.
        chat: String,
    },

    /// Post a message under the next free id.
    Send {
        /// Chat identifier.
        chat: String,

        /// Who sent the message.
        #[arg(long)]
        sender: String,

        /// Message text.
        content: String,

        /// Attachment URL (repeatable).
        #[arg(long = "attach")]
        attachments: Vec<String>,
    },

    /// Save a message under an explicit id.
    Save {
        /// Chat identifier.
        chat: String,

        /// Message id (must be unused in the chat).
        id: u64,

        /// Who sent the message.
        #[arg(long)]
        sender: String,

        /// Message text.
        content: String,

        /// Attachment URL (repeatable).
        #[arg(long = "attach")]
        attachments: Vec<String>,
    },

    /// Read messages by id range `[offset, offset + limit - 1]`.
    Get {
        /// Chat identifier.
        chat: String,

        /// Number of ids to cover (defaults to `default_limit` from config).
        #[arg(long)]
        limit: Option<u64>,

        /// First message id of the range.
        #[arg(long, default_value_t = 1)]
        offset: u64,
    },

    /// Logically delete a message.
    #[command(alias = "rm")]
    Delete {
        /// Chat identifier.
        chat: String,

        /// Message id.
        id: u64,
    },

    /// Reload an id range from the durable store into the cache.
    Rewarm {
        /// Chat identifier.
        chat: String,

        /// Number of ids to cover (defaults to `default_limit` from config).
        #[arg(long)]
        limit: Option<u64>,

        /// First message id of the range.
        #[arg(long, default_value_t = 1)]
        offset: u64,
    },

    /// Show the chat's cache window.
    Window {
        /// Chat identifier.
        chat: String,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

/// Run a command against the opened state.
pub async fn dispatch(command: Commands, state: &AppState, json: bool) -> Result<()> {
    let default_limit = state.config.default_limit;

    match command {
        Commands::CreateChat { chat } => chat::create_chat(state, &chat, json).await,
        Commands::Send {
            chat,
            sender,
            content,
            attachments,
        } => message::send_message(state, &chat, &sender, &content, &attachments, json).await,
        Commands::Save {
            chat,
            id,
            sender,
            content,
            attachments,
        } => message::save_message(state, &chat, id, &sender, &content, &attachments, json).await,
        Commands::Get { chat, limit, offset } => {
            message::get_messages(state, &chat, limit.unwrap_or(default_limit), offset, json).await
        }
        Commands::Delete { chat, id } => message::delete_message(state, &chat, id, json).await,
        Commands::Rewarm { chat, limit, offset } => {
            cache::rewarm(state, &chat, limit.unwrap_or(default_limit), offset, json).await
        }
        Commands::Window { chat } => chat::show_window(state, &chat, json).await,
        // Handled before state is opened.
        Commands::Completions { .. } => Ok(()),
    }
}
