//! Shared domain types for chatstore.
//!
//! This crate contains the data model shared by every tier: messages and
//! their attachments, the per-chat cache window, configuration, and the
//! error types surfaced by repositories and the storage service.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod config;
pub mod error;
pub mod message;
pub mod window;
