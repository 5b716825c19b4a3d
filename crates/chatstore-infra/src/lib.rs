//! Infrastructure layer for chatstore.
//!
//! Contains the SQLite implementations of the tier traits defined in
//! `chatstore-core` and the on-disk configuration loader.

pub mod config;
pub mod sqlite;
