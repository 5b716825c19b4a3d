//! Storage logic and tier trait definitions for chatstore.
//!
//! This crate defines the "ports" (tier traits) that the infrastructure
//! layer implements, plus the logic that sits between them: window
//! maintenance, range resolution across tiers, and the storage service.
//! It depends only on `chatstore-types` -- never on `chatstore-infra` or
//! any database crate.

pub mod repository;
pub mod resolver;
pub mod service;
pub mod window;

#[cfg(test)]
pub(crate) mod testing;
