//! Configuration types for chatstore.
//!
//! `StoreConfig` represents the top-level `config.toml` in the data
//! directory. Every field has a default, so an empty file is valid.

use serde::{Deserialize, Serialize};

/// What the service does when the fast-tier mirror write fails after the
/// durable write succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MirrorPolicy {
    /// Log the failure and report the cache as lagging.
    #[default]
    BestEffort,
    /// Surface the fast-tier failure to the caller.
    Strict,
}

/// Top-level configuration, loaded from `{data_dir}/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub mirror_policy: MirrorPolicy,

    /// Page size used by the CLI when `--limit` is omitted.
    #[serde(default = "default_limit")]
    pub default_limit: u64,

    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_limit() -> u64 {
    50
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            mirror_policy: MirrorPolicy::default(),
            default_limit: default_limit(),
            storage: StorageConfig::default(),
        }
    }
}

/// Database file locations, relative to the data directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_durable_file")]
    pub durable_file: String,

    #[serde(default = "default_cache_file")]
    pub cache_file: String,

    #[serde(default = "default_max_reader_connections")]
    pub max_reader_connections: u32,
}

fn default_durable_file() -> String {
    "durable.db".to_string()
}

fn default_cache_file() -> String {
    "cache.db".to_string()
}

fn default_max_reader_connections() -> u32 {
    8
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            durable_file: default_durable_file(),
            cache_file: default_cache_file(),
            max_reader_connections: default_max_reader_connections(),
        }
    }
}
