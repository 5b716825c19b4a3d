//! Application state wiring the storage service together.
//!
//! The service is generic over the tier traits; AppState pins it to the
//! SQLite implementations.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chatstore_core::service::ChatStorageService;
use chatstore_infra::config::{load_config, resolve_data_dir};
use chatstore_infra::sqlite::durable::SqliteDurableTier;
use chatstore_infra::sqlite::fast::SqliteFastTier;
use chatstore_infra::sqlite::pool::{DatabasePool, Schema};
use chatstore_types::config::StoreConfig;

/// Concrete service type pinned to the SQLite tiers.
pub type ConcreteStorageService = ChatStorageService<SqliteDurableTier, SqliteFastTier>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<ConcreteStorageService>,
    pub config: StoreConfig,
}

impl AppState {
    /// Initialize from the resolved data directory.
    pub async fn init() -> Result<Self> {
        Self::open(resolve_data_dir()).await
    }

    /// Load `config.toml` from `data_dir`, open both databases, wire the service.
    pub async fn open(data_dir: PathBuf) -> Result<Self> {
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let config = load_config(&data_dir).await;
        let storage = &config.storage;

        let durable_path = data_dir.join(&storage.durable_file);
        let durable_pool = DatabasePool::open(&durable_path, Schema::Durable, storage.max_reader_connections)
            .await
            .with_context(|| format!("Failed to open durable store {}", durable_path.display()))?;

        let cache_path = data_dir.join(&storage.cache_file);
        let cache_pool = DatabasePool::open(&cache_path, Schema::Cache, storage.max_reader_connections)
            .await
            .with_context(|| format!("Failed to open cache store {}", cache_path.display()))?;

        let service = ChatStorageService::new(
            SqliteDurableTier::new(durable_pool),
            SqliteFastTier::new(cache_pool),
            config.mirror_policy,
        );

        tracing::debug!(data_dir = %data_dir.display(), policy = ?config.mirror_policy, "storage opened");

        Ok(Self {
            storage: Arc::new(service),
            config,
        })
    }
}
