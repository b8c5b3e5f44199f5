//! Builds the configured [`MeditationStore`] backend.
//!
//! [`StoreFactory`] is the dependency injection point: the backend is chosen
//! once from [`StoreConfig`] and handed out as `Arc<dyn MeditationStore>`.

use std::sync::Arc;

use tracing::info;

use crate::config::{BackendKind, StoreConfig};
use crate::storage::datastores::LocalKvClient;
use crate::storage::impls::{DurableStoreConfig, KvMeditationStore, MemoryMeditationStore};
use crate::storage::kv_client::KeyValueClient;
use crate::traits::MeditationStore;

/// Factory for fully-wired [`MeditationStore`] instances.
pub struct StoreFactory {
    config: StoreConfig,
}

impl StoreFactory {
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Creates the store selected by the configuration.
    ///
    /// # Errors
    ///
    /// Fails if the redb file cannot be opened, or if the redb backend was
    /// requested from a build without the `redb` feature.
    pub fn build(&self) -> anyhow::Result<Arc<dyn MeditationStore>> {
        let store: Arc<dyn MeditationStore> = match self.config.backend {
            BackendKind::Memory => Arc::new(MemoryMeditationStore::new()),
            BackendKind::MemoryKv => self.kv_store(Arc::new(LocalKvClient::new())),
            BackendKind::Redb => self.kv_store(self.redb_client()?),
        };
        info!(
            backend = %self.config.backend,
            transactional_rename = self.config.transactional_rename,
            "storage backend ready"
        );
        Ok(store)
    }

    /// Wraps `client` in a durable store using this factory's settings.
    #[must_use]
    pub fn kv_store(&self, client: Arc<dyn KeyValueClient>) -> Arc<dyn MeditationStore> {
        Arc::new(self.kv_store_concrete(client))
    }

    /// Like [`kv_store`](Self::kv_store) but keeps the concrete type, for
    /// callers that need the repair operations.
    #[must_use]
    pub fn kv_store_concrete(&self, client: Arc<dyn KeyValueClient>) -> KvMeditationStore {
        KvMeditationStore::with_config(
            client,
            DurableStoreConfig {
                transactional_rename: self.config.transactional_rename,
            },
        )
    }

    /// Opens the configured redb file as a key-value client.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened or the feature is disabled.
    #[cfg(feature = "redb")]
    pub fn redb_client(&self) -> anyhow::Result<Arc<dyn KeyValueClient>> {
        let client = crate::storage::datastores::RedbClient::open(&self.config.redb_path)?;
        Ok(Arc::new(client))
    }

    /// Opens the configured redb file as a key-value client.
    ///
    /// # Errors
    ///
    /// Always fails: this build has no redb support.
    #[cfg(not(feature = "redb"))]
    pub fn redb_client(&self) -> anyhow::Result<Arc<dyn KeyValueClient>> {
        anyhow::bail!("the redb backend requires the `redb` feature")
    }
}
