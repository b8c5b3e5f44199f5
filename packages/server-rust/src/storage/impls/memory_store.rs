//! In-memory [`MeditationStore`] backed by [`DashMap`].
//!
//! Each owner maps to a growable sequence of records. A partition's sequence
//! is only ever touched while holding its `DashMap` shard lock, so concurrent
//! callers on the same owner are serialized and callers on different owners
//! mostly are not. Nothing survives a restart.

use async_trait::async_trait;
use dashmap::DashMap;
use meditation_core::Meditation;
use tracing::debug;

use crate::storage::error::{StoreError, StoreResult};
use crate::traits::MeditationStore;

/// Transient store: `owner_id -> Vec<Meditation>`.
///
/// Deletion swaps the removed element with the last one and truncates, so
/// the relative order of the remaining records changes. List order is
/// unspecified.
pub struct MemoryMeditationStore {
    partitions: DashMap<String, Vec<Meditation>>,
}

impl MemoryMeditationStore {
    /// Creates a new, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            partitions: DashMap::new(),
        }
    }

    /// Number of owners that have ever saved a record.
    #[must_use]
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Total number of records across all owners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.partitions.iter().map(|p| p.value().len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryMeditationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MeditationStore for MemoryMeditationStore {
    async fn save(&self, record: Meditation) -> StoreResult<()> {
        debug!(owner_id = %record.owner_id, id = %record.id, "memory save");
        let mut partition = self.partitions.entry(record.owner_id.clone()).or_default();
        match partition.iter().position(|m| m.id == record.id) {
            Some(idx) => partition[idx] = record,
            None => partition.push(record),
        }
        Ok(())
    }

    async fn list(&self, owner_id: &str) -> StoreResult<Vec<Meditation>> {
        Ok(self
            .partitions
            .get(owner_id)
            .map(|p| p.value().clone())
            .unwrap_or_default())
    }

    async fn get(&self, owner_id: &str, id: &str) -> StoreResult<Meditation> {
        let partition = self
            .partitions
            .get(owner_id)
            .ok_or_else(|| StoreError::owner_not_found(owner_id))?;
        partition
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| StoreError::record_not_found(owner_id, id))
    }

    async fn delete(&self, owner_id: &str, id: &str) -> StoreResult<()> {
        debug!(owner_id, id, "memory delete");
        let mut partition = self
            .partitions
            .get_mut(owner_id)
            .ok_or_else(|| StoreError::owner_not_found(owner_id))?;
        let idx = partition
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| StoreError::record_not_found(owner_id, id))?;
        // O(1): moves the last element into `idx`.
        partition.swap_remove(idx);
        Ok(())
    }

    async fn update(&self, record: Meditation) -> StoreResult<()> {
        debug!(owner_id = %record.owner_id, id = %record.id, "memory update");
        let mut partition = self
            .partitions
            .get_mut(&record.owner_id)
            .ok_or_else(|| StoreError::owner_not_found(&record.owner_id))?;
        let existing = partition
            .iter_mut()
            .find(|m| m.id == record.id)
            .ok_or_else(|| StoreError::record_not_found(&record.owner_id, &record.id))?;
        *existing = record;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
