//! Durable [`MeditationStore`] on top of a two-attribute key-value service.
//!
//! Every record is stored at `pk = owner_id`, `sk = "<name>/<id>"` with a
//! `MsgPack` copy of the full record as payload. Because the key carries the
//! display name and not the id alone, lookups by id scan the owner's
//! partition, and a rename has to move the record to a new key.
//!
//! Relocation uses the client's transactional batch (put new + delete old,
//! the delete conditioned on the old key still existing) when available.
//! Otherwise the new key is written first and the old key deleted second;
//! if that delete fails the update still succeeds, the old key is remembered
//! as stale and hidden from reads until [`KvMeditationStore::repair_pending`]
//! or [`KvMeditationStore::repair_partition`] removes it.
//!
//! Mutations on one owner are serialized inside this process by a per-owner
//! async mutex. Across processes, only the transactional rename is guarded
//! (by its condition); same-key overwrites are last-writer-wins.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use meditation_core::{Meditation, StorageKey};
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::storage::error::{StoreError, StoreResult};
use crate::storage::kv_client::{Condition, Item, KeyValueClient, WriteOp};
use crate::traits::MeditationStore;

/// Settings for [`KvMeditationStore`].
#[derive(Debug, Clone)]
pub struct DurableStoreConfig {
    /// Relocate renamed records with one transactional batch when the client
    /// supports it. When `false`, always use independent put + delete.
    pub transactional_rename: bool,
}

impl Default for DurableStoreConfig {
    fn default() -> Self {
        Self {
            transactional_rename: true,
        }
    }
}

/// Durable store keyed by `(owner_id, "<name>/<id>")`.
pub struct KvMeditationStore {
    client: Arc<dyn KeyValueClient>,
    config: DurableStoreConfig,
    owner_locks: DashMap<String, Arc<AsyncMutex<()>>>,
    /// Old keys left behind by a rename whose delete failed.
    stale: Mutex<HashSet<StorageKey>>,
}

impl KvMeditationStore {
    /// Creates a store over `client` with default settings.
    #[must_use]
    pub fn new(client: Arc<dyn KeyValueClient>) -> Self {
        Self::with_config(client, DurableStoreConfig::default())
    }

    #[must_use]
    pub fn with_config(client: Arc<dyn KeyValueClient>, config: DurableStoreConfig) -> Self {
        Self {
            client,
            config,
            owner_locks: DashMap::new(),
            stale: Mutex::new(HashSet::new()),
        }
    }

    /// Whether renames go through a single atomic batch.
    #[must_use]
    pub fn uses_transactional_rename(&self) -> bool {
        self.config.transactional_rename && self.client.supports_transactions()
    }

    /// Stale keys awaiting deletion, sorted.
    #[must_use]
    pub fn pending_repairs(&self) -> Vec<StorageKey> {
        let mut keys: Vec<StorageKey> = self.stale.lock().iter().cloned().collect();
        keys.sort();
        keys
    }

    /// Retries deletion of every stale key left by a failed rename.
    ///
    /// Returns how many were removed. Keys whose delete fails again stay
    /// pending and are logged.
    ///
    /// # Errors
    ///
    /// Never fails as a whole; individual delete failures are logged.
    pub async fn repair_pending(&self) -> StoreResult<usize> {
        let mut repaired = 0;
        for key in self.pending_repairs() {
            let _guard = self.lock_owner(&key.pk).await;
            // An update may have written this key again while we waited.
            if !self.is_stale(&key) {
                continue;
            }
            match self.client.delete_item(&key).await {
                Ok(()) => {
                    self.stale.lock().remove(&key);
                    repaired += 1;
                }
                Err(e) => warn!(%key, error = %e, "stale key delete failed again"),
            }
        }
        if repaired > 0 {
            info!(repaired, "removed stale keys");
        }
        Ok(repaired)
    }

    /// Collapses every id stored under more than one key in the owner's
    /// partition down to a single entry.
    ///
    /// Known stale keys are removed first. Any duplicate that remains (for
    /// example after a restart lost the stale set) keeps the entry with the
    /// greatest sort key; the others are deleted and logged. Returns the
    /// number of entries removed.
    ///
    /// # Errors
    ///
    /// `ReadFailure` if the partition cannot be read or decoded,
    /// `WriteFailure` if a delete fails.
    pub async fn repair_partition(&self, owner_id: &str) -> StoreResult<usize> {
        let _guard = self.lock_owner(owner_id).await;
        let items = self
            .client
            .query_partition(owner_id)
            .await
            .map_err(|e| StoreError::read("repair", e))?;

        let mut removed = 0;
        let mut by_id: HashMap<String, Vec<StorageKey>> = HashMap::new();
        for item in items {
            if self.is_stale(&item.key) {
                self.delete_key(&item.key, "repair").await?;
                self.stale.lock().remove(&item.key);
                removed += 1;
                continue;
            }
            let record = decode(&item)?;
            by_id.entry(record.id).or_default().push(item.key);
        }

        for (id, mut keys) in by_id {
            if keys.len() < 2 {
                continue;
            }
            keys.sort();
            let kept = keys.pop();
            for key in keys {
                warn!(owner_id, id = %id, discarded = %key, kept = ?kept, "removing duplicate entry");
                self.delete_key(&key, "repair").await?;
                removed += 1;
            }
        }

        if removed > 0 {
            info!(owner_id, removed, "partition repaired");
        }
        Ok(removed)
    }

    async fn lock_owner(&self, owner_id: &str) -> OwnerGuard<'_> {
        let lock = Arc::clone(self.owner_locks.entry(owner_id.to_string()).or_default().value());
        OwnerGuard {
            locks: &self.owner_locks,
            owner_id: owner_id.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }

    fn is_stale(&self, key: &StorageKey) -> bool {
        self.stale.lock().contains(key)
    }

    /// Decoded, non-stale records in the owner's partition with their keys.
    async fn load_partition(&self, owner_id: &str) -> StoreResult<Vec<(StorageKey, Meditation)>> {
        let items = self
            .client
            .query_partition(owner_id)
            .await
            .map_err(|e| StoreError::read("list", e))?;
        items
            .into_iter()
            .filter(|item| !self.is_stale(&item.key))
            .map(|item| decode(&item).map(|record| (item.key, record)))
            .collect()
    }

    /// Resolves `id` to its current key and stored record.
    async fn find(&self, owner_id: &str, id: &str) -> StoreResult<(StorageKey, Meditation)> {
        let entries = self.load_partition(owner_id).await?;
        if entries.is_empty() {
            return Err(StoreError::owner_not_found(owner_id));
        }
        entries
            .into_iter()
            .find(|(_, record)| record.id == id)
            .ok_or_else(|| StoreError::record_not_found(owner_id, id))
    }

    async fn put(&self, record: &Meditation, op: &'static str) -> StoreResult<()> {
        let item = encode(record)?;
        let key = item.key.clone();
        self.client
            .put_item(item)
            .await
            .map_err(|e| StoreError::write(op, e))?;
        // A key written again is live, even if an earlier rename left it stale.
        self.stale.lock().remove(&key);
        Ok(())
    }

    async fn delete_key(&self, key: &StorageKey, op: &'static str) -> StoreResult<()> {
        self.client
            .delete_item(key)
            .await
            .map_err(|e| StoreError::write(op, e))
    }

    async fn relocate(&self, old_key: StorageKey, record: &Meditation) -> StoreResult<()> {
        if self.uses_transactional_rename() {
            let item = encode(record)?;
            let new_key = item.key.clone();
            self.client
                .transact_write(vec![
                    WriteOp::Put {
                        item,
                        condition: None,
                    },
                    WriteOp::Delete {
                        key: old_key,
                        condition: Some(Condition::Exists),
                    },
                ])
                .await
                .map_err(|e| StoreError::write("rename", e))?;
            self.stale.lock().remove(&new_key);
            return Ok(());
        }

        self.put(record, "rename").await?;
        if let Err(e) = self.client.delete_item(&old_key).await {
            warn!(
                old_key = %old_key,
                new_key = %StorageKey::for_record(record),
                error = %e,
                "rename left a stale entry under the old key"
            );
            self.stale.lock().insert(old_key);
        }
        Ok(())
    }
}

/// Holds an owner's mutation lock. On drop, the owner's map entry is removed
/// once no other caller holds or waits on it.
struct OwnerGuard<'a> {
    locks: &'a DashMap<String, Arc<AsyncMutex<()>>>,
    owner_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for OwnerGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // Clones are only taken under the shard lock `remove_if` holds, so a
        // count of one means the map's copy is the last.
        self.locks
            .remove_if(&self.owner_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

fn encode(record: &Meditation) -> StoreResult<Item> {
    let payload = rmp_serde::to_vec_named(record).map_err(|e| StoreError::write("encode", e))?;
    Ok(Item {
        key: StorageKey::for_record(record),
        payload,
    })
}

fn decode(item: &Item) -> StoreResult<Meditation> {
    rmp_serde::from_slice(&item.payload).map_err(|e| {
        StoreError::read("decode", anyhow::Error::new(e).context(item.key.to_string()))
    })
}

#[async_trait]
impl MeditationStore for KvMeditationStore {
    async fn save(&self, record: Meditation) -> StoreResult<()> {
        debug!(owner_id = %record.owner_id, id = %record.id, "kv save");
        let _guard = self.lock_owner(&record.owner_id).await;
        self.put(&record, "save").await
    }

    async fn list(&self, owner_id: &str) -> StoreResult<Vec<Meditation>> {
        Ok(self
            .load_partition(owner_id)
            .await?
            .into_iter()
            .map(|(_, record)| record)
            .collect())
    }

    async fn get(&self, owner_id: &str, id: &str) -> StoreResult<Meditation> {
        self.find(owner_id, id).await.map(|(_, record)| record)
    }

    async fn delete(&self, owner_id: &str, id: &str) -> StoreResult<()> {
        debug!(owner_id, id, "kv delete");
        let _guard = self.lock_owner(owner_id).await;
        let (key, _) = self.find(owner_id, id).await?;
        self.delete_key(&key, "delete").await
    }

    async fn update(&self, record: Meditation) -> StoreResult<()> {
        debug!(owner_id = %record.owner_id, id = %record.id, "kv update");
        let _guard = self.lock_owner(&record.owner_id).await;
        let (old_key, existing) = self.find(&record.owner_id, &record.id).await?;
        if existing.name == record.name {
            return self.put(&record, "update").await;
        }
        debug!(from = %existing.name, to = %record.name, "relocating renamed record");
        self.relocate(old_key, &record).await
    }

    fn backend_name(&self) -> &'static str {
        "kv"
    }
}
