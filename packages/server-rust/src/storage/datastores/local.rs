//! Process-local [`KeyValueClient`] implementation.
//!
//! [`LocalKvClient`] keeps items in a sorted map behind a mutex. It stands in
//! for the external service in tests and in the `memory-kv` backend, and can
//! be told to fail upcoming puts or deletes so callers can exercise their
//! error paths.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::bail;
use async_trait::async_trait;
use meditation_core::StorageKey;
use parking_lot::Mutex;

use crate::storage::kv_client::{ConditionFailed, Item, KeyValueClient, WriteOp};

/// In-process key-value client with optional transactions and fault injection.
pub struct LocalKvClient {
    items: Mutex<BTreeMap<StorageKey, Vec<u8>>>,
    transactional: bool,
    failing_puts: AtomicU32,
    failing_deletes: AtomicU32,
}

impl LocalKvClient {
    /// Client that supports multi-item transactions.
    #[must_use]
    pub fn new() -> Self {
        Self::with_transactions(true)
    }

    /// Client that rejects `transact_write`, forcing callers onto
    /// independent put/delete calls.
    #[must_use]
    pub fn without_transactions() -> Self {
        Self::with_transactions(false)
    }

    fn with_transactions(transactional: bool) -> Self {
        Self {
            items: Mutex::new(BTreeMap::new()),
            transactional,
            failing_puts: AtomicU32::new(0),
            failing_deletes: AtomicU32::new(0),
        }
    }

    /// The next `n` calls to `put_item` fail.
    pub fn fail_next_puts(&self, n: u32) {
        self.failing_puts.store(n, Ordering::SeqCst);
    }

    /// The next `n` calls to `delete_item` fail.
    pub fn fail_next_deletes(&self, n: u32) {
        self.failing_deletes.store(n, Ordering::SeqCst);
    }

    /// Number of stored items across all partitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Every stored key, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<StorageKey> {
        self.items.lock().keys().cloned().collect()
    }

    /// Consumes one pending injected failure, if any.
    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for LocalKvClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueClient for LocalKvClient {
    async fn put_item(&self, item: Item) -> anyhow::Result<()> {
        if Self::take_failure(&self.failing_puts) {
            bail!("injected put failure for {}", item.key);
        }
        self.items.lock().insert(item.key, item.payload);
        Ok(())
    }

    async fn query_partition(&self, pk: &str) -> anyhow::Result<Vec<Item>> {
        let start = StorageKey {
            pk: pk.to_string(),
            sk: String::new(),
        };
        let items = self.items.lock();
        Ok(items
            .range(start..)
            .take_while(|(key, _)| key.pk == pk)
            .map(|(key, payload)| Item {
                key: key.clone(),
                payload: payload.clone(),
            })
            .collect())
    }

    async fn delete_item(&self, key: &StorageKey) -> anyhow::Result<()> {
        if Self::take_failure(&self.failing_deletes) {
            bail!("injected delete failure for {key}");
        }
        self.items.lock().remove(key);
        Ok(())
    }

    async fn transact_write(&self, ops: Vec<WriteOp>) -> anyhow::Result<()> {
        if !self.transactional {
            bail!("transactions are not supported by this client");
        }
        let mut items = self.items.lock();
        for op in &ops {
            if let Some(condition) = op.condition() {
                if !condition.holds(items.contains_key(op.key())) {
                    return Err(ConditionFailed {
                        key: op.key().clone(),
                        condition,
                    }
                    .into());
                }
            }
        }
        for op in ops {
            match op {
                WriteOp::Put { item, .. } => {
                    items.insert(item.key, item.payload);
                }
                WriteOp::Delete { key, .. } => {
                    items.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn supports_transactions(&self) -> bool {
        self.transactional
    }
}
