//! Durable [`KeyValueClient`] backed by a local redb file.
//!
//! Items live in one table keyed by the tuple `(pk, sk)`, so a partition
//! query is a contiguous range scan starting at `(pk, "")`. Each call runs
//! in its own redb transaction on the blocking thread pool; a
//! `transact_write` batch shares one write transaction, which makes the
//! whole batch atomic.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use meditation_core::StorageKey;
use redb::{Database, ReadableTable, TableDefinition};

use crate::storage::kv_client::{ConditionFailed, Item, KeyValueClient, WriteOp};

/// `(pk, sk)` -> serialized record.
const MEDITATIONS: TableDefinition<'static, (&'static str, &'static str), &'static [u8]> =
    TableDefinition::new("meditations");

/// Key-value client storing items in a redb database file.
pub struct RedbClient {
    db: Arc<Database>,
    path: PathBuf,
}

impl RedbClient {
    /// Opens (or creates) the database at `path` and provisions the table.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened or the table cannot be created.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let db = Database::create(&path)
            .with_context(|| format!("failed to open redb database at {}", path.display()))?;

        // Read transactions fail on a table that was never created.
        let txn = db.begin_write()?;
        txn.open_table(MEDITATIONS)?;
        txn.commit()?;

        Ok(Self {
            db: Arc::new(db),
            path,
        })
    }

    /// Location of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn blocking<T, F>(&self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .context("redb task panicked")?
    }
}

#[async_trait]
impl KeyValueClient for RedbClient {
    async fn put_item(&self, item: Item) -> anyhow::Result<()> {
        self.blocking(move |db| {
            let txn = db.begin_write()?;
            {
                let mut table = txn.open_table(MEDITATIONS)?;
                table.insert(
                    (item.key.pk.as_str(), item.key.sk.as_str()),
                    item.payload.as_slice(),
                )?;
            }
            txn.commit()?;
            Ok(())
        })
        .await
    }

    async fn query_partition(&self, pk: &str) -> anyhow::Result<Vec<Item>> {
        let pk = pk.to_string();
        self.blocking(move |db| {
            let txn = db.begin_read()?;
            let table = txn.open_table(MEDITATIONS)?;
            let mut items = Vec::new();
            for entry in table.range((pk.as_str(), "")..)? {
                let (key, value) = entry?;
                let (entry_pk, sk) = key.value();
                if entry_pk != pk {
                    break;
                }
                items.push(Item {
                    key: StorageKey {
                        pk: entry_pk.to_string(),
                        sk: sk.to_string(),
                    },
                    payload: value.value().to_vec(),
                });
            }
            Ok(items)
        })
        .await
    }

    async fn delete_item(&self, key: &StorageKey) -> anyhow::Result<()> {
        let key = key.clone();
        self.blocking(move |db| {
            let txn = db.begin_write()?;
            {
                let mut table = txn.open_table(MEDITATIONS)?;
                table.remove((key.pk.as_str(), key.sk.as_str()))?;
            }
            txn.commit()?;
            Ok(())
        })
        .await
    }

    async fn transact_write(&self, ops: Vec<WriteOp>) -> anyhow::Result<()> {
        if ops.is_empty() {
            return Ok(());
        }
        self.blocking(move |db| {
            let txn = db.begin_write()?;

            let failed = {
                let table = txn.open_table(MEDITATIONS)?;
                let mut failed = None;
                for op in &ops {
                    let Some(condition) = op.condition() else {
                        continue;
                    };
                    let key = op.key();
                    let present = table.get((key.pk.as_str(), key.sk.as_str()))?.is_some();
                    if !condition.holds(present) {
                        failed = Some(ConditionFailed {
                            key: key.clone(),
                            condition,
                        });
                        break;
                    }
                }
                failed
            };
            if let Some(err) = failed {
                txn.abort()?;
                return Err(err.into());
            }

            {
                let mut table = txn.open_table(MEDITATIONS)?;
                for op in ops {
                    match op {
                        WriteOp::Put { item, .. } => {
                            table.insert(
                                (item.key.pk.as_str(), item.key.sk.as_str()),
                                item.payload.as_slice(),
                            )?;
                        }
                        WriteOp::Delete { key, .. } => {
                            table.remove((key.pk.as_str(), key.sk.as_str()))?;
                        }
                    }
                }
            }
            txn.commit()?;
            Ok(())
        })
        .await
    }

    fn supports_transactions(&self) -> bool {
        true
    }
}
