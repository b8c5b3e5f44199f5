//! Client seam to an external two-attribute key-value service.
//!
//! Defines [`KeyValueClient`], the only way the durable store reaches its
//! backing service. Every item is addressed by a [`StorageKey`] (`pk`, `sk`)
//! and carries an opaque payload. Implementations live in
//! [`datastores`](super::datastores).

use async_trait::async_trait;
use meditation_core::StorageKey;

/// One stored item: the two key attributes plus the serialized record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub key: StorageKey,
    pub payload: Vec<u8>,
}

/// Precondition attached to a write inside a transactional batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// The key must currently hold an item.
    Exists,
    /// The key must currently be empty.
    NotExists,
}

impl Condition {
    /// Whether the condition holds given the key's current presence.
    #[must_use]
    pub fn holds(self, present: bool) -> bool {
        match self {
            Self::Exists => present,
            Self::NotExists => !present,
        }
    }
}

/// A single mutation inside [`KeyValueClient::transact_write`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Put {
        item: Item,
        condition: Option<Condition>,
    },
    Delete {
        key: StorageKey,
        condition: Option<Condition>,
    },
}

impl WriteOp {
    /// The key this op touches.
    #[must_use]
    pub fn key(&self) -> &StorageKey {
        match self {
            Self::Put { item, .. } => &item.key,
            Self::Delete { key, .. } => key,
        }
    }

    /// The precondition, if any.
    #[must_use]
    pub fn condition(&self) -> Option<Condition> {
        match self {
            Self::Put { condition, .. } | Self::Delete { condition, .. } => *condition,
        }
    }
}

/// A transactional batch was rejected because a precondition did not hold.
/// No op in the batch was applied.
#[derive(Debug, thiserror::Error)]
#[error("condition {condition:?} failed for {key}")]
pub struct ConditionFailed {
    pub key: StorageKey,
    pub condition: Condition,
}

/// External persistent key-value service with a partition key and a sort key.
///
/// Used as `Arc<dyn KeyValueClient>`. Calls block the caller until the
/// service answers; no call retries on its own.
#[async_trait]
pub trait KeyValueClient: Send + Sync {
    /// Unconditional insert-or-overwrite at `item.key`.
    async fn put_item(&self, item: Item) -> anyhow::Result<()>;

    /// Every item whose partition key equals `pk`. Empty if none.
    async fn query_partition(&self, pk: &str) -> anyhow::Result<Vec<Item>>;

    /// Unconditional delete. Deleting an absent key is not an error.
    async fn delete_item(&self, key: &StorageKey) -> anyhow::Result<()>;

    /// Apply all ops or none.
    ///
    /// All conditions are evaluated against the state before the batch;
    /// a failing condition aborts the batch with [`ConditionFailed`].
    /// Clients without multi-item transactions return an error.
    async fn transact_write(&self, ops: Vec<WriteOp>) -> anyhow::Result<()>;

    /// Whether [`transact_write`](KeyValueClient::transact_write) is available.
    fn supports_transactions(&self) -> bool;
}
