use async_trait::async_trait;
use meditation_core::Meditation;

use crate::storage::StoreResult;

/// Per-owner CRUD access to meditation records.
///
/// Every backend implements this contract identically. The backend is chosen
/// once at construction (see [`StoreFactory`](crate::storage::StoreFactory))
/// and used as `Arc<dyn MeditationStore>`.
///
/// Ordering of [`list`](MeditationStore::list) results is unspecified for
/// every backend; callers must not depend on it.
#[async_trait]
pub trait MeditationStore: Send + Sync {
    /// Insert a record. Upsert at the physical key level: re-saving a record
    /// under the same key overwrites it.
    ///
    /// Re-saving an existing id under a different name is backend-specific:
    /// the memory backend replaces the record, while key-addressed backends
    /// keep both entries. Use [`update`](MeditationStore::update) to rename.
    async fn save(&self, record: Meditation) -> StoreResult<()>;

    /// All records owned by `owner_id`, in no particular order.
    ///
    /// An unknown owner yields an empty list, never `NotFound`.
    async fn list(&self, owner_id: &str) -> StoreResult<Vec<Meditation>>;

    /// The record with `id` in the owner's partition.
    async fn get(&self, owner_id: &str, id: &str) -> StoreResult<Meditation>;

    /// Remove exactly the record with `id` from the owner's partition.
    async fn delete(&self, owner_id: &str, id: &str) -> StoreResult<()>;

    /// Replace the stored record with the same `(owner_id, id)`.
    ///
    /// A changed `name` relocates the record in key-addressed backends.
    async fn update(&self, record: Meditation) -> StoreResult<()>;

    /// Short backend identifier used in logs.
    fn backend_name(&self) -> &'static str;
}
