//! `MeditationStore` implementations.
//!
//! Provides the two concrete backends of the
//! [`MeditationStore`](crate::MeditationStore) trait.

mod kv_store;
mod memory_store;

pub use kv_store::{DurableStoreConfig, KvMeditationStore};
pub use memory_store::MemoryMeditationStore;
