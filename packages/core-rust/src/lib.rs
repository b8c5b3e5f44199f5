//! Meditation core — the record type and the physical key codec shared by
//! every storage backend.

pub mod key;
pub mod types;

pub use key::{sort_key, StorageKey, PARTITION_KEY_ATTR, PAYLOAD_ATTR, SORT_KEY_ATTR};
pub use types::Meditation;
