//! `KeyValueClient` implementations.
//!
//! Provides concrete backends for the [`KeyValueClient`](super::KeyValueClient)
//! trait: [`LocalKvClient`] for tests and ephemeral data, and [`RedbClient`]
//! (feature `redb`) for a durable local file.

mod local;
#[cfg(feature = "redb")]
mod redb_client;

pub use local::LocalKvClient;
#[cfg(feature = "redb")]
pub use redb_client::RedbClient;
