//! Storage layer for meditation records.
//!
//! One contract, [`MeditationStore`](crate::MeditationStore), with two
//! backends:
//!
//! - [`MemoryMeditationStore`]: per-owner sequences in process memory
//! - [`KvMeditationStore`]: a durable two-attribute key-value service reached
//!   through [`KeyValueClient`], with records addressed by
//!   `(owner_id, "<name>/<id>")`
//!
//! [`StoreFactory`] picks the backend once from a [`StoreConfig`](crate::config::StoreConfig).

pub mod datastores;
pub mod error;
pub mod factory;
pub mod impls;
pub mod kv_client;

pub use datastores::*;
pub use error::*;
pub use factory::*;
pub use impls::*;
pub use kv_client::*;
