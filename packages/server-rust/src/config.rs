//! Storage configuration types.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Which [`MeditationStore`](crate::MeditationStore) backend to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BackendKind {
    /// Per-owner sequences in process memory.
    Memory,
    /// Key-addressed store over the process-local key-value client.
    MemoryKv,
    /// Key-addressed store over a redb database file.
    Redb,
}

impl BackendKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::MemoryKv => "memory-kv",
            Self::Redb => "redb",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognised backend name.
#[derive(Debug, thiserror::Error)]
#[error("unknown storage backend: {0} (expected memory, memory-kv or redb)")]
pub struct UnknownBackend(pub String);

impl FromStr for BackendKind {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(Self::Memory),
            "memory-kv" => Ok(Self::MemoryKv),
            "redb" => Ok(Self::Redb),
            other => Err(UnknownBackend(other.to_string())),
        }
    }
}

/// Top-level storage configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Backend selected at construction.
    pub backend: BackendKind,
    /// Database file for [`BackendKind::Redb`].
    pub redb_path: PathBuf,
    /// Relocate renamed records with one transactional batch when the
    /// key-value client supports it.
    pub transactional_rename: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            redb_path: PathBuf::from("meditations.redb"),
            transactional_rename: true,
        }
    }
}
