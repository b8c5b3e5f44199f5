//! Typed errors returned by every [`MeditationStore`](crate::MeditationStore).

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by store operations.
///
/// The store never retries and never recovers silently: every failure
/// reaches the caller as one of these variants.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The owner has no records (`id` is `None`), or no record with `id`
    /// exists in the owner's partition.
    #[error("{}", not_found_message(.owner_id, .id.as_deref()))]
    NotFound {
        owner_id: String,
        id: Option<String>,
    },
    /// The backend rejected or could not complete a put, delete or
    /// transactional batch.
    #[error("write failed during {op}: {source}")]
    WriteFailure {
        op: &'static str,
        #[source]
        source: anyhow::Error,
    },
    /// The backend query failed or a stored payload could not be decoded.
    #[error("read failed during {op}: {source}")]
    ReadFailure {
        op: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

fn not_found_message(owner_id: &str, id: Option<&str>) -> String {
    match id {
        None => format!("no user with id {owner_id} was found"),
        Some(id) => format!("no meditation with id {id} was found"),
    }
}

impl StoreError {
    /// Owner partition is empty or absent.
    pub(crate) fn owner_not_found(owner_id: &str) -> Self {
        Self::NotFound {
            owner_id: owner_id.to_string(),
            id: None,
        }
    }

    /// Partition exists but holds no record with `id`.
    pub(crate) fn record_not_found(owner_id: &str, id: &str) -> Self {
        Self::NotFound {
            owner_id: owner_id.to_string(),
            id: Some(id.to_string()),
        }
    }

    pub(crate) fn write(op: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Self::WriteFailure {
            op,
            source: source.into(),
        }
    }

    pub(crate) fn read(op: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Self::ReadFailure {
            op,
            source: source.into(),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub fn is_write_failure(&self) -> bool {
        matches!(self, Self::WriteFailure { .. })
    }
}
