use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named audio resource owned by a single user.
///
/// `id` is assigned by whoever creates the record and never changes.
/// `owner_id` partitions the data space: a record is only visible through
/// calls addressed at its owner. `name` is mutable and, in key-addressed
/// backends, part of the physical key (see [`StorageKey`](crate::StorageKey)).
///
/// Serializes with the field names used by the public service
/// (`_id`, `_userId`, `audioUrl`, `name`), both as JSON and as the
/// `MsgPack` payload stored next to the key attributes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Meditation {
    /// Opaque unique identifier, immutable after creation.
    #[serde(rename = "_id")]
    pub id: String,
    /// Owner partition this record belongs to.
    #[serde(rename = "_userId")]
    pub owner_id: String,
    /// Display name. Key-bearing in the durable backend.
    pub name: String,
    /// Location of the audio payload.
    #[serde(rename = "audioUrl")]
    pub audio_url: String,
}

impl Meditation {
    /// Creates a record with a freshly generated UUID v4 id.
    #[must_use]
    pub fn new(
        owner_id: impl Into<String>,
        name: impl Into<String>,
        audio_url: impl Into<String>,
    ) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), owner_id, name, audio_url)
    }

    /// Creates a record with an explicit, caller-chosen id.
    #[must_use]
    pub fn with_id(
        id: impl Into<String>,
        owner_id: impl Into<String>,
        name: impl Into<String>,
        audio_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            name: name.into(),
            audio_url: audio_url.into(),
        }
    }

    /// Returns a copy of this record carrying a new display name.
    #[must_use]
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Returns a copy of this record pointing at a new audio URL.
    #[must_use]
    pub fn with_audio_url(&self, audio_url: impl Into<String>) -> Self {
        Self {
            audio_url: audio_url.into(),
            ..self.clone()
        }
    }

    /// Whether `other` addresses the same logical record (same owner and id).
    #[must_use]
    pub fn is_same_record(&self, other: &Meditation) -> bool {
        self.owner_id == other.owner_id && self.id == other.id
    }
}
