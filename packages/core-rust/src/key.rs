//! Physical key codec for two-attribute key-value backends.
//!
//! A record's hierarchical identity `(owner, name, id)` is flattened into a
//! partition key and a sort key:
//!
//! - `pk` = owner id
//! - `sk` = `"<name>/<id>"`
//!
//! Since `name` is part of `sk`, renaming a record moves it to a new key.
//! Names may themselves contain `/`, so the sort key is always split on the
//! LAST separator; ids are expected to be slash-free (generated UUIDs are).

use crate::types::Meditation;

/// Attribute name of the partition key.
pub const PARTITION_KEY_ATTR: &str = "pk";

/// Attribute name of the sort key.
pub const SORT_KEY_ATTR: &str = "sk";

/// Attribute name of the serialized record payload.
pub const PAYLOAD_ATTR: &str = "payload";

/// Separator between the display name and the id inside a sort key.
pub const SORT_KEY_SEPARATOR: char = '/';

/// Builds the sort key `"<name>/<id>"`.
#[must_use]
pub fn sort_key(name: &str, id: &str) -> String {
    let mut sk = String::with_capacity(name.len() + id.len() + 1);
    sk.push_str(name);
    sk.push(SORT_KEY_SEPARATOR);
    sk.push_str(id);
    sk
}

/// Physical address of a record: `(pk, sk)`.
///
/// Ordered by `pk` then `sk`, matching the range layout of sorted backends.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageKey {
    /// Partition key (owner id).
    pub pk: String,
    /// Sort key (`"<name>/<id>"`).
    pub sk: String,
}

impl StorageKey {
    /// Builds the key for the given owner, display name and id.
    #[must_use]
    pub fn new(owner_id: &str, name: &str, id: &str) -> Self {
        Self {
            pk: owner_id.to_string(),
            sk: sort_key(name, id),
        }
    }

    /// Builds the key a record is stored under.
    #[must_use]
    pub fn for_record(record: &Meditation) -> Self {
        Self::new(&record.owner_id, &record.name, &record.id)
    }

    /// Splits a sort key into `(name, id)` on the last separator.
    ///
    /// Returns `None` if the sort key has no separator.
    #[must_use]
    pub fn parse_sort_key(sk: &str) -> Option<(&str, &str)> {
        sk.rsplit_once(SORT_KEY_SEPARATOR)
    }

    /// The display name encoded in this key, if the sort key is well formed.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        Self::parse_sort_key(&self.sk).map(|(name, _)| name)
    }

    /// The id encoded in this key, if the sort key is well formed.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        Self::parse_sort_key(&self.sk).map(|(_, id)| id)
    }

    /// Whether both keys address the same record (same owner and id),
    /// regardless of the display name they were written under.
    #[must_use]
    pub fn same_record(&self, other: &StorageKey) -> bool {
        self.pk == other.pk && self.id().is_some() && self.id() == other.id()
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}, {}={}", PARTITION_KEY_ATTR, self.pk, SORT_KEY_ATTR, self.sk)
    }
}
