use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a stored record (order, recipe, ingredient, purchase).
///
/// Wraps a UUID so record keys can't be mixed up with arbitrary strings.
/// Serializes as the bare hyphenated UUID, which is also the record's
/// primary key in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Creates a new random record ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a record ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Returns the store key for this ID.
    pub fn key(&self) -> String {
        self.0.to_string()
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RecordId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<RecordId> for Uuid {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

/// Error returned when a string is not a valid record ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRecordIdError(String);

impl std::fmt::Display for ParseRecordIdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid record id: {}", self.0)
    }
}

impl std::error::Error for ParseRecordIdError {}

impl std::str::FromStr for RecordId {
    type Err = ParseRecordIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| ParseRecordIdError(s.to_string()))
    }
}
