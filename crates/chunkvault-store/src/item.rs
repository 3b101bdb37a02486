use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Longest accepted item name, in bytes (common filesystem limit).
pub const MAX_NAME_LEN: usize = 255;

/// Unique identifier for a stored item (random UUID v4).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(uuid::Uuid);

impl ItemId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Create from an existing UUID.
    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }

    /// Short representation (first 8 characters of the UUID).
    pub fn short_id(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({})", self.short_id())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index entry describing one persisted blob.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredItemMetadata {
    pub id: ItemId,
    /// Format hint supplied by the uploader. Never checked against the bytes.
    pub content_type: String,
    /// Final location of the blob on disk.
    pub storage_path: PathBuf,
    pub name: String,
}

/// One entry of the on-disk listing, produced by scanning the store root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryListingRecord {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Check that `name` can be used as a single file name under the store root.
///
/// Names starting with `.` are reserved for the store's own bookkeeping
/// (the staging directory lives at `.staging`).
pub fn validate_name(name: &str) -> StoreResult<()> {
    let reject = |reason| {
        Err(StoreError::InvalidName {
            name: name.to_string(),
            reason,
        })
    };
    if name.is_empty() {
        return reject("name is empty");
    }
    if name.len() > MAX_NAME_LEN {
        return reject("name is too long");
    }
    if name.starts_with('.') {
        return reject("name must not start with '.'");
    }
    if name.contains(['/', '\\']) {
        return reject("name must not contain path separators");
    }
    if name.contains('\0') {
        return reject("name must not contain NUL");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_ids_are_unique() {
        let a = ItemId::new();
        let b = ItemId::new();
        assert_ne!(a, b);
        assert_eq!(a.short_id().len(), 8);
        assert_eq!(a.to_string().len(), 36);
    }

    #[test]
    fn item_id_debug_uses_short_form() {
        let id = ItemId::from_uuid(uuid::Uuid::nil());
        assert_eq!(format!("{id:?}"), "ItemId(00000000)");
    }

    #[test]
    fn accepts_plain_names() {
        for name in ["a.bin", "photo.jpeg", "no_extension", "spaces are fine.png", "x..y"] {
            validate_name(name).unwrap();
        }
    }

    #[test]
    fn rejects_traversal_and_separators() {
        for name in ["", ".", "..", "../etc/passwd", "a/b", "a\\b", ".hidden", "nul\0byte"] {
            let err = validate_name(name).unwrap_err();
            assert!(matches!(err, StoreError::InvalidName { .. }), "{name:?}");
        }
    }

    #[test]
    fn rejects_overlong_names() {
        let name = "x".repeat(MAX_NAME_LEN + 1);
        assert!(validate_name(&name).is_err());
        validate_name(&"x".repeat(MAX_NAME_LEN)).unwrap();
    }

    #[test]
    fn listing_record_serializes_timestamps_as_rfc3339() {
        let ts = DateTime::parse_from_rfc3339("2024-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let record = DirectoryListingRecord {
            name: "a.bin".into(),
            created_at: ts,
            updated_at: ts,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["name"], "a.bin");
        assert_eq!(json["created_at"], "2024-01-02T03:04:05Z");
    }
}
