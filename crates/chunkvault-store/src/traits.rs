use crate::error::StoreResult;
use crate::item::{DirectoryListingRecord, ItemId, StoredItemMetadata};

/// Durable blob storage with an in-memory metadata index.
///
/// All implementations must satisfy these invariants:
/// - A stored name is written exactly once. Saving under a name that is
///   already present fails and leaves the existing item untouched.
/// - A failed save never leaves a partially written file visible under the
///   requested name.
/// - The index only grows; there is no delete or update.
/// - All I/O errors are propagated, never silently ignored.
///
/// Methods block on filesystem I/O. Async callers should run them on a
/// blocking worker (`tokio::task::spawn_blocking`).
pub trait ContentStore: Send + Sync {
    /// Persist `data` under `name` and return the freshly generated id.
    fn save(&self, name: &str, content_type: &str, data: &[u8]) -> StoreResult<ItemId>;

    /// Snapshot of what is on disk right now, sorted by name.
    ///
    /// Does not consult the index.
    fn list_all(&self) -> StoreResult<Vec<DirectoryListingRecord>>;

    /// Look up index metadata for a previously saved item.
    fn metadata(&self, id: &ItemId) -> StoreResult<Option<StoredItemMetadata>>;

    /// Number of items saved through this store instance.
    fn len(&self) -> StoreResult<usize>;

    /// Returns `true` if nothing has been saved through this instance.
    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}
