use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::item::{validate_name, DirectoryListingRecord, ItemId, StoredItemMetadata};
use crate::traits::ContentStore;

/// Directory under the root holding in-flight writes.
pub const STAGING_DIR: &str = ".staging";

/// Filesystem-backed content store.
///
/// Each item is one file directly under `root`, named by the caller. Writes
/// go to a temporary file in `root/.staging` first and are moved into place
/// with a no-clobber rename, so a name either holds a complete blob or
/// nothing at all. The metadata index lives in memory behind a `RwLock` and
/// is lost when the process exits; the directory itself is the source of
/// truth for [`ContentStore::list_all`].
pub struct DiskContentStore {
    root: PathBuf,
    staging: PathBuf,
    index: RwLock<HashMap<ItemId, StoredItemMetadata>>,
}

impl DiskContentStore {
    /// Open a store rooted at `root`, creating the directory (and its
    /// staging area) if needed. Writes left staged by an earlier process
    /// never completed and are removed.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        let staging = root.join(STAGING_DIR);
        fs::create_dir_all(&staging)?;
        let swept = sweep_staging(&staging)?;
        debug!(root = %root.display(), swept, "opened content store");
        Ok(Self {
            root,
            staging,
            index: RwLock::new(HashMap::new()),
        })
    }

    /// The store's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn stage(&self, data: &[u8]) -> io::Result<tempfile::NamedTempFile> {
        let mut staged = tempfile::Builder::new()
            .prefix("upload-")
            .tempfile_in(&self.staging)?;
        staged.write_all(data)?;
        staged.as_file().sync_all()?;
        Ok(staged)
    }
}

/// Remove abandoned staged files. Returns how many were removed.
fn sweep_staging(staging: &Path) -> io::Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(staging)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    if removed > 0 {
        warn!(staging = %staging.display(), removed, "removed abandoned staged writes");
    }
    Ok(removed)
}

impl ContentStore for DiskContentStore {
    fn save(&self, name: &str, content_type: &str, data: &[u8]) -> StoreResult<ItemId> {
        validate_name(name)?;
        let id = ItemId::new();
        let path = self.root.join(name);

        // Dropping the temp file on any early return removes it.
        let staged = self.stage(data)?;
        staged.persist_noclobber(&path).map_err(|e| {
            if e.error.kind() == io::ErrorKind::AlreadyExists {
                StoreError::AlreadyExists(name.to_string())
            } else {
                StoreError::Io(e.error)
            }
        })?;

        let metadata = StoredItemMetadata {
            id,
            content_type: content_type.to_string(),
            storage_path: path.clone(),
            name: name.to_string(),
        };
        match self.index.write() {
            Ok(mut index) => {
                index.insert(id, metadata);
            }
            Err(_) => {
                if let Err(e) = fs::remove_file(&path) {
                    warn!(path = %path.display(), error = %e, "failed to roll back stored file");
                }
                return Err(StoreError::IndexPoisoned);
            }
        }

        debug!(%id, name, size = data.len(), "saved item");
        Ok(id)
    }

    fn list_all(&self) -> StoreResult<Vec<DirectoryListingRecord>> {
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let meta = entry.metadata()?;
            if !meta.is_file() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                warn!(path = %entry.path().display(), "skipping non UTF-8 file name");
                continue;
            };
            let modified = meta.modified()?;
            // Not every platform records birth time.
            let created = meta.created().unwrap_or(modified);
            records.push(DirectoryListingRecord {
                name,
                created_at: DateTime::<Utc>::from(created),
                updated_at: DateTime::<Utc>::from(modified),
            });
        }
        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }

    fn metadata(&self, id: &ItemId) -> StoreResult<Option<StoredItemMetadata>> {
        let index = self.index.read().map_err(|_| StoreError::IndexPoisoned)?;
        Ok(index.get(id).cloned())
    }

    fn len(&self) -> StoreResult<usize> {
        let index = self.index.read().map_err(|_| StoreError::IndexPoisoned)?;
        Ok(index.len())
    }
}

impl std::fmt::Debug for DiskContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskContentStore")
            .field("root", &self.root)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, DiskContentStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskContentStore::open(dir.path().join("store")).unwrap();
        (dir, store)
    }

    fn staging_is_empty(store: &DiskContentStore) -> bool {
        fs::read_dir(store.root().join(STAGING_DIR))
            .unwrap()
            .next()
            .is_none()
    }

    #[test]
    fn reopen_sweeps_abandoned_staged_writes() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        {
            let store = DiskContentStore::open(&root).unwrap();
            store.save("kept.bin", ".bin", b"kept").unwrap();
        }
        let staging = root.join(STAGING_DIR);
        fs::write(staging.join("upload-crashed1"), b"partial").unwrap();
        fs::write(staging.join("upload-crashed2"), b"partial").unwrap();

        let store = DiskContentStore::open(&root).unwrap();
        assert!(staging_is_empty(&store));
        assert_eq!(fs::read(root.join("kept.bin")).unwrap(), b"kept");
        let names: Vec<_> = store.list_all().unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["kept.bin"]);
    }

    #[test]
    fn open_creates_root_and_staging() {
        let (_dir, store) = temp_store();
        assert!(store.root().is_dir());
        assert!(store.root().join(STAGING_DIR).is_dir());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn save_writes_file_and_indexes_it() {
        let (_dir, store) = temp_store();
        let id = store.save("a.bin", ".bin", b"abcdef").unwrap();

        let path = store.root().join("a.bin");
        assert_eq!(fs::read(&path).unwrap(), b"abcdef");

        let meta = store.metadata(&id).unwrap().unwrap();
        assert_eq!(meta.id, id);
        assert_eq!(meta.name, "a.bin");
        assert_eq!(meta.content_type, ".bin");
        assert_eq!(meta.storage_path, path);
        assert_eq!(store.len().unwrap(), 1);
        assert!(staging_is_empty(&store));
    }

    #[test]
    fn save_empty_payload() {
        let (_dir, store) = temp_store();
        store.save("empty.bin", "", b"").unwrap();
        assert_eq!(fs::read(store.root().join("empty.bin")).unwrap(), b"");
    }

    #[test]
    fn duplicate_name_is_rejected_and_original_kept() {
        let (_dir, store) = temp_store();
        store.save("a.bin", ".bin", b"first").unwrap();
        let err = store.save("a.bin", ".bin", b"second").unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(ref n) if n == "a.bin"));
        assert_eq!(fs::read(store.root().join("a.bin")).unwrap(), b"first");
        assert_eq!(store.len().unwrap(), 1);
        assert!(staging_is_empty(&store));
    }

    #[test]
    fn invalid_name_touches_nothing() {
        let (dir, store) = temp_store();
        let err = store.save("../escape.bin", ".bin", b"x").unwrap_err();
        assert!(matches!(err, StoreError::InvalidName { .. }));
        assert!(!dir.path().join("escape.bin").exists());
        assert!(store.list_all().unwrap().is_empty());
        assert!(staging_is_empty(&store));
    }

    #[test]
    fn unknown_id_has_no_metadata() {
        let (_dir, store) = temp_store();
        assert!(store.metadata(&ItemId::new()).unwrap().is_none());
    }

    #[test]
    fn list_empty_root() {
        let (_dir, store) = temp_store();
        assert!(store.list_all().unwrap().is_empty());
    }

    #[test]
    fn list_skips_directories() {
        let (_dir, store) = temp_store();
        fs::create_dir(store.root().join("nested")).unwrap();
        store.save("a.bin", ".bin", b"a").unwrap();
        let names: Vec<_> = store.list_all().unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["a.bin"]);
    }

    #[test]
    fn list_sees_files_not_written_through_the_store() {
        let (_dir, store) = temp_store();
        fs::write(store.root().join("external.txt"), b"hi").unwrap();
        let records = store.list_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "external.txt");
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn list_returns_sorted_names_with_timestamps() {
        let (_dir, store) = temp_store();
        store.save("b.bin", ".bin", b"b").unwrap();
        store.save("a.bin", ".bin", b"a").unwrap();

        let records = store.list_all().unwrap();
        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a.bin", "b.bin"]);
        for r in &records {
            assert!(r.created_at <= r.updated_at + chrono::Duration::seconds(1));
            assert!(r.updated_at <= Utc::now() + chrono::Duration::seconds(1));
        }
    }

    #[test]
    fn list_fails_when_root_is_gone() {
        let (dir, store) = temp_store();
        fs::remove_dir_all(dir.path().join("store")).unwrap();
        assert!(matches!(store.list_all().unwrap_err(), StoreError::Io(_)));
    }

    #[test]
    fn concurrent_saves_of_distinct_names() {
        let (_dir, store) = temp_store();
        let ids: Vec<ItemId> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let store = &store;
                    s.spawn(move || {
                        let name = format!("item-{i}.bin");
                        store.save(&name, ".bin", name.as_bytes()).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(store.len().unwrap(), 8);
        for id in &ids {
            let meta = store.metadata(id).unwrap().unwrap();
            assert_eq!(fs::read(&meta.storage_path).unwrap(), meta.name.as_bytes());
        }
        assert_eq!(store.list_all().unwrap().len(), 8);
    }

    #[test]
    fn concurrent_saves_of_same_name_admit_exactly_one() {
        let (_dir, store) = temp_store();
        let results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8u8)
                .map(|i| {
                    let store = &store;
                    s.spawn(move || store.save("same.bin", ".bin", &[i; 64]))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let content = fs::read(store.root().join("same.bin")).unwrap();
        assert_eq!(content.len(), 64);
        assert!(content.iter().all(|b| *b == content[0]));
    }
}
