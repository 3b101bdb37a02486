//! Disk-backed content store for chunkvault.
//!
//! Turns a fully assembled upload into a durable file under the store root
//! and records it in an in-memory metadata index keyed by a generated id.
//!
//! # Two views of the same storage
//!
//! - The **directory listing** ([`ContentStore::list_all`]) is a live scan of
//!   the root directory. It is authoritative for what exists on disk.
//! - The **index** ([`ContentStore::metadata`]) maps generated ids to
//!   metadata for items saved through this process. It is never rebuilt from
//!   disk and is discarded on exit.
//!
//! # Design Rules
//!
//! 1. Item names are single path components; anything else is rejected
//!    before touching the filesystem.
//! 2. Stage, sync, then rename into place without clobbering.
//! 3. The index lock is never held across file I/O.
//! 4. Nothing is ever deleted or rewritten once stored.

pub mod disk;
pub mod error;
pub mod item;
pub mod traits;

pub use disk::{DiskContentStore, STAGING_DIR};
pub use error::{StoreError, StoreResult};
pub use item::{validate_name, DirectoryListingRecord, ItemId, StoredItemMetadata, MAX_NAME_LEN};
pub use traits::ContentStore;
