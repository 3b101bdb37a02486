/// Errors from content store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The caller-supplied name is not a safe single path component.
    #[error("invalid item name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// An item with this name is already stored. Existing files are never
    /// overwritten.
    #[error("item already exists: {0}")]
    AlreadyExists(String),

    /// I/O error from the backing filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The metadata index lock was poisoned by a panicking writer.
    #[error("metadata index lock poisoned")]
    IndexPoisoned,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
