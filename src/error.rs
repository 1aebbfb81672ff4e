/// Errors from store construction.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A state key collides with one of the store's operation names.
    #[error("state key `{0}` is reserved for a store operation")]
    ReservedKey(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from persistence backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error from the underlying storage medium.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The stored document is valid JSON but not an object.
    #[error("persisted state is a {0}, expected a record")]
    NotARecord(&'static str),
}

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
