// Ordered byte-key storage engine: an in-memory sorted table made durable
// by a write-ahead log, with periodic value-log compaction.
mod kv;
mod wal;

pub use kv::Store;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Maximum `offset` accepted by [`Store::list`].
pub const MAX_LIST_OFFSET: i64 = 10_000;

/// Server-side cap (and default) for [`Store::list`] page sizes.
pub const MAX_LIST_LIMIT: i64 = 100;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("key not found")]
    NotFound,
    #[error("offset too large (max value is {MAX_LIST_OFFSET})")]
    OffsetTooLarge,
    #[error("corrupt write-ahead log record")]
    Corrupt,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// True when the error is the distinguished missing-key case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }
}
