//! Handler error types.

use std::io;
use thiserror::Error;

/// Error returned by the record store and the operation handlers.
///
/// Every variant is a value handed back to the bridge layer; a failed
/// operation never leaves a partial mutation behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FsError {
    /// No record matches the given path.
    #[error("not found: {0}")]
    NotFound(String),

    /// The store (or a directory's entry list) is at capacity.
    #[error("no space left: {0}")]
    NoSpace(String),

    /// A write or truncate would exceed the fixed content capacity.
    #[error("file too large: {requested} bytes exceeds limit of {limit}")]
    TooLarge { requested: u64, limit: u64 },

    /// A record with this key already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Path key or entry name exceeds its length limit.
    #[error("name too long: {len} bytes exceeds limit of {limit}")]
    NameTooLong { len: usize, limit: usize },
}

impl FsError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create a NoSpace error.
    pub fn no_space(what: impl Into<String>) -> Self {
        Self::NoSpace(what.into())
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    /// Create a TooLarge error.
    pub fn too_large(requested: u64, limit: u64) -> Self {
        Self::TooLarge { requested, limit }
    }
}

/// Convert FsError to std::io::Error for compatibility.
impl From<FsError> for io::Error {
    fn from(e: FsError) -> Self {
        match e {
            FsError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            FsError::NoSpace(msg) => io::Error::new(io::ErrorKind::StorageFull, msg),
            e @ FsError::TooLarge { .. } => io::Error::new(io::ErrorKind::FileTooLarge, e.to_string()),
            FsError::AlreadyExists(msg) => io::Error::new(io::ErrorKind::AlreadyExists, msg),
            e @ FsError::NameTooLong { .. } => {
                io::Error::new(io::ErrorKind::InvalidFilename, e.to_string())
            }
        }
    }
}

/// Handler result type.
pub type FsResult<T> = Result<T, FsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_kinds() {
        let e: io::Error = FsError::not_found("a").into();
        assert_eq!(e.kind(), io::ErrorKind::NotFound);

        let e: io::Error = FsError::too_large(5000, 4098).into();
        assert_eq!(e.kind(), io::ErrorKind::FileTooLarge);

        let e: io::Error = FsError::already_exists("a").into();
        assert_eq!(e.kind(), io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_display() {
        let e = FsError::too_large(5000, 4098);
        assert_eq!(e.to_string(), "file too large: 5000 bytes exceeds limit of 4098");
    }
}
