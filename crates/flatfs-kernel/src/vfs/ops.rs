//! Operation handler trait.
//!
//! One method per request kind the bridge layer forwards. Paths are the
//! bridge's absolute paths (`/hello.txt`); `/` is the root.

use super::FsResult;
use super::types::{DirEntry, FileAttr, StatFs};

/// Filesystem request handlers.
///
/// Handlers are synchronous and may be called from any number of threads
/// at once.
pub trait FsOps: Send + Sync {
    // ========================================================================
    // Reading
    // ========================================================================

    /// Get file attributes.
    fn getattr(&self, path: &str) -> FsResult<FileAttr>;

    /// List a directory. Only the root can be listed.
    ///
    /// `.` and `..` are not included; the bridge supplies them.
    fn readdir(&self, path: &str) -> FsResult<Vec<DirEntry>>;

    /// Accept an open request. No handle state is kept.
    fn open(&self, path: &str) -> FsResult<()>;

    /// Read up to `size` bytes starting at `offset`.
    ///
    /// Returns fewer bytes (possibly none) at end of file.
    fn read(&self, path: &str, offset: u64, size: u32) -> FsResult<Vec<u8>>;

    // ========================================================================
    // Writing
    // ========================================================================

    /// Write `data` at `offset`, returning the number of bytes written.
    fn write(&self, path: &str, offset: u64, data: &[u8]) -> FsResult<u32>;

    /// Create an empty regular file.
    fn create(&self, path: &str, mode: u32) -> FsResult<FileAttr>;

    /// Create a directory.
    fn mkdir(&self, path: &str, mode: u32) -> FsResult<FileAttr>;

    /// Remove a file or directory.
    fn unlink(&self, path: &str) -> FsResult<()>;

    /// Set a regular file's length.
    fn truncate(&self, path: &str, size: u64) -> FsResult<()>;

    // ========================================================================
    // Metadata
    // ========================================================================

    /// Record-slot usage.
    fn statfs(&self) -> FsResult<StatFs>;

    // ========================================================================
    // Convenience methods (default implementations)
    // ========================================================================

    /// Check if a path exists.
    fn exists(&self, path: &str) -> bool {
        self.getattr(path).is_ok()
    }

    /// Read entire file contents.
    fn read_all(&self, path: &str) -> FsResult<Vec<u8>> {
        let attr = self.getattr(path)?;
        self.read(path, 0, u32::try_from(attr.size).unwrap_or(u32::MAX))
    }
}
