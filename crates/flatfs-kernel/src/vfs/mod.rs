//! Flat in-memory filesystem.
//!
//! Key components:
//!
//! - [`Record`] - A regular file or a directory
//! - [`RecordStore`] - Fixed-capacity record table behind one lock
//! - [`FsOps`] - Request handler trait the bridge layer calls
//! - [`FlatFs`] - Handlers over a shared [`RecordStore`]
//!
//! ## Design Decisions
//!
//! - **Flat namespace**: A record is found by its whole relative path, used
//!   as an opaque key. No component-wise walk happens; `a/b` is one key.
//! - **Coarse lock**: Every handler holds the store lock for its entire
//!   lookup-then-act sequence. Tables are small, so a scan is cheap.
//! - **Fixed limits**: Record count, content size, and entry counts are
//!   bounded by [`StoreLimits`](crate::config::StoreLimits); overflow is an
//!   error, never a truncation.

mod error;
mod handlers;
mod ops;
mod record;
mod store;
mod types;

pub use error::{FsError, FsResult};
pub use handlers::{FlatFs, ROOT_PATH, path_key};
pub use ops::FsOps;
pub use record::{
    Directory, DirectoryEntry, ROOT_INODE, Record, RecordKind, RegularFile, SENTINEL_INODE,
    is_reserved,
};
pub use store::{RecordStore, RecordTable};
pub use types::{DIR_PERM, DirEntry, FILE_PERM, FileAttr, FileType, StatFs};
