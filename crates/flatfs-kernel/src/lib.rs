//! # flatfs-kernel
//!
//! Backing store and request handlers for a small user-space filesystem.
//!
//! The whole filesystem is one fixed-capacity table of file and directory
//! records behind a single lock:
//! - Records are looked up by their full relative path (a flat namespace)
//! - Every handler runs its lookup and mutation under that one lock
//! - Capacity and size limits fail loudly instead of truncating
//!
//! The table is seeded once from a JSON description (see [`bootstrap`]) and
//! served to the kernel by a bridge layer calling [`FsOps`].

pub mod bootstrap;
pub mod config;
pub mod vfs;

pub use bootstrap::{BootstrapError, EntrySpec, RecordSpec, bootstrap_store, build_records};
pub use config::{ConfigError, StoreLimits};
pub use vfs::{
    DirEntry, Directory, DirectoryEntry, FileAttr, FileType, FlatFs, FsError, FsOps, FsResult,
    Record, RecordKind, RecordStore, RecordTable, RegularFile, StatFs,
};
