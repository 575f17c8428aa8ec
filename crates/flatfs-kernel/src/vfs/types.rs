//! Attribute and listing types returned by the handlers.
//!
//! These are plain values; the bridge layer converts them into whatever
//! its kernel interface expects.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Permission bits reported for regular files.
pub const FILE_PERM: u32 = 0o777;

/// Permission bits reported for directories (including the root).
pub const DIR_PERM: u32 = 0o755;

/// File type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

impl FileType {
    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }
}

/// File attributes (metadata).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttr {
    /// Record inode, `None` for the synthesized root.
    pub inode: Option<u64>,
    /// Size in bytes.
    pub size: u64,
    /// File type.
    pub kind: FileType,
    /// Unix permissions.
    pub perm: u32,
    /// Number of hard links.
    pub nlink: u32,
    /// Last modification time.
    pub mtime: SystemTime,
}

impl FileAttr {
    /// Attributes for a regular file.
    pub fn file(inode: u64, size: u64, mtime: SystemTime) -> Self {
        Self {
            inode: Some(inode),
            size,
            kind: FileType::File,
            perm: FILE_PERM,
            nlink: 1,
            mtime,
        }
    }

    /// Attributes for a directory.
    pub fn directory(inode: Option<u64>, mtime: SystemTime) -> Self {
        Self {
            inode,
            size: 0,
            kind: FileType::Directory,
            perm: DIR_PERM,
            nlink: 2, // . and ..
            mtime,
        }
    }

    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

/// Entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// Entry name (the record's path key).
    pub name: String,
    /// Record inode.
    pub inode: u64,
    /// Entry type.
    pub kind: FileType,
}

impl DirEntry {
    /// Create a new listing entry.
    pub fn new(name: impl Into<String>, inode: u64, kind: FileType) -> Self {
        Self {
            name: name.into(),
            inode,
            kind,
        }
    }
}

/// Filesystem statistics, expressed in records rather than blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatFs {
    /// Record slots in the table.
    pub files: u64,
    /// Free record slots.
    pub ffree: u64,
    /// Block size (one file's content capacity).
    pub bsize: u32,
    /// Maximum entry name length.
    pub namelen: u32,
}
