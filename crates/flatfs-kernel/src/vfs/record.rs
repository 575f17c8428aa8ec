//! Records held by the store.
//!
//! A record is either a regular file or a directory. The two shapes share
//! nothing but an inode and a modification time, so they are kept as
//! separate variants of one enum.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use strum::{Display, EnumString};

use super::error::{FsError, FsResult};
use super::types::{DirEntry, FileAttr, FileType};

/// Inode of the root directory record.
pub const ROOT_INODE: u64 = 0;

/// Inode reserved next to the root; never listed.
pub const SENTINEL_INODE: u64 = 1;

/// Returns true for the two inodes hidden from the root listing.
pub fn is_reserved(inode: u64) -> bool {
    inode == ROOT_INODE || inode == SENTINEL_INODE
}

/// Record kind, spelled the way bootstrap descriptions spell it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum RecordKind {
    #[serde(rename = "reg")]
    #[strum(serialize = "reg")]
    Regular,
    #[serde(rename = "dir")]
    #[strum(serialize = "dir")]
    Directory,
}

impl From<RecordKind> for FileType {
    fn from(kind: RecordKind) -> Self {
        match kind {
            RecordKind::Regular => FileType::File,
            RecordKind::Directory => FileType::Directory,
        }
    }
}

/// A regular file: its key doubles as its display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegularFile {
    pub inode: u64,
    pub path_key: String,
    pub content: Vec<u8>,
    pub mtime: SystemTime,
}

impl RegularFile {
    /// An empty file.
    pub fn new(inode: u64, path_key: impl Into<String>) -> Self {
        Self {
            inode,
            path_key: path_key.into(),
            content: Vec::new(),
            mtime: SystemTime::now(),
        }
    }

    /// A file with initial content.
    pub fn with_content(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.content = content.into();
        self
    }

    /// Current content length, reported as the file size.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Copy up to `size` bytes starting at `offset`.
    ///
    /// An offset at or past the end yields nothing.
    pub fn read_at(&self, offset: u64, size: u32) -> Vec<u8> {
        let len = self.content.len() as u64;
        if offset >= len {
            return Vec::new();
        }
        let start = offset as usize;
        let end = (offset + u64::from(size)).min(len) as usize;
        self.content[start..end].to_vec()
    }

    /// Copy `data` in at `offset`, growing the file when the write ends
    /// past the current length. A gap between the old end and `offset` is
    /// zero-filled.
    ///
    /// `max_size` bounds the content; an overflowing write changes nothing,
    /// and so does an empty one.
    pub fn write_at(&mut self, offset: u64, data: &[u8], max_size: usize) -> FsResult<u32> {
        if data.is_empty() {
            return Ok(0);
        }
        let end = offset
            .checked_add(data.len() as u64)
            .ok_or_else(|| FsError::too_large(u64::MAX, max_size as u64))?;
        if end > max_size as u64 {
            return Err(FsError::too_large(end, max_size as u64));
        }
        let (start, end) = (offset as usize, end as usize);
        if end > self.content.len() {
            self.content.resize(end, 0);
        }
        self.content[start..end].copy_from_slice(data);
        self.mtime = SystemTime::now();
        Ok(data.len() as u32)
    }

    /// Shrink or zero-extend to `size`.
    pub fn truncate(&mut self, size: u64, max_size: usize) -> FsResult<()> {
        if size > max_size as u64 {
            return Err(FsError::too_large(size, max_size as u64));
        }
        self.content.resize(size as usize, 0);
        self.mtime = SystemTime::now();
        Ok(())
    }
}

/// One child reference inside a directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Child inode.
    pub inode: u64,
    /// Child name.
    pub name: String,
    /// Inode of the directory the child belongs to.
    pub parent_inode: u64,
}

impl DirectoryEntry {
    pub fn new(inode: u64, name: impl Into<String>, parent_inode: u64) -> Self {
        Self {
            inode,
            name: name.into(),
            parent_inode,
        }
    }
}

/// A directory and its bounded entry list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    pub inode: u64,
    /// Lookup key; `None` leaves the directory reachable only by inode.
    pub path_key: Option<String>,
    pub entries: Vec<DirectoryEntry>,
    pub mtime: SystemTime,
}

impl Directory {
    pub fn new(inode: u64, path_key: Option<String>) -> Self {
        Self {
            inode,
            path_key,
            entries: Vec::new(),
            mtime: SystemTime::now(),
        }
    }

    /// Append an entry, failing once `max_entries` are held.
    pub fn push_entry(&mut self, entry: DirectoryEntry, max_entries: usize) -> FsResult<()> {
        if self.entries.len() >= max_entries {
            return Err(FsError::no_space(format!(
                "directory {} holds {} entries",
                self.inode, max_entries
            )));
        }
        self.entries.push(entry);
        self.mtime = SystemTime::now();
        Ok(())
    }

    /// Remove the first entry pointing at `child`, keeping the rest in order.
    ///
    /// Returns true if an entry was removed.
    pub fn remove_entry_for(&mut self, child: u64) -> bool {
        match self.entries.iter().position(|e| e.inode == child) {
            Some(idx) => {
                self.entries.remove(idx);
                self.mtime = SystemTime::now();
                true
            }
            None => false,
        }
    }
}

/// A stored file or directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Regular(RegularFile),
    Directory(Directory),
}

impl Record {
    pub fn inode(&self) -> u64 {
        match self {
            Record::Regular(f) => f.inode,
            Record::Directory(d) => d.inode,
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Regular(_) => RecordKind::Regular,
            Record::Directory(_) => RecordKind::Directory,
        }
    }

    /// Lookup key, if the record has one.
    pub fn key(&self) -> Option<&str> {
        match self {
            Record::Regular(f) => Some(f.path_key.as_str()),
            Record::Directory(d) => d.path_key.as_deref(),
        }
    }

    pub fn mtime(&self) -> SystemTime {
        match self {
            Record::Regular(f) => f.mtime,
            Record::Directory(d) => d.mtime,
        }
    }

    pub fn is_reserved(&self) -> bool {
        is_reserved(self.inode())
    }

    pub fn as_regular(&self) -> Option<&RegularFile> {
        match self {
            Record::Regular(f) => Some(f),
            Record::Directory(_) => None,
        }
    }

    pub fn as_regular_mut(&mut self) -> Option<&mut RegularFile> {
        match self {
            Record::Regular(f) => Some(f),
            Record::Directory(_) => None,
        }
    }

    pub fn as_directory(&self) -> Option<&Directory> {
        match self {
            Record::Directory(d) => Some(d),
            Record::Regular(_) => None,
        }
    }

    pub fn as_directory_mut(&mut self) -> Option<&mut Directory> {
        match self {
            Record::Directory(d) => Some(d),
            Record::Regular(_) => None,
        }
    }

    /// Attributes as reported by `getattr`.
    pub fn attr(&self) -> FileAttr {
        match self {
            Record::Regular(f) => FileAttr::file(f.inode, f.len() as u64, f.mtime),
            Record::Directory(d) => FileAttr::directory(Some(d.inode), d.mtime),
        }
    }

    /// Listing entry, for keyed records.
    pub fn dir_entry(&self) -> Option<DirEntry> {
        self.key()
            .map(|key| DirEntry::new(key, self.inode(), self.kind().into()))
    }
}

impl From<RegularFile> for Record {
    fn from(f: RegularFile) -> Self {
        Record::Regular(f)
    }
}

impl From<Directory> for Record {
    fn from(d: Directory) -> Self {
        Record::Directory(d)
    }
}
