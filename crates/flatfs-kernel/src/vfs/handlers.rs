//! Request handlers over a shared [`RecordStore`].
//!
//! Each handler strips the leading `/`, takes the store lock once and does
//! its whole lookup-then-act sequence inside it.

use std::sync::Arc;
use std::time::SystemTime;

use tracing::{debug, warn};

use super::error::{FsError, FsResult};
use super::ops::FsOps;
use super::record::{Directory, DirectoryEntry, Record, RegularFile};
use super::store::{RecordStore, RecordTable};
use super::types::{DirEntry, FileAttr, StatFs};

/// The root marker as the bridge passes it.
pub const ROOT_PATH: &str = "/";

/// Lookup key for `path`, or `None` for the root.
pub fn path_key(path: &str) -> Option<&str> {
    let key = path.strip_prefix('/').unwrap_or(path);
    if key.is_empty() { None } else { Some(key) }
}

/// Last component of a key, used as the entry name in the parent directory.
fn leaf_name(key: &str) -> &str {
    key.rsplit_once('/').map(|(_, leaf)| leaf).unwrap_or(key)
}

/// Handler set for one store.
#[derive(Debug, Clone)]
pub struct FlatFs {
    store: Arc<RecordStore>,
}

impl FlatFs {
    /// Create handlers over `store`.
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    /// Key for a record about to be created.
    fn new_key(path: &str) -> FsResult<&str> {
        path_key(path).ok_or_else(|| FsError::already_exists(ROOT_PATH))
    }

    /// Checks shared by create and mkdir, run before anything is mutated.
    fn check_new(table: &RecordTable, key: &str) -> FsResult<()> {
        let limit = table.limits().max_path_len;
        if key.len() > limit {
            return Err(FsError::NameTooLong { len: key.len(), limit });
        }
        if table.find_by_path(key).is_some() {
            return Err(FsError::already_exists(key));
        }
        if table.is_full() {
            return Err(FsError::no_space(format!(
                "record table holds {} records",
                table.capacity()
            )));
        }
        Ok(())
    }

    /// Add `key`'s entry to its parent directory if there is room.
    fn link_into_parent(table: &mut RecordTable, inode: u64, key: &str, parent: u64) {
        let name = leaf_name(key);
        if name.len() > table.limits().max_name_len {
            warn!(key, parent, "entry name too long, not linked into parent");
            return;
        }
        if let Err(e) = table.link_child(DirectoryEntry::new(inode, name, parent)) {
            warn!(key, parent, error = %e, "not linked into parent");
        }
    }
}

impl FsOps for FlatFs {
    fn getattr(&self, path: &str) -> FsResult<FileAttr> {
        let Some(key) = path_key(path) else {
            return Ok(FileAttr::directory(None, SystemTime::UNIX_EPOCH));
        };
        self.store.read(|table| {
            table
                .find_by_path(key)
                .map(Record::attr)
                .ok_or_else(|| FsError::not_found(path))
        })
    }

    fn readdir(&self, path: &str) -> FsResult<Vec<DirEntry>> {
        if path_key(path).is_some() {
            return Err(FsError::not_found(path));
        }
        let entries: Vec<DirEntry> = self
            .store
            .read(|table| table.top_level().filter_map(Record::dir_entry).collect());
        debug!(count = entries.len(), "readdir /");
        Ok(entries)
    }

    fn open(&self, path: &str) -> FsResult<()> {
        debug!(path, "open");
        Ok(())
    }

    fn read(&self, path: &str, offset: u64, size: u32) -> FsResult<Vec<u8>> {
        let key = path_key(path).ok_or_else(|| FsError::not_found(path))?;
        let data = self.store.read(|table| {
            table
                .find_by_path(key)
                .and_then(Record::as_regular)
                .map(|file| file.read_at(offset, size))
                .ok_or_else(|| FsError::not_found(path))
        })?;
        debug!(path, offset, size, returned = data.len(), "read");
        Ok(data)
    }

    fn write(&self, path: &str, offset: u64, data: &[u8]) -> FsResult<u32> {
        let key = path_key(path).ok_or_else(|| FsError::not_found(path))?;
        let written = self.store.write(|table| {
            let max_size = table.limits().max_file_size;
            let file = table
                .find_by_path_mut(key)
                .and_then(Record::as_regular_mut)
                .ok_or_else(|| FsError::not_found(path))?;
            file.write_at(offset, data, max_size)
        })?;
        debug!(path, offset, written, "write");
        Ok(written)
    }

    fn create(&self, path: &str, mode: u32) -> FsResult<FileAttr> {
        let key = Self::new_key(path)?;
        let attr = self.store.write(|table| {
            Self::check_new(table, key)?;
            let inode = table.next_inode();
            let parent = table.resolve_parent(key);
            let record = Record::from(RegularFile::new(inode, key));
            let attr = record.attr();
            table.insert(record)?;
            Self::link_into_parent(table, inode, key, parent);
            Ok::<_, FsError>(attr)
        })?;
        debug!(path, mode, inode = attr.inode, "create");
        Ok(attr)
    }

    fn mkdir(&self, path: &str, mode: u32) -> FsResult<FileAttr> {
        let key = Self::new_key(path)?;
        let attr = self.store.write(|table| {
            Self::check_new(table, key)?;
            let limit = table.limits().max_name_len;
            if key.len() > limit {
                return Err(FsError::NameTooLong { len: key.len(), limit });
            }
            let inode = table.next_inode();
            let parent = table.resolve_parent(key);

            // the seed entry names the directory itself and records its parent
            let mut dir = Directory::new(inode, Some(key.to_owned()));
            dir.entries.push(DirectoryEntry::new(inode, key, parent));

            let record = Record::from(dir);
            let attr = record.attr();
            table.insert(record)?;
            Self::link_into_parent(table, inode, key, parent);
            Ok::<_, FsError>(attr)
        })?;
        debug!(path, mode, inode = attr.inode, "mkdir");
        Ok(attr)
    }

    fn unlink(&self, path: &str) -> FsResult<()> {
        let key = path_key(path).ok_or_else(|| FsError::not_found(path))?;
        let removed = self.store.write(|table| {
            let index = table
                .position_by_path(key)
                .ok_or_else(|| FsError::not_found(path))?;
            Ok::<_, FsError>(table.remove_at(index))
        })?;
        debug!(path, inode = removed.inode(), kind = %removed.kind(), "unlink");
        Ok(())
    }

    fn truncate(&self, path: &str, size: u64) -> FsResult<()> {
        let key = path_key(path).ok_or_else(|| FsError::not_found(path))?;
        self.store.write(|table| {
            let max_size = table.limits().max_file_size;
            table
                .find_by_path_mut(key)
                .and_then(Record::as_regular_mut)
                .ok_or_else(|| FsError::not_found(path))?
                .truncate(size, max_size)
        })?;
        debug!(path, size, "truncate");
        Ok(())
    }

    fn statfs(&self) -> FsResult<StatFs> {
        Ok(self.store.read(|table| {
            let limits = table.limits();
            StatFs {
                files: table.capacity() as u64,
                ffree: table.free_slots() as u64,
                bsize: u32::try_from(limits.max_file_size).unwrap_or(u32::MAX),
                namelen: u32::try_from(limits.max_name_len).unwrap_or(u32::MAX),
            }
        }))
    }
}
