//! Fixed-capacity record table behind a single lock.
//!
//! [`RecordTable`] holds the ordered records and implements every scan and
//! mutation. [`RecordStore`] owns the table inside a `parking_lot::Mutex`
//! and only hands it out through closures, so a caller's whole
//! scan-then-mutate sequence runs under one acquisition.

use parking_lot::Mutex;
use std::collections::HashSet;

use super::error::{FsError, FsResult};
use super::record::{DirectoryEntry, ROOT_INODE, Record, SENTINEL_INODE};
use crate::config::StoreLimits;

/// Ordered, capacity-bounded sequence of live records.
///
/// Order is insertion order; removal compacts without reordering.
#[derive(Debug, Clone)]
pub struct RecordTable {
    records: Vec<Record>,
    limits: StoreLimits,
}

impl RecordTable {
    /// Create an empty table.
    pub fn new(limits: StoreLimits) -> Self {
        Self {
            records: Vec::with_capacity(limits.capacity),
            limits,
        }
    }

    pub fn limits(&self) -> &StoreLimits {
        &self.limits
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.limits.capacity
    }

    pub fn free_slots(&self) -> usize {
        self.limits.capacity.saturating_sub(self.records.len())
    }

    pub fn is_full(&self) -> bool {
        self.free_slots() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// Index of the first record whose key equals `key`.
    pub fn position_by_path(&self, key: &str) -> Option<usize> {
        self.records.iter().position(|r| r.key() == Some(key))
    }

    /// First record whose key equals `key`.
    pub fn find_by_path(&self, key: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.key() == Some(key))
    }

    pub fn find_by_path_mut(&mut self, key: &str) -> Option<&mut Record> {
        self.records.iter_mut().find(|r| r.key() == Some(key))
    }

    pub fn find_by_inode(&self, inode: u64) -> Option<&Record> {
        self.records.iter().find(|r| r.inode() == inode)
    }

    fn find_by_inode_mut(&mut self, inode: u64) -> Option<&mut Record> {
        self.records.iter_mut().find(|r| r.inode() == inode)
    }

    /// Inode for the next new record: the live count, bumped past the
    /// reserved inodes, any value a live record already holds, and any value
    /// a directory entry still points at.
    pub fn next_inode(&self) -> u64 {
        let entries = self
            .records
            .iter()
            .filter_map(Record::as_directory)
            .flat_map(|dir| dir.entries.iter().map(|e| e.inode));
        let taken: HashSet<u64> = self.records.iter().map(Record::inode).chain(entries).collect();
        let mut inode = (self.records.len() as u64).max(SENTINEL_INODE + 1);
        while taken.contains(&inode) {
            inode += 1;
        }
        inode
    }

    /// Append a record.
    ///
    /// Fails without touching the table when it is full, or when the
    /// record's inode or key is already held by a live record.
    pub fn insert(&mut self, record: Record) -> FsResult<()> {
        if self.is_full() {
            return Err(FsError::no_space(format!(
                "record table holds {} records",
                self.limits.capacity
            )));
        }
        if self.find_by_inode(record.inode()).is_some() {
            return Err(FsError::already_exists(format!("inode {}", record.inode())));
        }
        if let Some(key) = record.key() {
            if self.find_by_path(key).is_some() {
                return Err(FsError::already_exists(key));
            }
        }
        self.records.push(record);
        Ok(())
    }

    /// Remove the record at `index`, shifting later records left, and prune
    /// every directory entry that points at it.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn remove_at(&mut self, index: usize) -> Record {
        let removed = self.records.remove(index);
        self.prune_entries(removed.inode());
        removed
    }

    /// Drop the first entry referencing `child` from every directory.
    ///
    /// Returns how many directories lost an entry.
    pub fn prune_entries(&mut self, child: u64) -> usize {
        self.records
            .iter_mut()
            .filter_map(Record::as_directory_mut)
            .map(|dir| dir.remove_entry_for(child))
            .filter(|removed| *removed)
            .count()
    }

    /// Keyed, non-reserved records in store order.
    pub fn top_level(&self) -> impl Iterator<Item = &Record> {
        self.records
            .iter()
            .filter(|r| !r.is_reserved() && r.key().is_some())
    }

    /// Keys of every record the root listing shows, in store order.
    pub fn list_top_level(&self) -> Vec<String> {
        self.top_level()
            .filter_map(|r| r.key().map(str::to_owned))
            .collect()
    }

    /// Inode of the directory a new `key` belongs under.
    ///
    /// The part of `key` before its last `/` names the parent directory
    /// record; with no such record (or no `/`) the parent is the root.
    pub fn resolve_parent(&self, key: &str) -> u64 {
        key.rsplit_once('/')
            .and_then(|(parent, _)| self.find_by_path(parent))
            .and_then(Record::as_directory)
            .map(|dir| dir.inode)
            .unwrap_or(ROOT_INODE)
    }

    /// Record `entry` in its parent directory, if that directory is stored.
    ///
    /// A parent with no directory record (a bare root) is not an error.
    pub fn link_child(&mut self, entry: DirectoryEntry) -> FsResult<()> {
        let max_entries = self.limits.max_entries;
        match self
            .find_by_inode_mut(entry.parent_inode)
            .and_then(Record::as_directory_mut)
        {
            Some(dir) => dir.push_entry(entry, max_entries),
            None => Ok(()),
        }
    }
}

/// The record table plus the one lock that guards it.
///
/// Shared between handler threads behind an `Arc`.
#[derive(Debug)]
pub struct RecordStore {
    table: Mutex<RecordTable>,
}

impl RecordStore {
    /// Create an empty store.
    pub fn new(limits: StoreLimits) -> Self {
        Self {
            table: Mutex::new(RecordTable::new(limits)),
        }
    }

    /// Create a store holding `records`, in order.
    pub fn from_records(
        records: impl IntoIterator<Item = Record>,
        limits: StoreLimits,
    ) -> FsResult<Self> {
        let mut table = RecordTable::new(limits);
        for record in records {
            table.insert(record)?;
        }
        Ok(Self {
            table: Mutex::new(table),
        })
    }

    /// Run `f` with shared access to the table.
    pub fn read<R>(&self, f: impl FnOnce(&RecordTable) -> R) -> R {
        let table = self.table.lock();
        f(&*table)
    }

    /// Run `f` with exclusive access to the table.
    pub fn write<R>(&self, f: impl FnOnce(&mut RecordTable) -> R) -> R {
        let mut table = self.table.lock();
        f(&mut *table)
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.read(RecordTable::len)
    }

    pub fn is_empty(&self) -> bool {
        self.read(RecordTable::is_empty)
    }

    pub fn limits(&self) -> StoreLimits {
        self.read(|t| *t.limits())
    }

    /// Copy of every live record, in store order.
    pub fn snapshot(&self) -> Vec<Record> {
        self.read(|t| t.iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::record::{Directory, RegularFile};

    fn file(inode: u64, key: &str) -> Record {
        RegularFile::new(inode, key).into()
    }

    fn dir(inode: u64, key: Option<&str>, children: &[(u64, &str)]) -> Record {
        let mut d = Directory::new(inode, key.map(str::to_owned));
        for (child, name) in children {
            d.entries.push(DirectoryEntry::new(*child, *name, inode));
        }
        d.into()
    }

    fn sample() -> RecordTable {
        let mut t = RecordTable::new(StoreLimits::default().with_capacity(8));
        t.insert(dir(ROOT_INODE, None, &[(2, "a"), (3, "docs")])).unwrap();
        t.insert(dir(SENTINEL_INODE, None, &[])).unwrap();
        t.insert(file(2, "a")).unwrap();
        t.insert(dir(3, Some("docs"), &[(4, "b")])).unwrap();
        t.insert(file(4, "docs/b")).unwrap();
        t
    }

    #[test]
    fn test_find_by_path() {
        let t = sample();
        assert_eq!(t.find_by_path("a").map(Record::inode), Some(2));
        assert_eq!(t.find_by_path("docs").map(Record::inode), Some(3));
        assert_eq!(t.position_by_path("docs/b"), Some(4));
        assert!(t.find_by_path("missing").is_none());
        // unkeyed records are never matched, not even by the empty key
        assert!(t.find_by_path("").is_none());
    }

    #[test]
    fn test_insert_rejects_when_full() {
        let mut t = RecordTable::new(StoreLimits::default().with_capacity(2));
        t.insert(file(0, "x")).unwrap();
        t.insert(file(1, "y")).unwrap();
        assert!(t.is_full());

        let err = t.insert(file(2, "z")).unwrap_err();
        assert!(matches!(err, FsError::NoSpace(_)));
        assert_eq!(t.len(), 2);
        assert!(t.find_by_path("z").is_none());
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let mut t = sample();
        assert!(matches!(t.insert(file(2, "other")), Err(FsError::AlreadyExists(_))));
        assert!(matches!(t.insert(file(9, "a")), Err(FsError::AlreadyExists(_))));
        assert_eq!(t.len(), 5);
    }

    #[test]
    fn test_remove_at_compacts_and_prunes() {
        let mut t = sample();
        let removed = t.remove_at(2);
        assert_eq!(removed.inode(), 2);
        assert_eq!(t.len(), 4);

        let order: Vec<u64> = t.iter().map(Record::inode).collect();
        assert_eq!(order, vec![0, 1, 3, 4]);

        let root = t.find_by_inode(ROOT_INODE).and_then(Record::as_directory).unwrap();
        assert_eq!(root.entries.len(), 1);
        assert_eq!(root.entries[0].name, "docs");
    }

    #[test]
    fn test_prune_entries_counts_directories() {
        let mut t = sample();
        t.write_entry_for_test(3, DirectoryEntry::new(2, "a-link", 3));
        assert_eq!(t.prune_entries(2), 2);
        assert_eq!(t.prune_entries(2), 0);
    }

    #[test]
    fn test_list_top_level_skips_reserved() {
        let t = sample();
        assert_eq!(t.list_top_level(), vec!["a", "docs", "docs/b"]);
    }

    #[test]
    fn test_next_inode_starts_at_count() {
        let mut t = RecordTable::new(StoreLimits::default());
        // reserved inodes are never handed out
        assert_eq!(t.next_inode(), 2);
        t.insert(file(0, "x")).unwrap();
        t.insert(file(1, "y")).unwrap();
        assert_eq!(t.next_inode(), 2);

        // count is 3 but inode 3 is live, so the next free value is used
        t.insert(file(3, "z")).unwrap();
        assert_eq!(t.next_inode(), 4);
    }

    #[test]
    fn test_next_inode_skips_dangling_entries() {
        let mut t = RecordTable::new(StoreLimits::default());
        t.insert(dir(ROOT_INODE, None, &[(2, "a"), (3, "gone")])).unwrap();
        t.insert(file(2, "a")).unwrap();
        // inode 3 has no record but the root still names it
        assert_eq!(t.next_inode(), 4);
    }

    #[test]
    fn test_next_inode_after_compaction() {
        let mut t = sample();
        t.remove_at(2); // inode 2 freed, count now 4, inode 4 live
        assert_eq!(t.next_inode(), 5);
        t.remove_at(t.position_by_path("docs/b").unwrap());
        assert_eq!(t.next_inode(), 4);
    }

    #[test]
    fn test_resolve_parent() {
        let t = sample();
        assert_eq!(t.resolve_parent("new"), ROOT_INODE);
        assert_eq!(t.resolve_parent("docs/new"), 3);
        assert_eq!(t.resolve_parent("nowhere/new"), ROOT_INODE);
        // a regular file is never a parent
        assert_eq!(t.resolve_parent("a/new"), ROOT_INODE);
    }

    #[test]
    fn test_link_child_respects_entry_limit() {
        let mut t = RecordTable::new(StoreLimits::default().with_max_entries(1));
        t.insert(dir(ROOT_INODE, None, &[])).unwrap();
        t.link_child(DirectoryEntry::new(5, "x", ROOT_INODE)).unwrap();
        assert!(matches!(
            t.link_child(DirectoryEntry::new(6, "y", ROOT_INODE)),
            Err(FsError::NoSpace(_))
        ));

        // no record for the parent: nothing to link into
        assert!(t.link_child(DirectoryEntry::new(7, "z", 42)).is_ok());
    }

    #[test]
    fn test_store_from_records_and_snapshot() {
        let store = RecordStore::from_records(
            vec![file(2, "a"), file(3, "b")],
            StoreLimits::default(),
        )
        .unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.snapshot()[1].key(), Some("b"));

        let dup = RecordStore::from_records(vec![file(2, "a"), file(2, "b")], StoreLimits::default());
        assert!(dup.is_err());
    }

    impl RecordTable {
        fn write_entry_for_test(&mut self, dir_inode: u64, entry: DirectoryEntry) {
            self.find_by_inode_mut(dir_inode)
                .and_then(Record::as_directory_mut)
                .unwrap()
                .entries
                .push(entry);
        }
    }
}
