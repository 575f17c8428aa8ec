//! Reply contents computed from handler results.
//!
//! Kept free of `fuser` types so they build and test without the `fuse`
//! feature.

use flatfs_kernel::{DirEntry, FileType, StatFs};

use crate::constants::{BLOCK_SIZE, FUSE_ROOT_INO};
use crate::inodes::InodeTable;

/// One directory entry as the kernel sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub ino: u64,
    pub kind: FileType,
    pub name: String,
    /// Offset the kernel passes back to resume after this entry.
    pub next_offset: i64,
}

/// Entries of directory `ino` from `offset` on: `.` and `..` first, then
/// every listed record whose key is a valid entry name.
pub fn listing_entries(
    ino: u64,
    listing: Vec<DirEntry>,
    offset: i64,
    inodes: &mut InodeTable,
) -> Vec<ListingEntry> {
    let mut entries = vec![
        (ino, FileType::Directory, ".".to_string()),
        (FUSE_ROOT_INO, FileType::Directory, "..".to_string()),
    ];
    for entry in listing {
        // keys like "docs/readme" stay reachable by path but are not
        // valid entry names
        if entry.name.contains('/') {
            continue;
        }
        let child = inodes.intern(&format!("/{}", entry.name));
        entries.push((child, entry.kind, entry.name));
    }

    let skip = usize::try_from(offset).unwrap_or(0);
    entries
        .into_iter()
        .enumerate()
        .skip(skip)
        .map(|(i, (ino, kind, name))| ListingEntry {
            ino,
            kind,
            name,
            next_offset: (i + 1) as i64,
        })
        .collect()
}

/// Block totals for a statfs reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockCounts {
    pub blocks: u64,
    pub bfree: u64,
    pub bsize: u32,
    pub frsize: u32,
}

/// Express record slots as [`BLOCK_SIZE`] blocks: every slot holds up to
/// `bsize` bytes of content.
pub fn block_counts(stat: &StatFs) -> BlockCounts {
    let per_slot = u64::from(stat.bsize).div_ceil(u64::from(BLOCK_SIZE));
    BlockCounts {
        blocks: stat.files.saturating_mul(per_slot),
        bfree: stat.ffree.saturating_mul(per_slot),
        bsize: BLOCK_SIZE,
        frsize: BLOCK_SIZE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing() -> Vec<DirEntry> {
        vec![
            DirEntry::new("hello.txt", 2, FileType::File),
            DirEntry::new("docs", 3, FileType::Directory),
            DirEntry::new("docs/readme", 4, FileType::File),
            DirEntry::new("late.txt", 6, FileType::File),
        ]
    }

    fn names(entries: &[ListingEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_dot_entries_come_first() {
        let mut inodes = InodeTable::new();
        let entries = listing_entries(FUSE_ROOT_INO, listing(), 0, &mut inodes);

        assert_eq!(entries[0].name, ".");
        assert_eq!(entries[0].ino, FUSE_ROOT_INO);
        assert_eq!(entries[1].name, "..");
        assert_eq!(entries[1].ino, FUSE_ROOT_INO);
        assert!(entries[..2].iter().all(|e| e.kind == FileType::Directory));
    }

    #[test]
    fn test_slash_keys_are_left_out() {
        let mut inodes = InodeTable::new();
        let entries = listing_entries(FUSE_ROOT_INO, listing(), 0, &mut inodes);

        assert_eq!(names(&entries), vec![".", "..", "hello.txt", "docs", "late.txt"]);
        assert_eq!(inodes.ino("/docs/readme"), None);

        // listed names are interned so later getattr calls resolve
        let docs = entries.iter().find(|e| e.name == "docs").unwrap();
        assert_eq!(inodes.path(docs.ino), Some("/docs"));
        assert_eq!(docs.kind, FileType::Directory);
    }

    #[test]
    fn test_offsets_resume_where_the_last_reply_stopped() {
        let mut inodes = InodeTable::new();
        let all = listing_entries(FUSE_ROOT_INO, listing(), 0, &mut inodes);
        let offsets: Vec<i64> = all.iter().map(|e| e.next_offset).collect();
        assert_eq!(offsets, vec![1, 2, 3, 4, 5]);

        // a reply that stopped after "hello.txt" resumes at "docs"
        let rest = listing_entries(FUSE_ROOT_INO, listing(), all[2].next_offset, &mut inodes);
        assert_eq!(names(&rest), vec!["docs", "late.txt"]);
        assert_eq!(rest, all[3..].to_vec());

        assert!(listing_entries(FUSE_ROOT_INO, listing(), 5, &mut inodes).is_empty());
        assert_eq!(listing_entries(FUSE_ROOT_INO, listing(), -1, &mut inodes), all);
    }

    #[test]
    fn test_block_counts_use_block_size() {
        let stat = StatFs {
            files: 128,
            ffree: 125,
            bsize: 4098,
            namelen: 256,
        };
        let counts = block_counts(&stat);
        assert_eq!(counts.bsize, 512);
        assert_eq!(counts.frsize, 512);
        // 4098 bytes round up to 9 blocks per slot
        assert_eq!(counts.blocks, 128 * 9);
        assert_eq!(counts.bfree, 125 * 9);
    }
}
