//! End-to-end scenarios driving the handlers the way the bridge does.
//!
//! # Tiers
//!
//! - **Tier 0:** Bootstrap from a description file, then single requests
//! - **Tier 1:** Capacity and consistency properties across request sequences
//! - **Tier 2:** Concurrent handlers sharing one store

use std::io::Write;
use std::sync::{Arc, Barrier};
use std::thread;

use flatfs_kernel::vfs::{ROOT_INODE, is_reserved};
use flatfs_kernel::{
    FlatFs, FsError, FsOps, Record, RecordStore, StoreLimits, bootstrap_store,
};

// ============================================================================
// Shared test setup
// ============================================================================

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("flatfs_kernel=debug")
        .with_test_writer()
        .try_init();
}

/// Write `json` to a temp file and bootstrap a handler set from it.
fn fs_from_json(json: &str, limits: StoreLimits) -> FlatFs {
    init_tracing();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    let store = bootstrap_store(file.path(), limits).unwrap();
    FlatFs::new(Arc::new(store))
}

const TREE: &str = r#"[
    {"inode": 0, "type": "dir", "entries": [
        {"name": "hello.txt", "inode": 2},
        {"name": "docs", "inode": 3}
    ]},
    {"inode": 1, "type": "dir"},
    {"inode": 2, "type": "reg", "data": "hello.txt"},
    {"inode": 3, "type": "dir", "name": "docs", "entries": [{"name": "readme", "inode": 4}]},
    {"inode": 4, "type": "reg", "data": "docs/readme", "content": "read me"},
    {"inode": 5, "type": "dir", "name": "mirror", "entries": [{"name": "docs", "inode": 3}]}
]"#;

fn entries_of(fs: &FlatFs, inode: u64) -> Vec<u64> {
    fs.store().read(|t| {
        t.find_by_inode(inode)
            .and_then(Record::as_directory)
            .map(|d| d.entries.iter().map(|e| e.inode).collect())
            .unwrap_or_default()
    })
}

// ============================================================================
// Tier 0: bootstrap + single requests
// ============================================================================

#[test]
fn hello_scenario() {
    let fs = fs_from_json(
        r#"[{"inode": 2, "type": "reg", "data": "hello.txt"}]"#,
        StoreLimits::default(),
    );

    let attr = fs.getattr("/hello.txt").unwrap();
    assert!(attr.is_file());
    assert_eq!(attr.size, 0);

    assert_eq!(fs.write("/hello.txt", 0, b"hi").unwrap(), 2);
    assert_eq!(fs.read("/hello.txt", 0, 10).unwrap(), b"hi");
}

#[test]
fn full_store_create_scenario() {
    let fs = fs_from_json(
        r#"[
            {"inode": 0, "type": "dir"},
            {"inode": 1, "type": "dir"},
            {"inode": 2, "type": "reg", "data": "only"}
        ]"#,
        StoreLimits::default().with_capacity(3),
    );
    let before = fs.store().snapshot();

    assert!(matches!(fs.create("/new", 0o644), Err(FsError::NoSpace(_))));
    assert!(matches!(fs.getattr("/new"), Err(FsError::NotFound(_))));
    assert_eq!(fs.store().snapshot(), before);
}

#[test]
fn seeded_content_is_readable() {
    let fs = fs_from_json(TREE, StoreLimits::default());
    assert_eq!(fs.getattr("/docs/readme").unwrap().size, 7);
    assert_eq!(fs.read("/docs/readme", 5, 100).unwrap(), b"me");
    assert!(fs.read("/docs/readme", 7, 100).unwrap().is_empty());
    assert!(fs.getattr("/docs").unwrap().is_dir());
}

// ============================================================================
// Tier 1: properties across sequences
// ============================================================================

#[test]
fn write_read_round_trip_at_offsets() {
    let fs = fs_from_json(TREE, StoreLimits::default());
    fs.create("/data.bin", 0o644).unwrap();

    let payload: Vec<u8> = (0..=255u8).cycle().take(3000).collect();
    for (i, chunk) in payload.chunks(700).enumerate() {
        let written = fs.write("/data.bin", (i * 700) as u64, chunk).unwrap();
        assert_eq!(written as usize, chunk.len());
    }

    let len = payload.len() as u64;
    for &(offset, size) in &[(0u64, 10u32), (699, 2), (2990, 100), (3000, 5), (1234, 4000)] {
        let got = fs.read("/data.bin", offset, size).unwrap();
        let expected = if offset >= len {
            &[][..]
        } else {
            let end = (offset + u64::from(size)).min(len) as usize;
            &payload[offset as usize..end]
        };
        assert_eq!(got, expected, "offset {offset} size {size}");
    }
}

#[test]
fn oversized_write_leaves_content() {
    let fs = fs_from_json(TREE, StoreLimits::default());
    let max = fs.store().limits().max_file_size as u64;

    assert!(matches!(
        fs.write("/docs/readme", max - 1, b"xy"),
        Err(FsError::TooLarge { .. })
    ));
    assert_eq!(fs.read_all("/docs/readme").unwrap(), b"read me");

    // ending exactly at the limit is allowed
    assert_eq!(fs.write("/docs/readme", max - 1, b"x").unwrap(), 1);
    assert_eq!(fs.getattr("/docs/readme").unwrap().size, max);
}

#[test]
fn capacity_exhaustion_blocks_create_and_mkdir() {
    let fs = fs_from_json(TREE, StoreLimits::default().with_capacity(8));
    fs.create("/a", 0o644).unwrap();
    fs.mkdir("/b", 0o755).unwrap();
    assert_eq!(fs.store().len(), 8);

    let before = fs.store().snapshot();
    assert!(matches!(fs.create("/c", 0o644), Err(FsError::NoSpace(_))));
    assert!(matches!(fs.mkdir("/d", 0o755), Err(FsError::NoSpace(_))));
    assert_eq!(fs.store().snapshot(), before);

    // freeing a slot makes room again
    fs.unlink("/a").unwrap();
    fs.create("/c", 0o644).unwrap();
}

#[test]
fn unlink_directory_prunes_every_reference() {
    let fs = fs_from_json(TREE, StoreLimits::default());
    assert_eq!(entries_of(&fs, ROOT_INODE), vec![2, 3]);
    assert_eq!(entries_of(&fs, 5), vec![3]);

    fs.unlink("/docs").unwrap();

    assert!(matches!(fs.getattr("/docs"), Err(FsError::NotFound(_))));
    assert_eq!(entries_of(&fs, ROOT_INODE), vec![2]);
    assert!(entries_of(&fs, 5).is_empty());
    // flat namespace: the child record is independent of its directory
    assert!(fs.exists("/docs/readme"));
}

#[test]
fn unlink_missing_changes_nothing() {
    let fs = fs_from_json(TREE, StoreLimits::default());
    let before = fs.store().snapshot();
    assert!(matches!(fs.unlink("/ghost"), Err(FsError::NotFound(_))));
    assert_eq!(fs.store().snapshot(), before);
}

#[test]
fn root_listing_matches_store_order() {
    let fs = fs_from_json(TREE, StoreLimits::default());
    fs.create("/late.txt", 0o644).unwrap();

    let names: Vec<String> = fs.readdir("/").unwrap().into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["hello.txt", "docs", "docs/readme", "mirror", "late.txt"]);

    let (count, reserved) = fs.store().read(|t| {
        (t.len(), t.iter().filter(|r| is_reserved(r.inode())).count())
    });
    assert_eq!(names.len(), count - reserved);
}

#[test]
fn inode_reuse_after_unlink_stays_unique() {
    let fs = fs_from_json(TREE, StoreLimits::default());
    let a = fs.create("/a", 0o644).unwrap().inode.unwrap();
    fs.unlink("/hello.txt").unwrap();
    let b = fs.create("/b", 0o644).unwrap().inode.unwrap();
    assert_ne!(a, b);

    let inodes: Vec<u64> = fs.store().read(|t| t.iter().map(Record::inode).collect());
    let mut unique = inodes.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), inodes.len());
}

#[test]
fn dangling_entry_inode_is_not_handed_out() {
    let fs = fs_from_json(
        r#"[
            {"inode": 0, "type": "dir", "entries": [
                {"name": "hello.txt", "inode": 2},
                {"name": "docs", "inode": 3}
            ]},
            {"inode": 2, "type": "reg", "data": "hello.txt"}
        ]"#,
        StoreLimits::default(),
    );

    let inode = fs.create("/new.bin", 0o644).unwrap().inode.unwrap();
    assert_ne!(inode, 3);
    assert_eq!(entries_of(&fs, ROOT_INODE), vec![2, 3, inode]);

    // unlinking the new file prunes its own entry, not the stale one
    fs.unlink("/new.bin").unwrap();
    assert_eq!(entries_of(&fs, ROOT_INODE), vec![2, 3]);
}

// ============================================================================
// Tier 2: concurrency
// ============================================================================

#[test]
fn concurrent_creates_fill_exactly_to_capacity() {
    let store = Arc::new(RecordStore::new(StoreLimits::default().with_capacity(32)));
    let fs = FlatFs::new(store);
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let fs = fs.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                (0..10)
                    .filter(|i| fs.create(&format!("/t{t}-{i}"), 0o644).is_ok())
                    .count()
            })
        })
        .collect();

    let created: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(created, 32);
    assert_eq!(fs.store().len(), 32);
    assert_eq!(fs.readdir("/").unwrap().len(), 32);
}

#[test]
fn concurrent_writers_never_tear() {
    let fs = fs_from_json(TREE, StoreLimits::default());
    fs.create("/shared", 0o644).unwrap();

    let handles: Vec<_> = [b'a', b'b', b'c', b'd']
        .into_iter()
        .map(|byte| {
            let fs = fs.clone();
            thread::spawn(move || {
                let block = vec![byte; 1024];
                for _ in 0..50 {
                    fs.write("/shared", 0, &block).unwrap();
                }
            })
        })
        .collect();

    let reader = {
        let fs = fs.clone();
        thread::spawn(move || {
            for _ in 0..200 {
                let data = fs.read("/shared", 0, 1024).unwrap();
                if let Some(first) = data.first() {
                    assert!(data.iter().all(|b| b == first), "torn read");
                }
            }
        })
    };

    for h in handles {
        h.join().unwrap();
    }
    reader.join().unwrap();
    assert_eq!(fs.getattr("/shared").unwrap().size, 1024);
}

#[test]
fn concurrent_create_same_path_has_one_winner() {
    let fs = FlatFs::new(Arc::new(RecordStore::new(StoreLimits::default())));
    let barrier = Arc::new(Barrier::new(6));

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let fs = fs.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                fs.create("/contended", 0o644)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, FsError::AlreadyExists(_))));
    assert_eq!(fs.store().len(), 1);
}
