//! FUSE inode number to path mapping.
//!
//! The kernel addresses everything by inode number while the handlers take
//! paths, so the bridge keeps both directions here. Numbers are handed out
//! on first sight of a path and never reused; they are unrelated to record
//! inodes.

use std::collections::HashMap;

use flatfs_kernel::vfs::ROOT_PATH;

use crate::constants::FUSE_ROOT_INO;

/// Bidirectional inode number ↔ absolute path table.
#[derive(Debug)]
pub struct InodeTable {
    paths: HashMap<u64, String>,
    inos: HashMap<String, u64>,
    next: u64,
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InodeTable {
    /// A table holding only the root.
    pub fn new() -> Self {
        let mut table = Self {
            paths: HashMap::new(),
            inos: HashMap::new(),
            next: FUSE_ROOT_INO + 1,
        };
        table.paths.insert(FUSE_ROOT_INO, ROOT_PATH.to_string());
        table.inos.insert(ROOT_PATH.to_string(), FUSE_ROOT_INO);
        table
    }

    pub fn path(&self, ino: u64) -> Option<&str> {
        self.paths.get(&ino).map(String::as_str)
    }

    pub fn ino(&self, path: &str) -> Option<u64> {
        self.inos.get(path).copied()
    }

    /// Number for `path`, assigning a fresh one if it has none yet.
    pub fn intern(&mut self, path: &str) -> u64 {
        if let Some(ino) = self.ino(path) {
            return ino;
        }
        let ino = self.next;
        self.next += 1;
        self.paths.insert(ino, path.to_string());
        self.inos.insert(path.to_string(), ino);
        ino
    }

    /// Absolute path of `name` inside the directory numbered `parent`.
    pub fn child_path(&self, parent: u64, name: &str) -> Option<String> {
        let parent = self.path(parent)?;
        Some(if parent == ROOT_PATH {
            format!("/{name}")
        } else {
            format!("{parent}/{name}")
        })
    }

    /// Drop `path`, returning its number. The root is never dropped.
    pub fn forget(&mut self, path: &str) -> Option<u64> {
        if path == ROOT_PATH {
            return None;
        }
        let ino = self.inos.remove(path)?;
        self.paths.remove(&ino);
        Some(ino)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
