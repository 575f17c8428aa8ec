//! Loading the initial record set from a JSON description.
//!
//! A description is an ordered array of records:
//!
//! ```json
//! [
//!   { "inode": 0, "type": "dir", "entries": [{ "name": "hello.txt", "inode": 2 }] },
//!   { "inode": 1, "type": "dir" },
//!   { "inode": 2, "type": "reg", "data": "hello.txt", "content": "hi\n" }
//! ]
//! ```
//!
//! For `reg` records `data` is the path key and the optional `content` seeds
//! the file. For `dir` records `entries` lists the children; an optional
//! `name` gives the directory a key, otherwise its first entry's name is
//! borrowed when that name is free.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::StoreLimits;
use crate::vfs::{
    Directory, DirectoryEntry, FsError, Record, RecordStore, RegularFile, is_reserved,
};

/// Errors raised while loading a description.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to read description: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse description: {0}")]
    Json(#[from] serde_json::Error),

    #[error("description has {count} records, capacity is {capacity}")]
    TooManyRecords { count: usize, capacity: usize },

    #[error("inode {0} appears more than once")]
    DuplicateInode(u64),

    #[error("path {0:?} appears more than once")]
    DuplicateKey(String),

    #[error("record {0} has an empty path")]
    EmptyKey(u64),

    #[error("record {inode}: path is {len} bytes, limit is {limit}")]
    KeyTooLong { inode: u64, len: usize, limit: usize },

    #[error("record {inode}: content is {len} bytes, limit is {limit}")]
    ContentTooLarge { inode: u64, len: usize, limit: usize },

    #[error("directory {inode} has {count} entries, limit is {limit}")]
    TooManyEntries { inode: u64, count: usize, limit: usize },

    #[error("directory {inode}: entry name {name:?} exceeds {limit} bytes")]
    EntryNameTooLong { inode: u64, name: String, limit: usize },

    #[error("store rejected record: {0}")]
    Store(#[from] FsError),
}

/// One record as written in a description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RecordSpec {
    #[serde(rename = "reg")]
    Regular {
        inode: u64,
        data: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },
    #[serde(rename = "dir")]
    Directory {
        inode: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default)]
        entries: Vec<EntrySpec>,
    },
}

impl RecordSpec {
    pub fn inode(&self) -> u64 {
        match self {
            RecordSpec::Regular { inode, .. } | RecordSpec::Directory { inode, .. } => *inode,
        }
    }
}

/// A directory entry as written in a description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySpec {
    pub name: String,
    pub inode: u64,
}

/// Parse a description from JSON text.
pub fn parse_description(json: &str) -> Result<Vec<RecordSpec>, BootstrapError> {
    Ok(serde_json::from_str(json)?)
}

/// Read and parse a description file.
pub fn load_description(path: &Path) -> Result<Vec<RecordSpec>, BootstrapError> {
    let json = std::fs::read_to_string(path)?;
    let specs = parse_description(&json)?;
    debug!(path = %path.display(), records = specs.len(), "loaded description");
    Ok(specs)
}

/// Validate a description and turn it into records, in description order.
pub fn build_records(
    specs: Vec<RecordSpec>,
    limits: &StoreLimits,
) -> Result<Vec<Record>, BootstrapError> {
    if specs.len() > limits.capacity {
        return Err(BootstrapError::TooManyRecords {
            count: specs.len(),
            capacity: limits.capacity,
        });
    }

    // Inodes, and every explicitly given key, must be unique.
    let mut inodes = HashSet::new();
    let mut keys: HashSet<String> = HashSet::new();
    for spec in &specs {
        if !inodes.insert(spec.inode()) {
            return Err(BootstrapError::DuplicateInode(spec.inode()));
        }
        let explicit = match spec {
            RecordSpec::Regular { data, .. } => Some(data),
            RecordSpec::Directory { name, .. } => name.as_ref(),
        };
        if let Some(key) = explicit {
            check_key(spec.inode(), key, limits)?;
            if !keys.insert(key.clone()) {
                return Err(BootstrapError::DuplicateKey(key.clone()));
            }
        }
    }

    let mut records = Vec::with_capacity(specs.len());
    for spec in specs {
        let record = match spec {
            RecordSpec::Regular {
                inode,
                data,
                content,
            } => {
                let content = content.unwrap_or_default().into_bytes();
                if content.len() > limits.max_file_size {
                    return Err(BootstrapError::ContentTooLarge {
                        inode,
                        len: content.len(),
                        limit: limits.max_file_size,
                    });
                }
                Record::from(RegularFile::new(inode, data).with_content(content))
            }
            RecordSpec::Directory {
                inode,
                name,
                entries,
            } => {
                if entries.len() > limits.max_entries {
                    return Err(BootstrapError::TooManyEntries {
                        inode,
                        count: entries.len(),
                        limit: limits.max_entries,
                    });
                }
                if let Some(entry) = entries.iter().find(|e| e.name.len() > limits.max_name_len) {
                    return Err(BootstrapError::EntryNameTooLong {
                        inode,
                        name: entry.name.clone(),
                        limit: limits.max_name_len,
                    });
                }
                let key = name.or_else(|| borrowed_key(inode, &entries, &mut keys));
                let mut dir = Directory::new(inode, key);
                dir.entries = entries
                    .into_iter()
                    .map(|e| DirectoryEntry::new(e.inode, e.name, inode))
                    .collect();
                Record::from(dir)
            }
        };
        debug!(inode = record.inode(), kind = %record.kind(), key = ?record.key(), "bootstrap record");
        records.push(record);
    }
    Ok(records)
}

/// Build a store from a description file.
pub fn bootstrap_store(path: &Path, limits: StoreLimits) -> Result<RecordStore, BootstrapError> {
    let records = build_records(load_description(path)?, &limits)?;
    let store = RecordStore::from_records(records, limits)?;
    info!(
        path = %path.display(),
        records = store.len(),
        capacity = limits.capacity,
        "record store ready"
    );
    Ok(store)
}

fn check_key(inode: u64, key: &str, limits: &StoreLimits) -> Result<(), BootstrapError> {
    if key.is_empty() {
        return Err(BootstrapError::EmptyKey(inode));
    }
    if key.len() > limits.max_path_len {
        return Err(BootstrapError::KeyTooLong {
            inode,
            len: key.len(),
            limit: limits.max_path_len,
        });
    }
    Ok(())
}

/// Key for an unnamed directory: its first entry's name, if that is free.
///
/// The root and the sentinel stay unkeyed.
fn borrowed_key(inode: u64, entries: &[EntrySpec], keys: &mut HashSet<String>) -> Option<String> {
    if is_reserved(inode) {
        return None;
    }
    let first = entries.first()?;
    if first.name.is_empty() || !keys.insert(first.name.clone()) {
        warn!(
            inode,
            name = %first.name,
            "directory has no name and its first entry name is taken; it will not be addressable"
        );
        return None;
    }
    Some(first.name.clone())
}
