//! Store limits.
//!
//! Every limit defaults to the reference table size, so an empty `[store]`
//! section (or no config file at all) reproduces the stock 128-record table.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of record slots.
pub const DEFAULT_CAPACITY: usize = 128;
/// Default content capacity of a regular file, in bytes.
pub const DEFAULT_MAX_FILE_SIZE: usize = 4098;
/// Default maximum path key length, in bytes.
pub const DEFAULT_MAX_PATH_LEN: usize = 4098;
/// Default number of entries a directory may hold.
pub const DEFAULT_MAX_ENTRIES: usize = 16;
/// Default maximum directory entry name length, in bytes.
pub const DEFAULT_MAX_NAME_LEN: usize = 256;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Fixed limits of a record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreLimits {
    /// Maximum number of live records.
    pub capacity: usize,
    /// Maximum content length of a regular file.
    pub max_file_size: usize,
    /// Maximum length of a record's path key.
    pub max_path_len: usize,
    /// Maximum number of entries per directory.
    pub max_entries: usize,
    /// Maximum length of a directory entry name.
    pub max_name_len: usize,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_path_len: DEFAULT_MAX_PATH_LEN,
            max_entries: DEFAULT_MAX_ENTRIES,
            max_name_len: DEFAULT_MAX_NAME_LEN,
        }
    }
}

impl StoreLimits {
    /// Limits with a different record capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Limits with a different content capacity.
    pub fn with_max_file_size(mut self, max_file_size: usize) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    /// Limits with a different per-directory entry count.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Reject limits no store can operate under.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::Invalid("capacity must be at least 1".into()));
        }
        // mkdir seeds every new directory with one entry
        if self.max_entries == 0 {
            return Err(ConfigError::Invalid("max_entries must be at least 1".into()));
        }
        // reads are sized in u32, so a whole file must fit in one
        if u32::try_from(self.max_file_size).is_err() {
            return Err(ConfigError::Invalid(format!(
                "max_file_size must be at most {}",
                u32::MAX
            )));
        }
        if self.max_path_len == 0 || self.max_name_len == 0 {
            return Err(ConfigError::Invalid(
                "max_path_len and max_name_len must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
