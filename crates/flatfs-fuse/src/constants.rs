//! Bridge configuration constants.
//!
//! Centralizes hardcoded values for easier configuration and documentation.

use std::time::Duration;

/// FUSE inode number of the mount root.
pub const FUSE_ROOT_INO: u64 = 1;

/// Filesystem name shown in the mount table.
pub const DEFAULT_FS_NAME: &str = "flatfs";

/// How long the kernel may cache attributes and entries.
pub const DEFAULT_ATTR_TTL: Duration = Duration::from_secs(1);

/// Block size reported in attributes.
pub const BLOCK_SIZE: u32 = 512;

/// Directory under the XDG config home holding `config.toml`.
pub const CONFIG_DIR_NAME: &str = "flatfs";

/// Config file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";
