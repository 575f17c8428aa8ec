//! FUSE front end for flatfs.
//!
//! Wires the [`flatfs_kernel`] handlers to the kernel through `fuser`. The
//! bridge itself is behind the `fuse` feature; config loading, errno
//! mapping, the inode table and reply shaping build without it.

pub mod config;
pub mod constants;
pub mod errno;
pub mod inodes;
pub mod replies;

#[cfg(feature = "fuse")]
mod bridge;

#[cfg(feature = "fuse")]
pub use bridge::{FlatFsFuse, mount};
pub use config::{Config, MountConfig};
pub use errno::errno;
pub use inodes::InodeTable;
