//! flatfs mount binary.
//!
//! Usage:
//!   flatfs /mnt/flat fs.json
//!   flatfs --config flatfs.toml /mnt/flat fs.json
//!
//!   # Validate a description and list the root without mounting
//!   flatfs --dry-run /mnt/flat fs.json

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use flatfs_fuse::{Config, MountConfig};
use flatfs_kernel::vfs::ROOT_PATH;
use flatfs_kernel::{FlatFs, FsOps, bootstrap_store};

/// Mount a flat, fixed-capacity in-memory filesystem.
#[derive(Parser, Debug)]
#[command(name = "flatfs")]
#[command(about = "Mount a flat, fixed-capacity in-memory filesystem")]
struct Args {
    /// Directory to mount on
    mountpoint: PathBuf,

    /// JSON description of the initial records
    description: PathBuf,

    /// Config file (default: ~/.config/flatfs/config.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Load the description, print the root listing, and exit
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    // stdout is reserved for --dry-run output
    fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::resolve(args.config.as_deref()).context("failed to load config")?;
    let store = bootstrap_store(&args.description, config.store).with_context(|| {
        format!("failed to load description {}", args.description.display())
    })?;
    let fs = FlatFs::new(Arc::new(store));

    if args.dry_run {
        for entry in fs.readdir(ROOT_PATH)? {
            println!("{}\t{}\t{:?}", entry.inode, entry.name, entry.kind);
        }
        return Ok(());
    }

    run(fs, &args.mountpoint, &config.mount)
}

#[cfg(feature = "fuse")]
fn run(fs: FlatFs, mountpoint: &Path, mount: &MountConfig) -> Result<()> {
    flatfs_fuse::mount(fs, mountpoint, mount)
        .with_context(|| format!("failed to mount at {}", mountpoint.display()))?;
    tracing::info!("Unmounted");
    Ok(())
}

#[cfg(not(feature = "fuse"))]
fn run(_fs: FlatFs, mountpoint: &Path, _mount: &MountConfig) -> Result<()> {
    anyhow::bail!(
        "cannot mount at {}: built without the `fuse` feature",
        mountpoint.display()
    )
}
