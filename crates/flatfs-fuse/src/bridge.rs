//! `fuser::Filesystem` over the flatfs handlers.
//!
//! Every kernel request is turned into a path through the [`InodeTable`],
//! forwarded to the matching [`FsOps`] handler, and the result (or its
//! errno) is replied.

use std::ffi::OsStr;
use std::path::Path;
use std::time::{Duration, SystemTime};

use flatfs_kernel::{FileAttr, FileType, FlatFs, FsError, FsOps};
use fuser::{
    Filesystem, MountOption, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty,
    ReplyEntry, ReplyOpen, ReplyStatfs, ReplyWrite, Request, TimeOrNow,
};
use libc::c_int;
use tracing::{debug, info};

use crate::config::MountConfig;
use crate::constants::BLOCK_SIZE;
use crate::errno::errno;
use crate::inodes::InodeTable;
use crate::replies::{block_counts, listing_entries};

/// A mountable flatfs instance.
pub struct FlatFsFuse {
    fs: FlatFs,
    inodes: InodeTable,
    ttl: Duration,
    uid: u32,
    gid: u32,
}

impl FlatFsFuse {
    pub fn new(fs: FlatFs, ttl: Duration) -> Self {
        Self {
            fs,
            inodes: InodeTable::new(),
            ttl,
            uid: unsafe { libc::getuid() },
            gid: unsafe { libc::getgid() },
        }
    }

    fn path_of(&self, ino: u64) -> Result<String, c_int> {
        self.inodes
            .path(ino)
            .map(str::to_string)
            .ok_or(libc::ENOENT)
    }

    fn child_of(&self, parent: u64, name: &OsStr) -> Result<String, c_int> {
        let name = name.to_str().ok_or(libc::EINVAL)?;
        self.inodes.child_path(parent, name).ok_or(libc::ENOENT)
    }

    fn to_fuse_attr(&self, ino: u64, attr: &FileAttr) -> fuser::FileAttr {
        fuser::FileAttr {
            ino,
            size: attr.size,
            blocks: attr.size.div_ceil(u64::from(BLOCK_SIZE)),
            atime: attr.mtime,
            mtime: attr.mtime,
            ctime: attr.mtime,
            crtime: attr.mtime,
            kind: fuse_kind(attr.kind),
            perm: (attr.perm & 0o7777) as u16,
            nlink: attr.nlink,
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            blksize: BLOCK_SIZE,
            flags: 0,
        }
    }

    /// Intern `path` and convert its attributes for an entry reply.
    fn entry_for(&mut self, path: &str, attr: &FileAttr) -> fuser::FileAttr {
        let ino = self.inodes.intern(path);
        self.to_fuse_attr(ino, attr)
    }

    fn remove(&mut self, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let path = match self.child_of(parent, name) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        match self.fs.unlink(&path) {
            Ok(()) => {
                self.inodes.forget(&path);
                reply.ok();
            }
            Err(e) => reply.error(fail("unlink", &path, &e)),
        }
    }
}

fn fuse_kind(kind: FileType) -> fuser::FileType {
    match kind {
        FileType::File => fuser::FileType::RegularFile,
        FileType::Directory => fuser::FileType::Directory,
    }
}

fn fail(op: &str, path: &str, err: &FsError) -> c_int {
    debug!(op, path, error = %err, "request failed");
    errno(err)
}

impl Filesystem for FlatFsFuse {
    fn lookup(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let path = match self.child_of(parent, name) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        match self.fs.getattr(&path) {
            Ok(attr) => {
                let attr = self.entry_for(&path, &attr);
                reply.entry(&self.ttl, &attr, 0);
            }
            Err(e) => reply.error(fail("lookup", &path, &e)),
        }
    }

    fn getattr(&mut self, _req: &Request, ino: u64, reply: ReplyAttr) {
        let path = match self.path_of(ino) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        match self.fs.getattr(&path) {
            Ok(attr) => reply.attr(&self.ttl, &self.to_fuse_attr(ino, &attr)),
            Err(e) => reply.error(fail("getattr", &path, &e)),
        }
    }

    fn setattr(
        &mut self,
        _req: &Request,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let path = match self.path_of(ino) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        // only size changes are honored; everything else reports current attrs
        if let Some(size) = size {
            if let Err(e) = self.fs.truncate(&path, size) {
                return reply.error(fail("truncate", &path, &e));
            }
        }
        match self.fs.getattr(&path) {
            Ok(attr) => reply.attr(&self.ttl, &self.to_fuse_attr(ino, &attr)),
            Err(e) => reply.error(fail("setattr", &path, &e)),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let path = match self.path_of(ino) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        let listing = match self.fs.readdir(&path) {
            Ok(listing) => listing,
            Err(e) => return reply.error(fail("readdir", &path, &e)),
        };

        for entry in listing_entries(ino, listing, offset, &mut self.inodes) {
            if reply.add(entry.ino, entry.next_offset, fuse_kind(entry.kind), &entry.name) {
                break;
            }
        }
        reply.ok();
    }

    fn open(&mut self, _req: &Request, ino: u64, _flags: i32, reply: ReplyOpen) {
        let path = match self.path_of(ino) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        match self.fs.open(&path) {
            Ok(()) => reply.opened(0, 0),
            Err(e) => reply.error(fail("open", &path, &e)),
        }
    }

    fn read(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock: Option<u64>,
        reply: ReplyData,
    ) {
        let path = match self.path_of(ino) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        let Ok(offset) = u64::try_from(offset) else {
            return reply.error(libc::EINVAL);
        };
        match self.fs.read(&path, offset, size) {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(fail("read", &path, &e)),
        }
    }

    fn write(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock: Option<u64>,
        reply: ReplyWrite,
    ) {
        let path = match self.path_of(ino) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        let Ok(offset) = u64::try_from(offset) else {
            return reply.error(libc::EINVAL);
        };
        match self.fs.write(&path, offset, data) {
            Ok(written) => reply.written(written),
            Err(e) => reply.error(fail("write", &path, &e)),
        }
    }

    fn create(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        let path = match self.child_of(parent, name) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        match self.fs.create(&path, mode) {
            Ok(attr) => {
                let attr = self.entry_for(&path, &attr);
                reply.created(&self.ttl, &attr, 0, 0, 0);
            }
            Err(e) => reply.error(fail("create", &path, &e)),
        }
    }

    fn mkdir(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        let path = match self.child_of(parent, name) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        match self.fs.mkdir(&path, mode) {
            Ok(attr) => {
                let attr = self.entry_for(&path, &attr);
                reply.entry(&self.ttl, &attr, 0);
            }
            Err(e) => reply.error(fail("mkdir", &path, &e)),
        }
    }

    fn unlink(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        self.remove(parent, name, reply);
    }

    fn rmdir(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        self.remove(parent, name, reply);
    }

    fn statfs(&mut self, _req: &Request, _ino: u64, reply: ReplyStatfs) {
        match self.fs.statfs() {
            Ok(st) => {
                let counts = block_counts(&st);
                reply.statfs(
                    counts.blocks,
                    counts.bfree,
                    counts.bfree,
                    st.files,
                    st.ffree,
                    counts.bsize,
                    st.namelen,
                    counts.frsize,
                );
            }
            Err(e) => reply.error(fail("statfs", "/", &e)),
        }
    }
}

/// Mount `fs` at `mountpoint`, blocking until it is unmounted.
pub fn mount(fs: FlatFs, mountpoint: &Path, config: &MountConfig) -> std::io::Result<()> {
    let mut options = vec![MountOption::FSName(config.fs_name.clone())];
    if config.auto_unmount {
        options.push(MountOption::AutoUnmount);
    }
    if config.allow_other {
        options.push(MountOption::AllowOther);
    }

    info!(
        mountpoint = %mountpoint.display(),
        fs_name = %config.fs_name,
        "Mounting"
    );
    fuser::mount2(FlatFsFuse::new(fs, config.attr_ttl()), mountpoint, &options)
}
