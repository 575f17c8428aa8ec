//! Handler error to errno mapping.

use flatfs_kernel::FsError;
use libc::c_int;

/// The errno a FUSE reply carries for `err`.
pub fn errno(err: &FsError) -> c_int {
    match err {
        FsError::NotFound(_) => libc::ENOENT,
        FsError::NoSpace(_) => libc::ENOSPC,
        FsError::TooLarge { .. } => libc::EFBIG,
        FsError::AlreadyExists(_) => libc::EEXIST,
        FsError::NameTooLong { .. } => libc::ENAMETOOLONG,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_error_has_its_errno() {
        assert_eq!(errno(&FsError::not_found("/x")), libc::ENOENT);
        assert_eq!(errno(&FsError::no_space("table full")), libc::ENOSPC);
        assert_eq!(errno(&FsError::too_large(5000, 4098)), libc::EFBIG);
        assert_eq!(errno(&FsError::already_exists("/x")), libc::EEXIST);
        assert_eq!(
            errno(&FsError::NameTooLong { len: 300, limit: 256 }),
            libc::ENAMETOOLONG
        );
    }
}
