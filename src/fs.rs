//! Filesystem access used by the index.
//!
//! Everything the index learns about disk goes through [`FileSystem`], so
//! hosts can serve unsaved editor buffers or tests can stub the disk.

use std::io;
use std::path::Path;
use std::time::SystemTime;

pub trait FileSystem: Send + Sync {
    /// True when `path` exists and is a regular file.
    fn is_file(&self, path: &Path) -> bool;

    /// Full contents of the file.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Creation (birth) time. `ErrorKind::Unsupported` when the platform
    /// or filesystem does not record it.
    fn created(&self, path: &Path) -> io::Result<SystemTime>;
}

/// [`FileSystem`] backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn created(&self, path: &Path) -> io::Result<SystemTime> {
        std::fs::metadata(path)?.created()
    }
}
