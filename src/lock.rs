//! Data directory lock
//!
//! One engine per directory: opening takes an exclusive, non-blocking
//! `flock` on `<data_dir>/LOCK` and holds it until the engine is dropped.
//! The lock file contains the owner's process ID for debugging.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::io::AsRawFd;

use crate::error::{LsmError, Result};

/// Exclusive lock on a data directory, released on drop
#[derive(Debug)]
pub struct DirLock {
    _file: File,
    path: PathBuf,
}

impl DirLock {
    /// Lock `path`, failing with `DirectoryLocked` if another holder exists
    pub fn acquire(path: &Path) -> Result<Self> {
        // No truncate before locking: the current holder's PID must survive
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;

        Self::try_lock(&file).map_err(|e| match e.kind() {
            io::ErrorKind::WouldBlock => LsmError::DirectoryLocked(path.to_path_buf()),
            _ => LsmError::Io(e),
        })?;

        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        file.flush()?;

        Ok(Self {
            _file: file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Platform-specific lock acquisition
    #[cfg(unix)]
    fn try_lock(file: &File) -> io::Result<()> {
        use libc::{flock, LOCK_EX, LOCK_NB};

        let fd = file.as_raw_fd();
        // SAFETY: `fd` is a valid open descriptor owned by `file`
        let result = unsafe { flock(fd, LOCK_EX | LOCK_NB) };
        if result != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Unsupported platforms get no cross-process exclusion
    #[cfg(not(unix))]
    fn try_lock(_file: &File) -> io::Result<()> {
        Ok(())
    }
}
