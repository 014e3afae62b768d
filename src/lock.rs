//! Single-instance guard backed by a marker file

use crate::errors::{GpuFanError, Result};
use log::{debug, warn};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Default location of the marker file
pub const DEFAULT_LOCK_FILE: &str = "/tmp/gpufanmanager.lock";

/// Holds the marker file for as long as it lives; removes it on drop
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
}

impl LockGuard {
    /// Create the marker file, failing with `AlreadyRunning` if it exists
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(GpuFanError::AlreadyRunning { path });
            }
            Err(e) => return Err(GpuFanError::Io(e)),
        };

        writeln!(file, "{}", std::process::id())?;
        debug!("Acquired lock {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Released lock {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove lock {}: {}", self.path.display(), e),
        }
    }
}
