// src/filesystem.rs

//! Disk sink for extracted package entries
//!
//! Creates intermediate directories, replaces existing non-directories
//! instead of writing through them, and forces ownership. Directory
//! permissions are applied last so that a read-only directory in the
//! payload does not block writing its children.

use crate::config::Ownership;
use crate::error::{Error, Result};
use std::fs::{self, File, OpenOptions, Permissions};
use std::io::Write;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Metadata of one entry to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMetadata {
    /// Permission bits
    pub mode: u32,
    /// Modification time in seconds since the epoch
    pub mtime: Option<u64>,
    pub owner: Option<Ownership>,
}

/// Changes the owner of a path without following symlinks
pub type ChownFn = fn(&Path, Ownership) -> std::io::Result<()>;

pub fn lchown(path: &Path, owner: Ownership) -> std::io::Result<()> {
    std::os::unix::fs::lchown(path, Some(owner.uid), Some(owner.gid))
}

/// Writes files and directories, finalizing directory modes on close
pub struct DiskWriter {
    pending_dirs: Vec<(PathBuf, u32)>,
    chown: ChownFn,
}

impl DiskWriter {
    pub fn new() -> Self {
        Self::with_chown(lchown)
    }

    /// Writer that applies ownership through `chown`
    pub fn with_chown(chown: ChownFn) -> Self {
        Self {
            pending_dirs: Vec::new(),
            chown,
        }
    }

    /// Create a directory and record its mode for [`DiskWriter::finish`]
    pub fn write_directory(&mut self, path: &Path, meta: &EntryMetadata) -> Result<()> {
        debug!("Creating directory {}", path.display());

        if let Ok(existing) = fs::symlink_metadata(path)
            && !existing.is_dir()
        {
            fs::remove_file(path).map_err(|e| write_failure(path, e))?;
        }

        fs::create_dir_all(path).map_err(|e| write_failure(path, e))?;
        self.apply_owner(path, meta.owner)?;
        self.pending_dirs.push((path.to_path_buf(), meta.mode));
        Ok(())
    }

    /// Write a regular file with the given contents
    pub fn write_file(&mut self, path: &Path, data: &[u8], meta: &EntryMetadata) -> Result<()> {
        debug!("Writing {} ({} bytes)", path.display(), data.len());

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| write_failure(parent, e))?;
        }

        // Unlink first: never write through a symlink, and a running
        // executable cannot be truncated in place.
        match fs::symlink_metadata(path) {
            Ok(existing) if existing.is_dir() => {
                return Err(write_failure(
                    path,
                    std::io::Error::other("a directory is in the way"),
                ));
            }
            Ok(_) => fs::remove_file(path).map_err(|e| write_failure(path, e))?,
            Err(_) => {}
        }

        let mut file: File = OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(path)
            .map_err(|e| write_failure(path, e))?;

        file.write_all(data).map_err(|e| write_failure(path, e))?;

        if let Some(mtime) = meta.mtime {
            file.set_modified(mtime_to_system_time(mtime))
                .map_err(|e| write_failure(path, e))?;
        }

        // chown clears setuid/setgid bits, so ownership goes before the mode
        self.apply_owner(path, meta.owner)?;
        file.set_permissions(Permissions::from_mode(meta.mode & 0o7777))
            .map_err(|e| write_failure(path, e))?;

        Ok(())
    }

    fn apply_owner(&self, path: &Path, owner: Option<Ownership>) -> Result<()> {
        if let Some(owner) = owner {
            (self.chown)(path, owner).map_err(|e| write_failure(path, e))?;
        }
        Ok(())
    }

    /// Apply deferred directory modes, deepest first
    pub fn finish(mut self) -> Result<()> {
        self.apply_pending()
    }

    fn apply_pending(&mut self) -> Result<()> {
        let mut dirs = std::mem::take(&mut self.pending_dirs);
        dirs.sort_by(|a, b| b.0.components().count().cmp(&a.0.components().count()));

        for (path, mode) in dirs {
            fs::set_permissions(&path, Permissions::from_mode(mode & 0o7777))
                .map_err(|e| write_failure(&path, e))?;
        }

        Ok(())
    }
}

impl Default for DiskWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DiskWriter {
    fn drop(&mut self) {
        if !self.pending_dirs.is_empty()
            && let Err(e) = self.apply_pending()
        {
            warn!("Failed to finalize directory permissions: {}", e);
        }
    }
}

fn write_failure(path: &Path, source: std::io::Error) -> Error {
    Error::WriteFailure {
        path: path.to_path_buf(),
        source,
    }
}

/// Convert a stored mtime back into a timestamp
pub fn mtime_to_system_time(mtime: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(mtime)
}
