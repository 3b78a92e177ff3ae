//! Exclusive build lock for one repository's cache directory.

use codewright_core::error::IndexError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Held for the duration of a build. Released on drop.
#[derive(Debug)]
pub struct BuildLock {
    file: File,
    path: PathBuf,
}

fn open_lock_file(path: &Path) -> Result<File, IndexError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| lock_error(path, e))?;
    }
    OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path)
        .map_err(|e| lock_error(path, e))
}

fn lock_error(path: &Path, e: impl std::fmt::Display) -> IndexError {
    IndexError::Lock {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

impl BuildLock {
    /// Wait until the lock is free, then take it.
    ///
    /// The blocking `flock` runs on the blocking pool so the async runtime
    /// keeps making progress while a concurrent build finishes.
    pub async fn acquire(path: &Path) -> Result<Self, IndexError> {
        let file = open_lock_file(path)?;
        let owned = path.to_path_buf();
        let file = tokio::task::spawn_blocking(move || {
            file.lock_exclusive().map(|_| file)
        })
        .await
        .map_err(|e| lock_error(&owned, e))?
        .map_err(|e| lock_error(&owned, e))?;

        debug!(path = %owned.display(), "Build lock acquired");
        Ok(Self { file, path: owned })
    }

    /// Take the lock only if nobody holds it.
    pub fn try_acquire(path: &Path) -> Result<Option<Self>, IndexError> {
        let file = open_lock_file(path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self {
                file,
                path: path.to_path_buf(),
            })),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(e) => Err(lock_error(path, e)),
        }
    }

}

impl Drop for BuildLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
        debug!(path = %self.path.display(), "Build lock released");
    }
}
