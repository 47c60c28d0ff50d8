//! Exclusive access to a cache directory across processes.
//!
//! Every invocation of the binary (a timer and a manual run, say) opens the
//! same `<cache_dir>/.lock` and takes an exclusive advisory lock on it for
//! the whole of a mutating cache operation, file work included. SQLite's own
//! locking only covers the index, not the image files beside it.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::trace;

const LOCK_FILE: &str = ".lock";

pub(crate) struct DirectoryLock {
    path: PathBuf,
}

/// Held for the duration of one cache operation; dropping it unlocks.
pub(crate) struct DirectoryGuard {
    file: File,
}

impl DirectoryLock {
    pub(crate) fn new(cache_dir: &Path) -> Self {
        Self { path: cache_dir.join(LOCK_FILE) }
    }

    /// Wait until no other handle holds the lock, then take it.
    ///
    /// The wait happens on the blocking pool so other tasks keep running.
    pub(crate) async fn acquire(&self) -> Result<DirectoryGuard> {
        let path = self.path.clone();
        let file = tokio::task::spawn_blocking(move || {
            let file = OpenOptions::new().create(true).truncate(false).write(true).open(&path)?;
            file.lock()?;
            Ok::<_, std::io::Error>(file)
        })
        .await
        .or_raise(|| ErrorKind::Lock(self.path.clone()))?
        .or_raise(|| ErrorKind::Lock(self.path.clone()))?;
        trace!(path = %self.path.display(), "locked cache directory");
        Ok(DirectoryGuard { file })
    }
}

impl Drop for DirectoryGuard {
    fn drop(&mut self) {
        // Closing the handle releases the lock too; unlocking first just
        // makes the hand-over immediate.
        _ = self.file.unlock();
    }
}
