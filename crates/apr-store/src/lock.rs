//! Advisory exclusive lock on a note's sidecar file.
//!
//! The lock is an OS advisory lock (flock on Unix) on `<note>.lock`. It is
//! cooperative: only writers that go through [`NoteLock`] are serialized.
//! The guard removes the sidecar when dropped, on every exit path.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Instant;

use fs2::FileExt;
use tracing::{debug, trace, warn};

use apr_core::defaults::LOCK_SUFFIX;
use apr_core::logging::{DURATION_MS, ERROR_MSG, PATH};
use apr_core::Result;

/// Path of the sidecar lock file for `note_path`.
pub fn lock_path(note_path: &Path) -> PathBuf {
    let mut os: OsString = note_path.as_os_str().to_owned();
    os.push(LOCK_SUFFIX);
    PathBuf::from(os)
}

/// Scoped exclusive lock. Held until dropped.
#[derive(Debug)]
pub struct NoteLock {
    file: Option<File>,
    path: PathBuf,
}

impl NoteLock {
    /// Block until the exclusive lock for `note_path` is held.
    ///
    /// The parent directory must exist. No timeout; waiters are not ordered.
    pub fn acquire(note_path: &Path) -> Result<Self> {
        let path = lock_path(note_path);
        let started = Instant::now();

        loop {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&path)?;
            FileExt::lock_exclusive(&file)?;

            // A previous holder unlinks the sidecar before unlocking, so a
            // waiter can end up owning an orphaned inode. Retry on the live
            // file in that case.
            if still_linked(&file, &path) {
                debug!(
                    { PATH } = %path.display(),
                    { DURATION_MS } = started.elapsed().as_millis() as u64,
                    "lock: acquired"
                );
                return Ok(Self {
                    file: Some(file),
                    path,
                });
            }
            trace!({ PATH } = %path.display(), "lock: sidecar replaced while waiting, retrying");
            let _ = FileExt::unlock(&file);
        }
    }

    /// Path of the sidecar file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for NoteLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!({ PATH } = %self.path.display(), { ERROR_MSG } = %e, "lock: failed to remove sidecar");
            }
        }
        if let Some(file) = self.file.take() {
            let _ = FileExt::unlock(&file);
        }
        trace!({ PATH } = %self.path.display(), "lock: released");
    }
}

#[cfg(unix)]
fn still_linked(file: &File, path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (file.metadata(), fs::metadata(path)) {
        (Ok(held), Ok(current)) => held.dev() == current.dev() && held.ino() == current.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn still_linked(_file: &File, path: &Path) -> bool {
    path.exists()
}
