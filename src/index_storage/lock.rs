//! Advisory lock held for the whole load-mutate-save cycle of a scan or a rename

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use fs2::FileExt;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Exclusive lock on the cache lock file; released on drop
#[derive(Debug)]
pub struct CacheLock {
    file: File,
    path: PathBuf,
}

impl CacheLock {
    /// Acquire the lock, polling until `timeout` elapses
    ///
    /// # Errors
    ///
    /// Returns an error if the lock file cannot be created or another holder keeps the
    /// lock past `timeout`.
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create lock directory: {}", parent.display())
            })?;
        }

        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("Failed to open lock file: {}", path.display()))?;

        let start = Instant::now();
        loop {
            if file.try_lock_exclusive().is_ok() {
                debug!(lock = %path.display(), "acquired cache lock");
                return Ok(Self { file, path: path.to_path_buf() });
            }
            if start.elapsed() >= timeout {
                bail!("Timed out waiting for cache lock: {}", path.display());
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
