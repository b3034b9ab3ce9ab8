//! Single-writer guard for a store directory

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use eyre::{Context, Result, bail};
use fs2::FileExt;
use tracing::debug;

/// Lock file name inside the store directory
const LOCK_FILE_NAME: &str = "placestore.lock";

/// Exclusive advisory lock on a store directory, released on drop
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Take the lock without blocking; fails if another process holds it
    pub fn acquire(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).context("Failed to create store directory")?;
        let path = dir.join(LOCK_FILE_NAME);
        debug!(?path, "StoreLock::acquire: called");

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .context(format!("Failed to open lock file {}", path.display()))?;

        if file.try_lock_exclusive().is_err() {
            bail!("Store at {} is locked by another process", dir.display());
        }

        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
