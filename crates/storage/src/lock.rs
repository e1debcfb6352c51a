// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! Advisory file locking with staleness recovery, grounded on the settings
//! lock idiom: an exclusive-create lock file, spin with a short sleep, and
//! treat a lock older than its staleness window as abandoned rather than
//! waiting on it forever.

use crate::error::StorageError;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// RAII guard over an exclusive-create lock file. Dropping it removes the
/// file; a process that dies without unwinding (SIGKILL) leaves the file
/// behind, which the staleness check in [`FileLock::acquire`] reclaims.
pub struct FileLock {
    path: PathBuf,
}

impl FileLock {
    /// Spins attempting `O_CREAT | O_EXCL` on `path` until it succeeds, the
    /// existing lock is judged stale, or `timeout` elapses.
    pub fn acquire(path: &Path, staleness: Duration, timeout: Duration) -> Result<Self, StorageError> {
        let deadline = Instant::now() + timeout;
        loop {
            match OpenOptions::new().create_new(true).write(true).open(path) {
                Ok(_) => return Ok(Self { path: path.to_path_buf() }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if Self::is_stale(path, staleness) {
                        let _ = std::fs::remove_file(path);
                        continue;
                    }
                    if Instant::now() >= deadline {
                        return Err(StorageError::LockTimeout {
                            path: path.to_path_buf(),
                            staleness_sec: staleness.as_secs(),
                        });
                    }
                    sleep(Duration::from_millis(50));
                }
                Err(e) => return Err(StorageError::io(path, e)),
            }
        }
    }

    fn is_stale(path: &Path, staleness: Duration) -> bool {
        let Ok(meta) = std::fs::metadata(path) else { return true };
        let Ok(modified) = meta.modified() else { return false };
        let age = SystemTime::now().duration_since(modified).unwrap_or_default();
        age > staleness
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Returns the current epoch milliseconds, used to stamp lock files so a
/// future staleness check is based on wall-clock content rather than mtime
/// alone (kept simple here since mtime already carries that information).
pub fn epoch_ms_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn acquire_then_drop_releases_the_lock() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("test.lock");
        {
            let _lock = FileLock::acquire(&lock_path, Duration::from_secs(10), Duration::from_secs(1)).unwrap();
            assert!(lock_path.exists());
        }
        assert!(!lock_path.exists());
    }

    #[test]
    fn second_acquire_times_out_while_first_is_held() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("test.lock");
        let _held = FileLock::acquire(&lock_path, Duration::from_secs(600), Duration::from_secs(1)).unwrap();
        let result = FileLock::acquire(&lock_path, Duration::from_secs(600), Duration::from_millis(150));
        assert!(result.is_err());
    }

    #[test]
    fn zero_staleness_window_reclaims_any_existing_lock_file() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("test.lock");
        fs::write(&lock_path, b"").unwrap();
        let lock = FileLock::acquire(&lock_path, Duration::from_secs(0), Duration::from_secs(1));
        assert!(lock.is_ok());
    }
}
