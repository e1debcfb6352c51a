// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! Single-instance PID lock via `fs2` advisory locking — OS-released, so a
//! `SIGKILL`'d supervisor never leaves a stale lock behind (unlike the
//! exclusive-create file locks in [`crate::lock`], which rely on staleness
//! detection instead).

use crate::error::StorageError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Holds an OS advisory lock on the PID file for the lifetime of the guard.
/// The lock is released automatically by the kernel when the process exits,
/// by any means, so no `Drop`-based cleanup is required for correctness —
/// we still remove the file on a clean drop for tidiness.
pub struct InstanceLock {
    file: File,
    path: PathBuf,
}

impl InstanceLock {
    /// Attempts to take the single-instance lock. Returns `Ok(None)` rather
    /// than an error if another live process already holds it — that is the
    /// expected outcome of a second launch attempt, not a failure.
    pub fn try_acquire(path: &Path) -> Result<Option<Self>, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }
        let file = OpenOptions::new().create(true).write(true).truncate(false).open(path).map_err(|e| StorageError::io(path, e))?;
        match file.try_lock_exclusive() {
            Ok(()) => {
                let mut f = &file;
                f.set_len(0).map_err(|e| StorageError::io(path, e))?;
                writeln!(f, "{}", std::process::id()).map_err(|e| StorageError::io(path, e))?;
                Ok(Some(Self { file, path: path.to_path_buf() }))
            }
            Err(_) => Ok(None),
        }
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_acquire_succeeds_second_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("supervisor.pid");
        let first = InstanceLock::try_acquire(&path).unwrap();
        assert!(first.is_some());
        let second = InstanceLock::try_acquire(&path).unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn dropping_the_lock_lets_a_new_one_acquire() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("supervisor.pid");
        {
            let _first = InstanceLock::try_acquire(&path).unwrap();
        }
        let second = InstanceLock::try_acquire(&path).unwrap();
        assert!(second.is_some());
    }
}
