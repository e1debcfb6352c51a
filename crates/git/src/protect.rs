// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! Protected-file safety net: a fixed set of paths the supervisor refuses to
//! let a tool delete, and re-syncs from a bundled reference copy if drifted.

use crate::error::GitOpsError;
use ouro_core::Config;
use std::path::Path;

/// Returns a refusal string if `path` names a protected file, `None`
/// otherwise. Tool executors surface the string back to the model and keep
/// the tool loop running rather than killing the task.
pub fn check_delete(cfg: &Config, path: &Path) -> Option<String> {
    let protected = cfg.protected_files.iter().any(|p| p == path);
    protected.then(|| format!("⚠️ PROTECTED_FILE: refusing to delete {}", path.display()))
}

/// Copies every protected file from `bundle_dir` over the working tree if
/// its contents differ, then commits the change with a fixed message.
/// Returns whether a sync commit happened.
pub fn sync_protected_files(cfg: &Config, repo: &Path, bundle_dir: &Path) -> Result<bool, GitOpsError> {
    let mut changed = false;
    for rel in &cfg.protected_files {
        let bundled = bundle_dir.join(rel);
        let working = repo.join(rel);
        let Ok(bundled_bytes) = std::fs::read(&bundled) else { continue };
        let working_bytes = std::fs::read(&working).unwrap_or_default();
        if bundled_bytes != working_bytes {
            if let Some(parent) = working.parent() {
                std::fs::create_dir_all(parent).map_err(|e| GitOpsError::io(parent, e))?;
            }
            std::fs::write(&working, &bundled_bytes).map_err(|e| GitOpsError::io(&working, e))?;
            changed = true;
        }
    }
    if changed {
        let mut failures = 0;
        crate::commit::commit(
            repo,
            cfg,
            crate::commit::CommitScope::Paths(cfg.protected_files.clone()),
            "safety-sync: restore protected files from bundle",
            false,
            &mut failures,
        )?;
    }
    Ok(changed)
}
