// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitOpsError {
    #[error("⚠️ GIT_ERROR ({op}): {message}")]
    Command { op: &'static str, message: String },

    #[error("⚠️ GIT_NO_CHANGES: nothing to commit.")]
    NoChanges,

    #[error("⚠️ TESTS_FAILED: {0}")]
    TestsFailed(String),

    #[error("io error on {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },

    #[error(transparent)]
    Storage(#[from] ouro_storage::StorageError),

    #[error("refused: working tree has unsynced changes and policy is Refuse")]
    UnsyncedRefused,
}

impl GitOpsError {
    pub fn command(op: &'static str, message: impl Into<String>) -> Self {
        Self::Command { op, message: message.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
