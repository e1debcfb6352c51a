// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error on {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },

    #[error("failed to serialize state: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to parse state at {path}: {source}")]
    Deserialize { path: PathBuf, #[source] source: serde_json::Error },

    #[error("lock at {path} held by another process past staleness window ({staleness_sec}s)")]
    LockTimeout { path: PathBuf, staleness_sec: u64 },
}

impl StorageError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
