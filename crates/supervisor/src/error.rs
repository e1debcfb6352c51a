// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Storage(#[from] ouro_storage::StorageError),

    #[error(transparent)]
    Git(#[from] ouro_git::GitOpsError),

    #[error("worker adapter error: {0}")]
    Adapter(#[from] ouro_adapters::AgentAdapterError),

    #[error("{0} consecutive panics inside tick(), exiting")]
    RepeatedPanic(u32),
}
