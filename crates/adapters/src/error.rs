// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentAdapterError {
    #[error("failed to spawn worker process: {0}")]
    Spawn(String),

    #[error("worker process unreachable")]
    Unreachable,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LlmClientError {
    #[error("budget exhausted: spending ${spent:.2} would exceed limit ${limit:.2}")]
    BudgetExhausted { spent: f64, limit: f64 },

    #[error("rate limited, retry after {retry_after_sec}s")]
    RateLimited { retry_after_sec: u64 },

    #[error("provider error: {0}")]
    Provider(String),
}
