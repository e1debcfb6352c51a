// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! External collaborator traits the supervisor reaches through: the LLM
//! client, the tool registry (including git-ops tools), and the worker
//! process adapter. No concrete LLM provider is wired up here.

pub mod error;
pub mod git_tools;
pub mod llm;
pub mod tools;
pub mod worker_process;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use error::{AgentAdapterError, LlmClientError};
pub use llm::{ChatRequest, ChatResponse, FakeLlmClient, LlmClient, Usage};
pub use tools::{ToolExecutor, ToolRegistry, ToolSchema};
pub use worker_process::{AgentAdapter, LocalAgentAdapter};

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeAgentAdapter;
