// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! Orchestration: the tick loop that ties the task queue, worker pool,
//! event bus, durable state, and owner-facing UI together into one
//! explicit, restart-safe value.

pub mod bus;
pub mod config;
pub mod error;
pub mod loop_;
pub mod pool;
pub mod retry;
pub mod router;
pub mod ui;

pub use bus::EventBus;
pub use error::RuntimeError;
pub use loop_::{Supervisor, TickOutcome};
pub use pool::WorkerPool;
pub use retry::Backoff;
pub use router::{parse_command, BatchWindow, Command, Mailbox, MailboxEntry};
pub use ui::{FakeUiAdapter, InboundMessage, UiAdapter};
