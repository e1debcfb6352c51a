// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! Shared data model for the Ouroboros supervisor: tasks, workers, events,
//! configuration, and the durable state snapshot. No I/O lives here —
//! persistence is `ouro_storage`, process management is `ouro_adapters`,
//! orchestration is `ouro_supervisor`.

#[macro_use]
pub mod macros;

pub mod clock;
pub mod config;
pub mod event;
pub mod queue;
pub mod state;
pub mod task;
pub mod worker;

pub use clock::{Clock, SystemClock};
pub use config::Config;
pub use event::Event;
pub use queue::{CancelOutcome, QueueError, QueueSnapshot, TaskQueue, TimeoutEvent};
pub use state::SupervisorState;
pub use task::{Task, TaskId, TaskPayload, TaskStatus, TaskType};
pub use worker::{WorkerFault, WorkerHealth, WorkerId, WorkerSlot};

#[cfg(any(test, feature = "test-support"))]
pub use clock::FakeClock;
#[cfg(any(test, feature = "test-support"))]
pub use task::TaskBuilder;
