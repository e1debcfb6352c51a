// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! Telemetry events emitted onto the supervisor's in-process event bus.
//!
//! Events are fire-and-forget: a slow or absent subscriber must never block
//! task execution. See [`crate::bus`] exported from the supervisor crate for
//! the broadcast channel these flow through.

use crate::task::{TaskId, TaskType};
use crate::worker::{WorkerFault, WorkerId};
use serde::{Deserialize, Serialize};

/// A single telemetry event tagged by `type` for JSON transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Event {
    TaskEnqueued { task_id: TaskId, task_type: TaskType, epoch_ms: u64 },
    TaskStarted { task_id: TaskId, worker_id: WorkerId, epoch_ms: u64 },
    TaskProgress { task_id: TaskId, worker_id: WorkerId, message: String, epoch_ms: u64 },
    TaskDone { task_id: TaskId, worker_id: WorkerId, epoch_ms: u64 },
    TaskFailed { task_id: TaskId, worker_id: Option<WorkerId>, reason: String, epoch_ms: u64 },
    TaskTimedOut { task_id: TaskId, worker_id: WorkerId, epoch_ms: u64 },
    WorkerFaulted { worker_id: WorkerId, fault: WorkerFault, epoch_ms: u64 },
    LlmUsage { task_id: TaskId, prompt_tokens: u64, completion_tokens: u64, cost_usd: f64, epoch_ms: u64 },
    Heartbeat { epoch_ms: u64, pending_tasks: usize, running_tasks: usize },
    RestartRequested { reason: String, epoch_ms: u64 },
    OwnerNotify { text: String, epoch_ms: u64 },
}

impl Event {
    pub fn epoch_ms(&self) -> u64 {
        match self {
            Event::TaskEnqueued { epoch_ms, .. }
            | Event::TaskStarted { epoch_ms, .. }
            | Event::TaskProgress { epoch_ms, .. }
            | Event::TaskDone { epoch_ms, .. }
            | Event::TaskFailed { epoch_ms, .. }
            | Event::TaskTimedOut { epoch_ms, .. }
            | Event::WorkerFaulted { epoch_ms, .. }
            | Event::LlmUsage { epoch_ms, .. }
            | Event::Heartbeat { epoch_ms, .. }
            | Event::RestartRequested { epoch_ms, .. }
            | Event::OwnerNotify { epoch_ms, .. } => *epoch_ms,
        }
    }

    /// The task this event concerns, if any — used to route progress into
    /// the owner mailbox for the task that produced it.
    pub fn task_id(&self) -> Option<&TaskId> {
        match self {
            Event::TaskEnqueued { task_id, .. }
            | Event::TaskStarted { task_id, .. }
            | Event::TaskProgress { task_id, .. }
            | Event::TaskDone { task_id, .. }
            | Event::TaskFailed { task_id, .. }
            | Event::TaskTimedOut { task_id, .. }
            | Event::LlmUsage { task_id, .. } => Some(task_id),
            Event::WorkerFaulted { .. } | Event::Heartbeat { .. } | Event::RestartRequested { .. } | Event::OwnerNotify { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_tag_field() {
        let ev = Event::Heartbeat { epoch_ms: 1, pending_tasks: 2, running_tasks: 3 };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "heartbeat");
        assert_eq!(json["pending_tasks"], 2);
    }

    #[test]
    fn task_id_extracted_for_task_scoped_variants() {
        let task_id = TaskId::new();
        let ev = Event::TaskDone { task_id: task_id.clone(), worker_id: WorkerId::new(), epoch_ms: 0 };
        assert_eq!(ev.task_id(), Some(&task_id));

        let ev = Event::Heartbeat { epoch_ms: 0, pending_tasks: 0, running_tasks: 0 };
        assert_eq!(ev.task_id(), None);
    }
}
