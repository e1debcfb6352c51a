// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! Worker subprocess identity and health state.

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a worker subprocess slot.
    pub struct WorkerId("wkr-");
}

/// Why a worker subprocess is no longer usable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum WorkerFault {
    /// The child process exited on its own.
    Exited { code: Option<i32> },
    /// The supervisor killed it after the hard deadline elapsed.
    HardTimeout,
    /// The adapter could not be reached (socket gone, pipe broken).
    Unreachable,
    /// The underlying LLM client reported a non-retryable error.
    LlmError { message: String },
}

crate::simple_display! {
    WorkerFault {
        Exited { .. } => "exited",
        HardTimeout => "hard_timeout",
        Unreachable => "unreachable",
        LlmError { .. } => "llm_error",
    }
}

/// Health of a worker slot as tracked by the pool.
///
/// `Stuck` is a tick-scoped suspicion (heartbeat overdue); it is promoted to
/// `Dead` and replaced if still overdue on the following tick (see
/// `WorkerPool::ensure_workers_healthy` in the supervisor crate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum WorkerHealth {
    /// No task assigned; eligible for dispatch.
    Idle,
    /// Running a task.
    Busy,
    /// Heartbeat overdue; not yet killed.
    Stuck,
    /// Torn down; must be respawned before reuse.
    Dead(WorkerFault),
}

impl WorkerHealth {
    pub fn is_idle(&self) -> bool {
        matches!(self, WorkerHealth::Idle)
    }

    pub fn is_dead(&self) -> bool {
        matches!(self, WorkerHealth::Dead(_))
    }
}

crate::simple_display! {
    WorkerHealth {
        Idle => "idle",
        Busy => "busy",
        Stuck => "stuck",
        Dead(_) => "dead",
    }
}

/// A single slot in the worker pool: an identity plus its current health.
///
/// The pool holds at most `Config::max_workers` of these. A slot's
/// `task_id` is `Some` exactly when `health == Busy`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSlot {
    pub id: WorkerId,
    pub health: WorkerHealth,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<crate::task::TaskId>,
    /// Consecutive faults since the slot was last idle; used to back off
    /// respawn attempts rather than hot-looping a crashing subprocess.
    #[serde(default)]
    pub consecutive_faults: u32,
}

impl WorkerSlot {
    pub fn new_idle() -> Self {
        Self { id: WorkerId::new(), health: WorkerHealth::Idle, task_id: None, consecutive_faults: 0 }
    }

    pub fn assign(&mut self, task_id: crate::task::TaskId) {
        self.health = WorkerHealth::Busy;
        self.task_id = Some(task_id);
    }

    pub fn release(&mut self) {
        self.health = WorkerHealth::Idle;
        self.task_id = None;
        self.consecutive_faults = 0;
    }

    pub fn mark_stuck(&mut self) {
        self.health = WorkerHealth::Stuck;
    }

    pub fn fault(&mut self, fault: WorkerFault) {
        self.consecutive_faults += 1;
        self.health = WorkerHealth::Dead(fault);
        self.task_id = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_slot_is_idle_with_no_task() {
        let slot = WorkerSlot::new_idle();
        assert!(slot.health.is_idle());
        assert!(slot.task_id.is_none());
    }

    #[test]
    fn fault_clears_task_and_increments_counter() {
        let mut slot = WorkerSlot::new_idle();
        slot.assign(crate::task::TaskId::new());
        slot.fault(WorkerFault::HardTimeout);
        assert!(slot.health.is_dead());
        assert!(slot.task_id.is_none());
        assert_eq!(slot.consecutive_faults, 1);
    }

    #[test]
    fn release_resets_fault_counter() {
        let mut slot = WorkerSlot::new_idle();
        slot.fault(WorkerFault::Unreachable);
        slot.release();
        assert_eq!(slot.consecutive_faults, 0);
        assert!(slot.health.is_idle());
    }
}
