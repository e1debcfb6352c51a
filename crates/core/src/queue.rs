// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! The pending/running task queue.
//!
//! A task is in exactly one of `pending` XOR `running` at any time; every
//! mutating method upholds that by construction rather than by assertion.

use crate::config::Config;
use crate::state::SupervisorState;
use crate::task::{Task, TaskId, TaskPayload, TaskStatus, TaskType};
use crate::worker::WorkerId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("a task with dedup_key {0:?} is already pending or running")]
    DedupCollision(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    /// Was pending; removed outright, never dispatched.
    Removed,
    /// Was running; cooperative cancel signal sent, worker pool must kill it.
    SignalSent { worker_id: WorkerId },
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeoutEvent {
    SoftWarning { task_id: TaskId, worker_id: WorkerId },
    HardKill { task_id: TaskId, worker_id: WorkerId },
}

/// The persisted half of [`TaskQueue`] — `running` is intentionally dropped
/// across a restart: tasks found running in a restored snapshot are stale,
/// and the caller re-enqueues them through the attempts policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub pending: Vec<Task>,
    pub running: HashMap<WorkerId, Task>,
}

#[derive(Debug, Default)]
pub struct TaskQueue {
    pending: Vec<Task>,
    running: HashMap<WorkerId, Task>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: QueueSnapshot) -> Self {
        Self { pending: snapshot.pending, running: snapshot.running }
    }

    /// Drops `running` — callers must re-drive interrupted tasks through
    /// `requeue_interrupted` themselves.
    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot { pending: self.pending.clone(), running: HashMap::new() }
    }

    pub fn pending(&self) -> &[Task] {
        &self.pending
    }

    pub fn running(&self) -> &HashMap<WorkerId, Task> {
        &self.running
    }

    fn has_dedup_collision(&self, key: &str) -> bool {
        self.pending.iter().any(|t| t.dedup_key.as_deref() == Some(key))
            || self.running.values().any(|t| t.dedup_key.as_deref() == Some(key))
    }

    /// Inserts keeping `pending` sorted by `(priority ASC, enqueued_at ASC)`.
    /// Rejects a dedup collision without mutating the queue.
    pub fn enqueue(&mut self, task: Task) -> Result<(), QueueError> {
        if let Some(key) = &task.dedup_key {
            if self.has_dedup_collision(key) {
                return Err(QueueError::DedupCollision(key.clone()));
            }
        }
        let pos = self.pending.partition_point(|t| t.sort_key() <= task.sort_key());
        self.pending.insert(pos, task);
        Ok(())
    }

    pub fn cancel(&mut self, task_id: &TaskId) -> CancelOutcome {
        if let Some(pos) = self.pending.iter().position(|t| &t.id == task_id) {
            self.pending.remove(pos);
            return CancelOutcome::Removed;
        }
        if let Some((worker_id, _)) = self.running.iter().find(|(_, t)| &t.id == task_id) {
            return CancelOutcome::SignalSent { worker_id: worker_id.clone() };
        }
        CancelOutcome::NotFound
    }

    /// Cancels every task of `task_type`, pending or running — used to purge
    /// queued evolution work the moment evolution mode is turned off. A
    /// pending match is removed outright; a running match comes back as
    /// `SignalSent` so the caller can kill its worker.
    pub fn cancel_by_type(&mut self, task_type: TaskType) -> Vec<CancelOutcome> {
        let ids: Vec<TaskId> = self.pending.iter().filter(|t| t.task_type == task_type).map(|t| t.id.clone()).collect();
        let mut outcomes: Vec<CancelOutcome> = ids.iter().map(|id| self.cancel(id)).collect();
        let running_workers: Vec<WorkerId> = self.running.iter().filter(|(_, t)| t.task_type == task_type).map(|(w, _)| w.clone()).collect();
        outcomes.extend(running_workers.into_iter().map(|worker_id| CancelOutcome::SignalSent { worker_id }));
        outcomes
    }

    /// Moves the front-most pending task (if any) into `running` under the
    /// given worker. The caller (worker pool) holds the single critical
    /// section this lives inside, so a task is never visible in neither set.
    pub fn take_for_worker(&mut self, worker_id: WorkerId, now: Instant) -> Option<&Task> {
        if self.pending.is_empty() {
            return None;
        }
        let mut task = self.pending.remove(0);
        task.mark_running(worker_id.clone(), now);
        self.running.insert(worker_id.clone(), task);
        self.running.get(&worker_id)
    }

    pub fn complete(&mut self, worker_id: &WorkerId, status: TaskStatus, result: Option<String>) -> Option<Task> {
        let mut task = self.running.remove(worker_id)?;
        task.mark_terminal(status, result);
        Some(task)
    }

    /// Re-enqueues a task that was running when a worker died or the
    /// process restarted. `attempts` is bumped; beyond `max_attempts` the
    /// task is returned as permanently failed instead of requeued.
    pub fn requeue_interrupted(&mut self, mut task: Task, max_attempts: u32) -> Result<(), Task> {
        task.attempts += 1;
        task.worker_id = None;
        if task.attempts > max_attempts {
            task.mark_terminal(TaskStatus::Failed, Some("exceeded max_attempts after interruption".to_string()));
            return Err(task);
        }
        task.status = TaskStatus::Pending;
        let pos = self.pending.partition_point(|t| t.sort_key() <= task.sort_key());
        self.pending.insert(pos, task);
        Ok(())
    }

    /// On restart, any `running` entry found in a restored snapshot is
    /// stale by construction (the process that was executing it is gone).
    /// Drains `running` and requeues each through the attempts policy.
    pub fn auto_resume_after_restart(&mut self, max_attempts: u32) -> Vec<Task> {
        let stale: Vec<Task> = self.running.drain().map(|(_, t)| t).collect();
        let mut permanently_failed = Vec::new();
        for task in stale {
            if let Err(failed) = self.requeue_interrupted(task, max_attempts) {
                permanently_failed.push(failed);
            }
        }
        permanently_failed
    }

    /// Soft-deadline crossing warns once per task (idempotent via
    /// `soft_warned`); hard-deadline crossing yields a kill signal every
    /// call until the task actually leaves `running` — the worker pool is
    /// expected to act on the first one it sees.
    pub fn enforce_timeouts(&mut self, now: Instant) -> Vec<TimeoutEvent> {
        let mut events = Vec::new();
        for (worker_id, task) in self.running.iter_mut() {
            let elapsed = now.saturating_duration_since(task.started_at);
            if elapsed >= task.deadlines.hard {
                events.push(TimeoutEvent::HardKill { task_id: task.id.clone(), worker_id: worker_id.clone() });
            } else if elapsed >= task.deadlines.soft && !task.soft_warned {
                task.soft_warned = true;
                events.push(TimeoutEvent::SoftWarning { task_id: task.id.clone(), worker_id: worker_id.clone() });
            }
        }
        events
    }

    fn has_active_evolution_task(&self) -> bool {
        self.pending.iter().any(|t| t.task_type == TaskType::Evolution)
            || self.running.values().any(|t| t.task_type == TaskType::Evolution)
    }

    /// At most one concurrent `Evolution` task, gated on `evolution_mode_enabled`,
    /// elapsed time since the last cycle, and the cost threshold.
    pub fn enqueue_evolution_if_needed(&mut self, state: &SupervisorState, cfg: &Config, now_epoch_ms: u64, last_cycle_epoch_ms: u64) {
        if !state.evolution_mode_enabled || self.has_active_evolution_task() {
            return;
        }
        let elapsed_sec = now_epoch_ms.saturating_sub(last_cycle_epoch_ms) / 1000;
        if elapsed_sec < cfg.evolution_cycle_min_interval_sec {
            return;
        }
        let spent_since_last_cycle = state.spent_usd - state.spent_usd_at_last_evolution;
        if spent_since_last_cycle < cfg.evolution_cost_threshold_usd {
            return;
        }
        let payload = TaskPayload { prompt: "evolution cycle".to_string(), image: None, options: Default::default() };
        let deadlines = crate::task::Deadlines::new(cfg.soft_timeout_sec, cfg.hard_timeout_sec);
        let task = Task::new(TaskType::Evolution, payload, deadlines, now_epoch_ms);
        let _ = self.enqueue(task);
    }
}
