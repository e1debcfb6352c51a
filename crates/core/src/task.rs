// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! Task identifier and lifecycle state machine.

use crate::worker::WorkerId;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

crate::define_id! {
    /// Unique identifier for a task instance.
    pub struct TaskId("tsk-");
}

/// The kind of work a task represents.
///
/// `Evolution` and `BgConsciousness` tasks are self-directed (triggered by the
/// supervisor loop, not the owner) and always carry a lower scheduling priority
/// than `Chat`/`Task` so owner interaction preempts background work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Chat,
    Task,
    Evolution,
    Review,
    BgConsciousness,
}

impl TaskType {
    /// Default scheduling priority for this task type (lower = more urgent).
    /// Owner-facing kinds preempt background kinds at the next assignment.
    pub fn default_priority(self) -> i32 {
        match self {
            TaskType::Chat => 0,
            TaskType::Task => 10,
            TaskType::Review => 20,
            TaskType::Evolution => 100,
            TaskType::BgConsciousness => 200,
        }
    }
}

crate::simple_display! {
    TaskType {
        Chat => "chat",
        Task => "task",
        Evolution => "evolution",
        Review => "review",
        BgConsciousness => "bg_consciousness",
    }
}

/// Lifecycle status of a [`Task`]. Transitions are strictly monotonic:
/// `Pending -> Assigned -> Running -> {Done, Failed, Cancelled, TimedOut}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Assigned,
    Running,
    Done,
    Failed,
    Cancelled,
    TimedOut,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Failed | TaskStatus::Cancelled | TaskStatus::TimedOut)
    }
}

crate::simple_display! {
    TaskStatus {
        Pending => "pending",
        Assigned => "assigned",
        Running => "running",
        Done => "done",
        Failed => "failed",
        Cancelled => "cancelled",
        TimedOut => "timed_out",
    }
}

/// An optional image reference attached to a task's payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ImageRef {
    Url { url: String },
    Base64 { base64: String, mime: String },
}

/// The prompt and options a task was created with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPayload {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
    /// Arbitrary caller-supplied options (model override, reasoning effort, etc).
    #[serde(default)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

/// Deadlines for a running task. `soft_deadline` triggers a one-shot warning;
/// `hard_deadline` triggers a kill. Both are measured from `started_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deadlines {
    pub soft: Duration,
    pub hard: Duration,
}

impl Deadlines {
    pub fn new(soft_sec: u64, hard_sec: u64) -> Self {
        Self { soft: Duration::from_secs(soft_sec), hard: Duration::from_secs(hard_sec) }
    }
}

/// The unit of work scheduled and tracked by the supervisor.
///
/// A task is in exactly one of (pending ordered list) XOR (running map) XOR
/// (terminal archive) at any time — that invariant is enforced by
/// [`crate::queue::TaskQueue`], not by this type itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub task_type: TaskType,
    /// Lower = more urgent.
    pub priority: i32,
    pub payload: TaskPayload,
    pub enqueued_at_ms: u64,
    pub deadlines: Deadlines,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<TaskId>,
    pub status: TaskStatus,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<WorkerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dedup_key: Option<String>,

    /// Wall-clock instant the task entered `Running`, used for deadline
    /// enforcement. Not persisted — restarts drop running tasks entirely
    /// (see [`crate::queue::QueueSnapshot`]).
    #[serde(skip, default = "Instant::now")]
    pub started_at: Instant,
    /// Whether the one-shot soft-deadline warning has already fired.
    #[serde(skip)]
    pub soft_warned: bool,
}

impl Task {
    pub fn new(task_type: TaskType, payload: TaskPayload, deadlines: Deadlines, epoch_ms: u64) -> Self {
        Self {
            id: TaskId::new(),
            priority: task_type.default_priority(),
            task_type,
            payload,
            enqueued_at_ms: epoch_ms,
            deadlines,
            parent_id: None,
            status: TaskStatus::Pending,
            attempts: 0,
            result: None,
            worker_id: None,
            dedup_key: None,
            started_at: Instant::now(),
            soft_warned: false,
        }
    }

    pub fn with_dedup_key(mut self, key: impl Into<String>) -> Self {
        self.dedup_key = Some(key.into());
        self
    }

    pub fn with_parent(mut self, parent: TaskId) -> Self {
        self.parent_id = Some(parent);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sort key for the pending queue: `(priority ASC, enqueued_at ASC)`.
    pub fn sort_key(&self) -> (i32, u64) {
        (self.priority, self.enqueued_at_ms)
    }

    pub fn mark_running(&mut self, worker_id: WorkerId, now: Instant) {
        self.status = TaskStatus::Running;
        self.worker_id = Some(worker_id);
        self.started_at = now;
        self.soft_warned = false;
    }

    pub fn mark_terminal(&mut self, status: TaskStatus, result: Option<String>) {
        debug_assert!(status.is_terminal());
        self.status = status;
        self.result = result;
    }
}

#[cfg(any(test, feature = "test-support"))]
pub struct TaskBuilder {
    task_type: TaskType,
    prompt: String,
    priority: Option<i32>,
    dedup_key: Option<String>,
    parent_id: Option<TaskId>,
    soft_sec: u64,
    hard_sec: u64,
    epoch_ms: u64,
}

#[cfg(any(test, feature = "test-support"))]
impl TaskBuilder {
    pub fn new(task_type: TaskType) -> Self {
        Self {
            task_type,
            prompt: "test prompt".to_string(),
            priority: None,
            dedup_key: None,
            parent_id: None,
            soft_sec: 600,
            hard_sec: 1800,
            epoch_ms: 1_700_000_000_000,
        }
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn dedup_key(mut self, key: impl Into<String>) -> Self {
        self.dedup_key = Some(key.into());
        self
    }

    pub fn parent(mut self, parent: TaskId) -> Self {
        self.parent_id = Some(parent);
        self
    }

    pub fn deadlines(mut self, soft_sec: u64, hard_sec: u64) -> Self {
        self.soft_sec = soft_sec;
        self.hard_sec = hard_sec;
        self
    }

    pub fn enqueued_at_ms(mut self, ms: u64) -> Self {
        self.epoch_ms = ms;
        self
    }

    pub fn build(self) -> Task {
        let payload = TaskPayload { prompt: self.prompt, image: None, options: Default::default() };
        let mut task = Task::new(self.task_type, payload, Deadlines::new(self.soft_sec, self.hard_sec), self.epoch_ms);
        if let Some(p) = self.priority {
            task.priority = p;
        }
        task.dedup_key = self.dedup_key;
        task.parent_id = self.parent_id;
        task
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evolution_and_bg_outrank_below_owner_kinds() {
        assert!(TaskType::Evolution.default_priority() > TaskType::Chat.default_priority());
        assert!(TaskType::Evolution.default_priority() > TaskType::Task.default_priority());
        assert!(TaskType::BgConsciousness.default_priority() > TaskType::Evolution.default_priority());
    }

    #[test]
    fn sort_key_orders_by_priority_then_age() {
        let a = TaskBuilder::new(TaskType::Task).priority(5).enqueued_at_ms(100).build();
        let b = TaskBuilder::new(TaskType::Task).priority(5).enqueued_at_ms(50).build();
        let c = TaskBuilder::new(TaskType::Task).priority(1).enqueued_at_ms(999).build();
        let mut keys = vec![a.sort_key(), b.sort_key(), c.sort_key()];
        keys.sort();
        assert_eq!(keys, vec![c.sort_key(), b.sort_key(), a.sort_key()]);
    }
}
