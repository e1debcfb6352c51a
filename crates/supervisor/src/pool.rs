// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! Worker pool: owns a fixed number of subprocess slots, dispatches tasks
//! to idle workers, and sweeps for unhealthy ones every tick.

use ouro_adapters::AgentAdapter;
use ouro_core::queue::TaskQueue;
use ouro_core::worker::{WorkerFault, WorkerHealth, WorkerId, WorkerSlot};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-slot heartbeat bookkeeping the pool needs but `WorkerSlot` itself
/// does not (the core type stays I/O- and clock-free).
struct SlotMeta {
    last_heartbeat_at: Instant,
}

pub struct WorkerPool<A: AgentAdapter> {
    adapter: Arc<A>,
    slots: HashMap<WorkerId, WorkerSlot>,
    meta: HashMap<WorkerId, SlotMeta>,
    worker_program: String,
    worker_args: Vec<String>,
}

impl<A: AgentAdapter> WorkerPool<A> {
    pub fn new(adapter: Arc<A>, worker_program: impl Into<String>, worker_args: Vec<String>) -> Self {
        Self { adapter, slots: HashMap::new(), meta: HashMap::new(), worker_program: worker_program.into(), worker_args }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn idle_count(&self) -> usize {
        self.slots.values().filter(|s| s.health.is_idle()).count()
    }

    pub fn slots_contain(&self, worker_id: &WorkerId) -> bool {
        self.slots.contains_key(worker_id)
    }

    /// Spawns slots until `slot_count() == n`, leaving excess slots alone —
    /// callers wanting a hard resize should `kill_workers` first.
    pub async fn spawn_workers(&mut self, n: usize, now: Instant) {
        while self.slots.len() < n {
            let slot = WorkerSlot::new_idle();
            let id = slot.id.clone();
            if self.adapter.spawn(id.clone(), &self.worker_program, &self.worker_args).await.is_ok() {
                self.slots.insert(id.clone(), slot);
                self.meta.insert(id, SlotMeta { last_heartbeat_at: now });
            } else {
                break;
            }
        }
    }

    pub async fn kill_workers(&mut self, force: bool) {
        for id in self.slots.keys().cloned().collect::<Vec<_>>() {
            let _ = self.adapter.kill(&id, force).await;
        }
        self.slots.clear();
        self.meta.clear();
    }

    pub fn note_heartbeat(&mut self, worker_id: &WorkerId, now: Instant) {
        if let Some(m) = self.meta.get_mut(worker_id) {
            m.last_heartbeat_at = now;
        }
    }

    /// Every tick: dead slots (process gone) are dropped; a slot whose
    /// heartbeat exceeds `heartbeat_timeout` is marked `Stuck`; a slot
    /// already `Stuck` on this sweep is killed and dropped so the next
    /// `spawn_workers` call replaces it.
    pub async fn ensure_workers_healthy(&mut self, now: Instant, heartbeat_timeout: Duration) {
        let mut to_kill = Vec::new();
        for (id, slot) in self.slots.iter_mut() {
            if !self.adapter.is_alive(id) {
                slot.fault(WorkerFault::Unreachable);
                continue;
            }
            let overdue = self.meta.get(id).map(|m| now.saturating_duration_since(m.last_heartbeat_at) > heartbeat_timeout).unwrap_or(false);
            match (&slot.health, overdue) {
                (WorkerHealth::Stuck, true) => to_kill.push(id.clone()),
                (_, true) if slot.health != WorkerHealth::Idle => slot.mark_stuck(),
                _ => {}
            }
        }
        for id in to_kill {
            let _ = self.adapter.kill(&id, true).await;
            self.slots.remove(&id);
            self.meta.remove(&id);
        }
        self.slots.retain(|_, slot| !slot.health.is_dead());
        let live_ids: std::collections::HashSet<_> = self.slots.keys().cloned().collect();
        self.meta.retain(|id, _| live_ids.contains(id));
    }

    /// Pops from `queue.pending` and dispatches to idle workers. Locking is
    /// implicit: `&mut self` and `&mut TaskQueue` are both exclusive
    /// borrows, so a task is never observed in neither-pending-nor-running
    /// between the pop and the assignment.
    pub async fn assign_tasks(&mut self, queue: &mut TaskQueue, now: Instant) {
        loop {
            if queue.pending().is_empty() {
                break;
            }
            let Some(id) = self.slots.iter().find(|(_, s)| s.health.is_idle()).map(|(id, _)| id.clone()) else {
                break;
            };
            let Some(task) = queue.take_for_worker(id.clone(), now) else { break };
            let prompt = task.payload.prompt.clone();
            if self.adapter.send_input(&id, &prompt).await.is_ok() {
                if let Some(slot) = self.slots.get_mut(&id) {
                    slot.assign(task.id.clone());
                }
                self.meta.insert(id, SlotMeta { last_heartbeat_at: now });
            }
        }
    }

    /// Kills and removes one specific worker regardless of its current
    /// health — used when the queue's deadline enforcement demands a hard
    /// kill for the worker assigned to a timed-out task.
    pub async fn kill_worker(&mut self, worker_id: &WorkerId, force: bool) {
        let _ = self.adapter.kill(worker_id, force).await;
        self.slots.remove(worker_id);
        self.meta.remove(worker_id);
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use ouro_adapters::error::AgentAdapterError;
    use parking_lot::Mutex;

    struct FakeAdapter {
        alive: Mutex<std::collections::HashSet<WorkerId>>,
        inputs: Mutex<Vec<(WorkerId, String)>>,
    }

    impl FakeAdapter {
        fn new() -> Self {
            Self { alive: Mutex::new(Default::default()), inputs: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait::async_trait]
    impl AgentAdapter for FakeAdapter {
        async fn spawn(&self, worker_id: WorkerId, _program: &str, _args: &[String]) -> Result<(), AgentAdapterError> {
            self.alive.lock().insert(worker_id);
            Ok(())
        }

        async fn send_input(&self, worker_id: &WorkerId, text: &str) -> Result<(), AgentAdapterError> {
            self.inputs.lock().push((worker_id.clone(), text.to_string()));
            Ok(())
        }

        async fn kill(&self, worker_id: &WorkerId, _force: bool) -> Result<(), AgentAdapterError> {
            self.alive.lock().remove(worker_id);
            Ok(())
        }

        fn is_alive(&self, worker_id: &WorkerId) -> bool {
            self.alive.lock().contains(worker_id)
        }
    }

    #[tokio::test]
    async fn spawn_workers_reaches_the_target_count() {
        let adapter = Arc::new(FakeAdapter::new());
        let mut pool = WorkerPool::new(adapter, "worker-bin", vec![]);
        pool.spawn_workers(3, Instant::now()).await;
        assert_eq!(pool.slot_count(), 3);
        assert_eq!(pool.idle_count(), 3);
    }

    #[tokio::test]
    async fn assign_tasks_dispatches_to_an_idle_worker() {
        let adapter = Arc::new(FakeAdapter::new());
        let mut pool = WorkerPool::new(adapter, "worker-bin", vec![]);
        let now = Instant::now();
        pool.spawn_workers(1, now).await;
        let mut queue = TaskQueue::new();
        queue.enqueue(ouro_core::TaskBuilder::new(ouro_core::TaskType::Task).build()).unwrap();
        pool.assign_tasks(&mut queue, now).await;
        assert_eq!(pool.idle_count(), 0);
        assert_eq!(queue.running().len(), 1);
    }

    #[tokio::test]
    async fn dead_worker_detected_by_adapter_is_pruned_on_health_sweep() {
        let adapter = Arc::new(FakeAdapter::new());
        let mut pool = WorkerPool::new(adapter.clone(), "worker-bin", vec![]);
        let now = Instant::now();
        pool.spawn_workers(1, now).await;
        let id = pool.slots.keys().next().cloned().unwrap();
        adapter.alive.lock().remove(&id);
        pool.ensure_workers_healthy(now, Duration::from_secs(60)).await;
        assert_eq!(pool.slot_count(), 0);
    }

    #[tokio::test]
    async fn overdue_heartbeat_marks_stuck_then_kills_on_next_sweep() {
        let adapter = Arc::new(FakeAdapter::new());
        let mut pool = WorkerPool::new(adapter, "worker-bin", vec![]);
        let now = Instant::now();
        pool.spawn_workers(1, now).await;
        let id = pool.slots.keys().next().cloned().unwrap();
        pool.slots.get_mut(&id).unwrap().health = WorkerHealth::Busy;

        let later = now + Duration::from_secs(120);
        pool.ensure_workers_healthy(later, Duration::from_secs(60)).await;
        assert_eq!(pool.slots.get(&id).unwrap().health, WorkerHealth::Stuck);

        let even_later = later + Duration::from_secs(120);
        pool.ensure_workers_healthy(even_later, Duration::from_secs(60)).await;
        assert!(!pool.slots.contains_key(&id));
    }
}
