// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! Process-management boundary for worker subprocesses: spawn, feed input,
//! kill, and bridge the child's progress back onto an `mpsc` channel.
//!
//! A supervising task per managed child, translating whatever the child
//! emits into [`ouro_core::Event`] and forwarding it through a sender the
//! caller owns.

use async_trait::async_trait;
use ouro_core::event::Event;
use ouro_core::worker::WorkerId;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, Mutex};

use crate::error::AgentAdapterError;

#[async_trait]
pub trait AgentAdapter: Send + Sync {
    async fn spawn(&self, worker_id: WorkerId, program: &str, args: &[String]) -> Result<(), AgentAdapterError>;
    async fn send_input(&self, worker_id: &WorkerId, text: &str) -> Result<(), AgentAdapterError>;
    async fn kill(&self, worker_id: &WorkerId, force: bool) -> Result<(), AgentAdapterError>;
    fn is_alive(&self, worker_id: &WorkerId) -> bool;
}

struct ManagedWorker {
    stdin: tokio::process::ChildStdin,
    pid: Option<u32>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

/// Spawns and supervises OS subprocesses directly (no container/remote
/// indirection — out of scope per this crate's single-node non-goal).
pub struct LocalAgentAdapter {
    workers: Arc<Mutex<HashMap<WorkerId, ManagedWorker>>>,
    event_tx: mpsc::Sender<Event>,
}

impl LocalAgentAdapter {
    pub fn new(event_tx: mpsc::Sender<Event>) -> Self {
        Self { workers: Arc::new(Mutex::new(HashMap::new())), event_tx }
    }

    /// Bridges a child's stdout, line by line, into `TaskProgress` events
    /// until the child exits or a shutdown signal arrives.
    fn spawn_bridge(&self, worker_id: WorkerId, mut child: Child, mut shutdown_rx: oneshot::Receiver<()>) {
        let event_tx = self.event_tx.clone();
        let workers = self.workers.clone();
        tokio::spawn(async move {
            let Some(stdout) = child.stdout.take() else { return };
            let mut lines = BufReader::new(stdout).lines();
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        let _ = child.start_kill();
                        break;
                    }
                    line = lines.next_line() => {
                        match line {
                            Ok(Some(text)) => {
                                let _ = event_tx.send(Event::TaskProgress {
                                    task_id: ouro_core::task::TaskId::from_string(""),
                                    worker_id: worker_id.clone(),
                                    message: text,
                                    epoch_ms: 0,
                                }).await;
                            }
                            Ok(None) => break,
                            Err(_) => break,
                        }
                    }
                }
            }
            workers.lock().await.remove(&worker_id);
        });
    }
}

#[async_trait]
impl AgentAdapter for LocalAgentAdapter {
    async fn spawn(&self, worker_id: WorkerId, program: &str, args: &[String]) -> Result<(), AgentAdapterError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| AgentAdapterError::Spawn(e.to_string()))?;

        let pid = child.id();
        let stdin = child.stdin.take().ok_or_else(|| AgentAdapterError::Spawn("no stdin handle".to_string()))?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.workers.lock().await.insert(worker_id.clone(), ManagedWorker { stdin, pid, shutdown_tx: Some(shutdown_tx) });
        self.spawn_bridge(worker_id, child, shutdown_rx);
        Ok(())
    }

    async fn send_input(&self, worker_id: &WorkerId, text: &str) -> Result<(), AgentAdapterError> {
        let mut workers = self.workers.lock().await;
        let worker = workers.get_mut(worker_id).ok_or(AgentAdapterError::Unreachable)?;
        worker.stdin.write_all(text.as_bytes()).await.map_err(AgentAdapterError::Io)?;
        worker.stdin.write_all(b"\n").await.map_err(AgentAdapterError::Io)?;
        Ok(())
    }

    /// `force == false` sends `SIGTERM` and leaves the process-exit bridge
    /// to observe the clean exit; `force == true` signals shutdown, which
    /// drives the bridge task to `start_kill` (`SIGKILL`) immediately.
    /// Graceful callers are expected to wait up to their own timeout and
    /// retry with `force = true` if the worker is still alive.
    async fn kill(&self, worker_id: &WorkerId, force: bool) -> Result<(), AgentAdapterError> {
        let (pid, shutdown_tx) = {
            let mut workers = self.workers.lock().await;
            match workers.get_mut(worker_id) {
                Some(w) => (w.pid, if force { w.shutdown_tx.take() } else { None }),
                None => return Ok(()),
            }
        };

        if !force {
            if let Some(pid) = pid {
                let _ = nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), nix::sys::signal::Signal::SIGTERM);
            }
            return Ok(());
        }

        if let Some(tx) = shutdown_tx {
            let _ = tx.send(());
        }
        Ok(())
    }

    fn is_alive(&self, worker_id: &WorkerId) -> bool {
        // try_lock rather than an async/blocking lock: callers (the pool's
        // health sweep) must never stall on this check.
        self.workers.try_lock().map(|w| w.contains_key(worker_id)).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawning_true_exits_cleanly_and_is_removed_from_the_map() {
        let (tx, _rx) = mpsc::channel(16);
        let adapter = LocalAgentAdapter::new(tx);
        let worker_id = WorkerId::new();
        adapter.spawn(worker_id.clone(), "true", &[]).await.unwrap();
        // give the bridge a moment to observe the exit
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!adapter.is_alive(&worker_id));
    }

    #[tokio::test]
    async fn kill_signals_shutdown_for_a_long_lived_child() {
        let (tx, _rx) = mpsc::channel(16);
        let adapter = LocalAgentAdapter::new(tx);
        let worker_id = WorkerId::new();
        adapter.spawn(worker_id.clone(), "sleep", &["5".to_string()]).await.unwrap();
        assert!(adapter.is_alive(&worker_id));
        adapter.kill(&worker_id, true).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert!(!adapter.is_alive(&worker_id));
    }
}
