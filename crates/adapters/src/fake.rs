// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! An in-process [`AgentAdapter`] for tests outside this crate — scenario
//! tests in `ouro_supervisor` need a worker adapter that never touches a
//! real subprocess, with hooks to simulate a crashed or wedged worker.

use crate::error::AgentAdapterError;
use crate::worker_process::AgentAdapter;
use async_trait::async_trait;
use ouro_core::worker::WorkerId;
use parking_lot::Mutex;
use std::collections::HashSet;

#[derive(Default)]
pub struct FakeAgentAdapter {
    alive: Mutex<HashSet<WorkerId>>,
    /// Workers that must report "alive" forever, ignoring `kill` — used to
    /// simulate a wedged subprocess for hard-timeout scenarios.
    wedged: Mutex<HashSet<WorkerId>>,
    inputs: Mutex<Vec<(WorkerId, String)>>,
}

impl FakeAgentAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_wedged(&self, worker_id: WorkerId) {
        self.wedged.lock().insert(worker_id);
    }

    pub fn crash(&self, worker_id: &WorkerId) {
        self.alive.lock().remove(worker_id);
    }

    pub fn inputs_for(&self, worker_id: &WorkerId) -> Vec<String> {
        self.inputs.lock().iter().filter(|(id, _)| id == worker_id).map(|(_, text)| text.clone()).collect()
    }
}

#[async_trait]
impl AgentAdapter for FakeAgentAdapter {
    async fn spawn(&self, worker_id: WorkerId, _program: &str, _args: &[String]) -> Result<(), AgentAdapterError> {
        self.alive.lock().insert(worker_id);
        Ok(())
    }

    async fn send_input(&self, worker_id: &WorkerId, text: &str) -> Result<(), AgentAdapterError> {
        self.inputs.lock().push((worker_id.clone(), text.to_string()));
        Ok(())
    }

    async fn kill(&self, worker_id: &WorkerId, _force: bool) -> Result<(), AgentAdapterError> {
        if self.wedged.lock().contains(worker_id) {
            return Ok(());
        }
        self.alive.lock().remove(worker_id);
        Ok(())
    }

    fn is_alive(&self, worker_id: &WorkerId) -> bool {
        self.alive.lock().contains(worker_id) || self.wedged.lock().contains(worker_id)
    }
}
