// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! The terminal-task archive: the third bucket a task lands in once it
//! leaves `pending`/`running` for good, durable across restarts and
//! queryable by id afterward (`archive/tasks/<id>.json`).

use crate::error::StorageError;
use crate::store::write_atomic;
use ouro_core::task::{Task, TaskId};
use std::path::PathBuf;
use std::time::{Duration, Instant};

pub struct TaskArchive {
    dir: PathBuf,
}

impl TaskArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, task_id: &str) -> PathBuf {
        self.dir.join(format!("{task_id}.json"))
    }

    /// Writes a task's terminal record. Called exactly once per task, right
    /// after it leaves the queue's `running` map — overwriting an existing
    /// archive entry would mean a task completed twice, which the queue
    /// already prevents.
    pub fn archive(&self, task: &Task) -> Result<(), StorageError> {
        write_atomic(&self.path(task.id.as_str()), task)
    }

    /// The non-blocking read behind `get_task_result`: `None` if the task
    /// hasn't reached a terminal state (or never existed) yet.
    pub fn get(&self, task_id: &TaskId) -> Result<Option<Task>, StorageError> {
        let path = self.path(task_id.as_str());
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                let task = serde_json::from_str(&contents).map_err(|source| StorageError::Deserialize { path, source })?;
                Ok(Some(task))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(&path, e)),
        }
    }

    /// Blocks the calling thread, polling at `poll_interval` until the task
    /// is archived or `timeout` elapses. For `ouroctl`-style callers that
    /// want to wait out a task synchronously rather than poll themselves.
    pub fn wait(&self, task_id: &TaskId, timeout: Duration, poll_interval: Duration) -> Result<Option<Task>, StorageError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(task) = self.get(task_id)? {
                return Ok(Some(task));
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            std::thread::sleep(poll_interval.min(remaining));
        }
    }
}
