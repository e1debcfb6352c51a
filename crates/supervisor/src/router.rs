// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! Message routing between the owner and the chat agent: a free-path batch
//! window when idle, a busy-path injection channel while a task runs, and a
//! per-task mailbox that is never cleared on read.
//!
//! Grounded on the owner-inject mailbox semantics: append-only JSONL,
//! idempotent draining via a caller-held `seen_ids` set, and cleanup only
//! once a task is archived.

use ouro_core::task::{ImageRef, TaskId};
use ouro_storage::StorageError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailboxEntry {
    pub msg_id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<ImageRef>,
    pub received_at: u64,
}

pub struct Mailbox {
    dir: PathBuf,
}

impl Mailbox {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, task_id: &TaskId) -> PathBuf {
        self.dir.join(format!("{}.jsonl", task_id.as_str()))
    }

    pub fn write(&self, task_id: &TaskId, entry: &MailboxEntry) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| StorageError::io(&self.dir, e))?;
        let path = self.path(task_id);
        let line = serde_json::to_string(entry).map_err(StorageError::Serialize)?;
        use std::io::Write;
        let mut file = std::fs::OpenOptions::new().create(true).append(true).open(&path).map_err(|e| StorageError::io(&path, e))?;
        writeln!(file, "{line}").map_err(|e| StorageError::io(&path, e))?;
        Ok(())
    }

    /// Reads every entry not already in `seen_ids`, marking them seen.
    /// Mailboxes are append-only: this never removes anything from disk.
    pub fn drain(&self, task_id: &TaskId, seen_ids: &mut HashSet<String>) -> Result<Vec<MailboxEntry>, StorageError> {
        let path = self.path(task_id);
        let Ok(contents) = std::fs::read_to_string(&path) else { return Ok(Vec::new()) };
        let mut fresh = Vec::new();
        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let Ok(entry) = serde_json::from_str::<MailboxEntry>(line) else { continue };
            if seen_ids.insert(entry.msg_id.clone()) {
                fresh.push(entry);
            }
        }
        Ok(fresh)
    }

    /// The only way mailbox entries are ever removed — once a task has
    /// reached a terminal status and been archived.
    pub fn cleanup(&self, task_id: &TaskId) -> Result<(), StorageError> {
        let path = self.path(task_id);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(&path, e)),
        }
    }
}

/// Slash commands recognized inline in the chat text path, shared with the
/// `ouroctl` owner command surface over IPC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Status,
    Review,
    Evolve(bool),
    Bg(bool),
    /// `/bg status` — a read-only query, distinct from the on/off toggle.
    BgStatus,
    Restart,
    Panic,
}

pub fn parse_command(text: &str) -> Option<Command> {
    let trimmed = text.trim();
    if !trimmed.starts_with('/') {
        return None;
    }
    let mut parts = trimmed[1..].split_whitespace();
    match parts.next()? {
        "status" => Some(Command::Status),
        "review" => Some(Command::Review),
        "evolve" => match parts.next() {
            None | Some("on") => Some(Command::Evolve(true)),
            Some("off") | Some("stop") | Some("0") => Some(Command::Evolve(false)),
            Some(_) => None,
        },
        "bg" => match parts.next() {
            None | Some("on") | Some("start") => Some(Command::Bg(true)),
            Some("off") | Some("stop") => Some(Command::Bg(false)),
            Some("status") => Some(Command::BgStatus),
            Some(_) => None,
        },
        "restart" => Some(Command::Restart),
        "panic" => Some(Command::Panic),
        _ => None,
    }
}

/// Collects free-path owner text over a bounded window: up to
/// `max_window`, closing early after `silence_timeout` without a new
/// message. Slash commands are expected to be pulled out by the caller
/// before concatenation — this type only does the windowing and joining.
pub struct BatchWindow {
    texts: Vec<String>,
    first_image: Option<ImageRef>,
}

impl BatchWindow {
    pub fn new() -> Self {
        Self { texts: Vec::new(), first_image: None }
    }

    pub fn push(&mut self, text: String, image: Option<ImageRef>) {
        self.texts.push(text);
        if self.first_image.is_none() {
            self.first_image = image;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Concatenates collected texts in arrival order; the first image seen
    /// in the window wins.
    pub fn finish(self) -> (String, Option<ImageRef>) {
        (self.texts.join("\n"), self.first_image)
    }
}

impl Default for BatchWindow {
    fn default() -> Self {
        Self::new()
    }
}
