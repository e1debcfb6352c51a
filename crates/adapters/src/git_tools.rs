// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! Registers the git-ops tools (`repo_write_commit`, `repo_commit`,
//! `git_status`, `git_diff`) against [`ouro_git`], so a worker's tool loop
//! reaches the supervisor's own repository the same way the original
//! tool-registry entries did.

use crate::tools::{ToolExecutor, ToolRegistry, ToolSchema};
use async_trait::async_trait;
use ouro_core::Config;
use ouro_git::commit::CommitScope;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;

struct RepoWriteCommit {
    repo: PathBuf,
    cfg: Config,
    consecutive_failures: Arc<Mutex<u32>>,
}

#[async_trait]
impl ToolExecutor for RepoWriteCommit {
    async fn execute(&self, args: Value) -> String {
        let Some(path) = args.get("path").and_then(Value::as_str) else {
            return "⚠️ GIT_ERROR (repo_write_commit): missing \"path\" argument".to_string();
        };
        let Some(contents) = args.get("contents").and_then(Value::as_str) else {
            return "⚠️ GIT_ERROR (repo_write_commit): missing \"contents\" argument".to_string();
        };
        let message = args.get("message").and_then(Value::as_str).unwrap_or("worker commit");
        let target = self.repo.join(path);
        if let Some(parent) = target.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                return format!("⚠️ GIT_ERROR (write): {e}");
            }
        }
        if let Err(e) = std::fs::write(&target, contents) {
            return format!("⚠️ GIT_ERROR (write): {e}");
        }
        let mut failures = self.consecutive_failures.lock();
        match ouro_git::commit::commit(&self.repo, &self.cfg, CommitScope::Paths(vec![PathBuf::from(path)]), message, true, &mut failures) {
            Ok(outcome) => outcome.message,
            Err(e) => e.to_string(),
        }
    }
}

struct RepoCommit {
    repo: PathBuf,
    cfg: Config,
    consecutive_failures: Arc<Mutex<u32>>,
}

#[async_trait]
impl ToolExecutor for RepoCommit {
    async fn execute(&self, args: Value) -> String {
        let message = args.get("message").and_then(Value::as_str).unwrap_or("worker commit");
        let scope = match args.get("paths").and_then(Value::as_array) {
            Some(paths) => CommitScope::Paths(paths.iter().filter_map(Value::as_str).map(PathBuf::from).collect()),
            None => CommitScope::All,
        };
        let mut failures = self.consecutive_failures.lock();
        match ouro_git::commit::commit(&self.repo, &self.cfg, scope, message, true, &mut failures) {
            Ok(outcome) => outcome.message,
            Err(e) => e.to_string(),
        }
    }
}

struct GitStatus {
    repo: PathBuf,
}

#[async_trait]
impl ToolExecutor for GitStatus {
    async fn execute(&self, _args: Value) -> String {
        match Command::new("git").arg("-C").arg(&self.repo).args(["status", "--porcelain"]).output() {
            Ok(out) => String::from_utf8_lossy(&out.stdout).to_string(),
            Err(e) => format!("⚠️ GIT_ERROR (status): {e}"),
        }
    }
}

struct GitDiff {
    repo: PathBuf,
}

#[async_trait]
impl ToolExecutor for GitDiff {
    async fn execute(&self, _args: Value) -> String {
        match Command::new("git").arg("-C").arg(&self.repo).args(["diff"]).output() {
            Ok(out) => String::from_utf8_lossy(&out.stdout).to_string(),
            Err(e) => format!("⚠️ GIT_ERROR (diff): {e}"),
        }
    }
}

/// Registers all four git-ops tools against a single repository, sharing
/// one consecutive-failure counter across them so the escalation policy in
/// `ouro_git::commit::commit` applies crate-wide, not per tool.
pub fn register_git_tools(registry: &mut ToolRegistry, repo: PathBuf, cfg: Config) {
    let consecutive_failures = Arc::new(Mutex::new(0));

    registry.register(
        ToolSchema {
            name: "repo_write_commit".to_string(),
            description: "Write a file and commit it, running the test gate.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string"},
                    "contents": {"type": "string"},
                    "message": {"type": "string"},
                },
                "required": ["path", "contents"],
            }),
        },
        Arc::new(RepoWriteCommit { repo: repo.clone(), cfg: cfg.clone(), consecutive_failures: consecutive_failures.clone() }),
    );

    registry.register(
        ToolSchema {
            name: "repo_commit".to_string(),
            description: "Commit currently staged or named paths, running the test gate.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "message": {"type": "string"},
                    "paths": {"type": "array", "items": {"type": "string"}},
                },
                "required": ["message"],
            }),
        },
        Arc::new(RepoCommit { repo: repo.clone(), cfg, consecutive_failures }),
    );

    registry.register(
        ToolSchema { name: "git_status".to_string(), description: "Show working tree status.".to_string(), parameters: json!({"type": "object", "properties": {}}) },
        Arc::new(GitStatus { repo: repo.clone() }),
    );

    registry.register(
        ToolSchema { name: "git_diff".to_string(), description: "Show unstaged diff.".to_string(), parameters: json!({"type": "object", "properties": {}}) },
        Arc::new(GitDiff { repo }),
    );
}
