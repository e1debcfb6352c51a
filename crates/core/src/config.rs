// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! Supervisor configuration, loaded from `settings.json` with defaults for
//! every field. Lives here rather than in the supervisor crate because
//! `ouro_core::queue` and `ouro_git` both need it without depending back on
//! `ouro_supervisor`; the supervisor crate re-exports this type at
//! `ouro_supervisor::config::Config` as its public home.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Every tunable knob governing supervisor behavior. All fields have
/// defaults so a missing or partial `settings.json` is never fatal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub max_workers: usize,
    pub total_budget_usd: f64,
    pub soft_timeout_sec: u64,
    pub hard_timeout_sec: u64,
    pub bg_max_rounds: u32,
    pub bg_wakeup_min_sec: u64,
    pub bg_wakeup_max_sec: u64,
    pub evolution_cost_threshold_usd: f64,
    /// Minimum wall-clock gap between evolution cycles.
    pub evolution_cycle_min_interval_sec: u64,
    /// Consecutive `ouro_git::commit` test-gate failures before a commit is
    /// allowed to stand uninverted (Open Question (a)).
    pub test_failure_escalation_threshold: u32,
    /// Attempts allowed across crash, restart, and hard-deadline-kill
    /// interruptions before a task is permanently failed (Open Question (b)).
    pub max_attempts: u32,
    pub protected_files: Vec<PathBuf>,
    /// How recent `last_owner_message_at` must be to stay in active-mode
    /// poll cadence rather than falling back to idle long-poll.
    pub active_window_sec: u64,
    pub diag_heartbeat_sec: u64,
    pub diag_slow_cycle_sec: u64,
    pub test_command: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            max_workers: 5,
            total_budget_usd: 10.0,
            soft_timeout_sec: 600,
            hard_timeout_sec: 1800,
            bg_max_rounds: 10,
            bg_wakeup_min_sec: 300,
            bg_wakeup_max_sec: 1800,
            evolution_cost_threshold_usd: 0.10,
            evolution_cycle_min_interval_sec: 3600,
            test_failure_escalation_threshold: 3,
            max_attempts: 3,
            protected_files: Vec::new(),
            active_window_sec: 300,
            diag_heartbeat_sec: 60,
            diag_slow_cycle_sec: 5,
            test_command: vec!["cargo".to_string(), "test".to_string(), "--quiet".to_string()],
        }
    }
}

impl Config {
    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }

    pub fn events_log_path(&self) -> PathBuf {
        self.data_dir.join("logs").join("events.jsonl")
    }

    pub fn supervisor_log_path(&self) -> PathBuf {
        self.data_dir.join("logs").join("supervisor.jsonl")
    }

    pub fn owner_mailbox_dir(&self) -> PathBuf {
        self.data_dir.join("memory").join("owner_mailbox")
    }

    pub fn locks_dir(&self) -> PathBuf {
        self.data_dir.join("locks")
    }

    pub fn control_socket_path(&self) -> PathBuf {
        self.data_dir.join("control.sock")
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.data_dir.join("archive").join("tasks")
    }

    pub fn archive_task_path(&self, task_id: &str) -> PathBuf {
        self.archive_dir().join(format!("{task_id}.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_knobs() {
        let cfg = Config::default();
        assert_eq!(cfg.max_workers, 5);
        assert_eq!(cfg.total_budget_usd, 10.0);
        assert_eq!(cfg.soft_timeout_sec, 600);
        assert_eq!(cfg.hard_timeout_sec, 1800);
        assert_eq!(cfg.max_attempts, 3);
        assert_eq!(cfg.test_failure_escalation_threshold, 3);
    }

    #[test]
    fn missing_fields_deserialize_to_defaults() {
        let cfg: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn partial_json_overrides_only_named_fields() {
        let cfg: Config = serde_json::from_str(r#"{"max_workers": 2}"#).unwrap();
        assert_eq!(cfg.max_workers, 2);
        assert_eq!(cfg.total_budget_usd, Config::default().total_budget_usd);
    }
}
