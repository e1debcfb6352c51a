// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! Durable supervisor state snapshot — everything that must survive a restart
//! besides the task queue itself (see [`crate::queue::QueueSnapshot`]).

use serde::{Deserialize, Serialize};

/// Supervisor-wide state persisted to disk between ticks and across restarts.
///
/// Loaded via the storage crate's `StateStore::load`, which falls back to
/// [`SupervisorState::default`] when no snapshot file exists yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisorState {
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub owner_chat_id: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub current_branch: String,
    #[serde(default)]
    pub current_sha: String,
    #[serde(default)]
    pub spent_usd: f64,
    #[serde(default)]
    pub spent_calls: u64,
    #[serde(default)]
    pub tg_offset: i64,
    #[serde(default)]
    pub evolution_mode_enabled: bool,
    #[serde(default)]
    pub bg_consciousness_enabled: bool,
    #[serde(default)]
    pub evolution_cycle: u64,
    #[serde(default)]
    pub evolution_consecutive_failures: u32,
    /// `spent_usd` as of the last evolution cycle, so the next cycle's due
    /// check can gate on spend *since* that cycle rather than cumulative
    /// lifetime spend.
    #[serde(default)]
    pub spent_usd_at_last_evolution: f64,
    #[serde(default)]
    pub last_owner_message_at: Option<u64>,
    /// Set once when `spent_usd` first reaches the budget limit, so the
    /// exhaustion notice fires exactly once per top-up cycle.
    #[serde(default)]
    pub budget_notified: bool,
}

impl Default for SupervisorState {
    fn default() -> Self {
        Self {
            owner_id: String::new(),
            owner_chat_id: String::new(),
            session_id: String::new(),
            current_branch: "stable".to_string(),
            current_sha: String::new(),
            spent_usd: 0.0,
            spent_calls: 0,
            tg_offset: 0,
            evolution_mode_enabled: false,
            bg_consciousness_enabled: false,
            evolution_cycle: 0,
            evolution_consecutive_failures: 0,
            spent_usd_at_last_evolution: 0.0,
            last_owner_message_at: None,
            budget_notified: false,
        }
    }
}

impl SupervisorState {
    /// `0 <= spent_usd <= budget_limit`, clamped defensively; the ledger is
    /// the source of truth for the running total, this just guards the
    /// snapshot against a corrupt or hand-edited file.
    pub fn clamp_spend(&mut self, budget_limit: f64) {
        self.spent_usd = self.spent_usd.clamp(0.0, budget_limit);
    }

    pub fn record_owner_message(&mut self, epoch_ms: u64) {
        self.last_owner_message_at = Some(epoch_ms);
    }

    /// Whether the owner has interacted recently enough to stay in "active
    /// mode" long-poll cadence rather than the idle 10s poll.
    pub fn is_active(&self, now_ms: u64, active_window_ms: u64) -> bool {
        match self.last_owner_message_at {
            Some(t) => now_ms.saturating_sub(t) <= active_window_ms,
            None => false,
        }
    }
}
