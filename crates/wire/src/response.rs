// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! Responses a running supervisor sends back over the control socket.

use serde::{Deserialize, Serialize};

/// Response from the supervisor to `ouroctl`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    /// Generic success, for commands with no interesting payload
    /// (`evolve`, `bg`, `restart`, `panic`).
    Ok,

    Pong,

    Status(StatusReport),

    /// `review` returns the most recent evolution cycle's summary text, if
    /// any cycle has run yet.
    Review { summary: Option<String> },

    Error { message: String },
}

/// Snapshot of supervisor state for the `status` command.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatusReport {
    pub session_id: String,
    pub current_branch: String,
    pub current_sha: String,
    pub spent_usd: f64,
    pub spent_calls: u64,
    pub evolution_mode_enabled: bool,
    pub bg_consciousness_enabled: bool,
    pub evolution_cycle: u64,
    pub pending_tasks: usize,
    pub running_tasks: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_report_defaults_to_zeroed_counters() {
        let report = StatusReport::default();
        assert_eq!(report.pending_tasks, 0);
        assert!(!report.evolution_mode_enabled);
    }

    #[test]
    fn error_round_trips_through_json() {
        let response = Response::Error { message: "boom".to_string() };
        let json = serde_json::to_string(&response).unwrap();
        let back: Response = serde_json::from_str(&json).unwrap();
        assert_eq!(back, response);
    }
}
