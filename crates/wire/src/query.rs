// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! Requests `ouroctl` sends to a running supervisor.

use serde::{Deserialize, Serialize};

/// The owner command surface, trimmed to the handful of operations a running
/// supervisor exposes over the control socket. Chat text itself never
/// travels this path — it reaches the supervisor through whichever
/// `UiAdapter` the owner is actually talking to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Query {
    /// Health check / version handshake.
    Ping,
    Status,
    Review,
    Evolve { enabled: bool },
    Bg { enabled: bool },
    Restart,
    Panic,
}
