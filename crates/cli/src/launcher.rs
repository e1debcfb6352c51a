// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! The "self-exec for restart" launcher: re-spawns the supervisor as a
//! fresh subprocess on exit code 42, giving every soft restart a clean
//! address space instead of resetting state in place.

use crate::daemon::{EXIT_PANIC, EXIT_RESTART};
use std::process::Command;

/// Runs `ouroctl run-supervisor` in a loop, respawning on exit 42 until the
/// child exits with any other code.
pub fn run(data_dir: &std::path::Path) -> anyhow::Result<i32> {
    let exe = std::env::current_exe()?;
    loop {
        let status = Command::new(&exe).arg("run-supervisor").arg("--data-dir").arg(data_dir).status()?;
        match status.code() {
            Some(EXIT_RESTART) => {
                tracing::info!("supervisor requested restart, respawning");
                continue;
            }
            Some(EXIT_PANIC) => {
                tracing::warn!("supervisor panicked, launcher exiting");
                return Ok(EXIT_PANIC);
            }
            Some(code) => return Ok(code),
            None => return Ok(1),
        }
    }
}
