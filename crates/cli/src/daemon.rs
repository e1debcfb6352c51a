// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! Wires up a real `Supervisor` — `LocalAgentAdapter` workers, the Unix
//! control socket, the system clock — and runs the tick loop until it
//! asks to stop.

use crate::socket_ui::{SocketUiAdapter, StatusCache};
use ouro_adapters::worker_process::LocalAgentAdapter;
use ouro_core::{Clock, Config, SystemClock};
use ouro_git::UnsyncedPolicy;
use ouro_supervisor::{EventBus, Supervisor, TickOutcome, UiAdapter, WorkerPool};
use ouro_wire::StatusReport;
use std::sync::Arc;
use std::time::Duration;

/// Exit code 42: the launcher should re-exec a fresh supervisor.
pub const EXIT_RESTART: i32 = 42;
/// Exit code 99: owner-triggered panic, no restart.
pub const EXIT_PANIC: i32 = 99;

pub async fn run(cfg: Config) -> anyhow::Result<i32> {
    ouro_git::ensure_repo_present(&cfg)?;
    ouro_git::safe_restart(&cfg.data_dir, "supervisor boot", UnsyncedPolicy::RescueAndReset)?;

    let bus = EventBus::new(256);
    let event_tx = bus.sender();
    let adapter = Arc::new(LocalAgentAdapter::new(event_tx));
    let pool = WorkerPool::new(adapter, "ouro-worker", Vec::new());

    let cache = Arc::new(StatusCache::default());
    let ui = Arc::new(SocketUiAdapter::bind(&cfg.control_socket_path(), cache.clone())?);

    let mut supervisor = Supervisor::new(cfg, pool, bus, ui, SystemClock);
    supervisor.restore()?;

    loop {
        refresh_status_cache(&supervisor, &cache);
        match supervisor.tick_with_backoff(poll_timeout(&supervisor)).await {
            Ok(TickOutcome::Continue { sleep }) => tokio::time::sleep(sleep).await,
            Ok(TickOutcome::Restart { reason }) => {
                tracing::info!(%reason, "supervisor restarting");
                return Ok(EXIT_RESTART);
            }
            Ok(TickOutcome::Panic { reason }) => {
                tracing::warn!(%reason, "supervisor panicking, no restart");
                return Ok(EXIT_PANIC);
            }
            Err(e) => {
                tracing::error!(error = %e, "supervisor exiting after repeated tick failures");
                return Ok(EXIT_RESTART);
            }
        }
    }
}

fn poll_timeout<A: ouro_adapters::AgentAdapter, U: UiAdapter, C: Clock>(supervisor: &Supervisor<A, U, C>) -> Duration {
    let active = supervisor.state.is_active(supervisor.clock.epoch_ms(), supervisor.cfg.active_window_sec * 1000);
    if active {
        Duration::from_millis(200)
    } else {
        Duration::from_secs(5)
    }
}

fn refresh_status_cache<A: ouro_adapters::AgentAdapter, U: UiAdapter, C: Clock>(
    supervisor: &Supervisor<A, U, C>,
    cache: &StatusCache,
) {
    cache.update_status(StatusReport {
        session_id: supervisor.state.session_id.clone(),
        current_branch: supervisor.state.current_branch.clone(),
        current_sha: supervisor.state.current_sha.clone(),
        spent_usd: supervisor.state.spent_usd,
        spent_calls: supervisor.state.spent_calls,
        evolution_mode_enabled: supervisor.state.evolution_mode_enabled,
        bg_consciousness_enabled: supervisor.state.bg_consciousness_enabled,
        evolution_cycle: supervisor.state.evolution_cycle,
        pending_tasks: supervisor.queue.pending().len(),
        running_tasks: supervisor.queue.running().len(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use ouro_adapters::FakeAgentAdapter;
    use ouro_core::{FakeClock, TaskBuilder, TaskType};
    use ouro_supervisor::ui::FakeUiAdapter;

    fn test_supervisor(dir: &std::path::Path) -> Supervisor<FakeAgentAdapter, FakeUiAdapter, FakeClock> {
        let cfg = Config { data_dir: dir.to_path_buf(), max_workers: 1, active_window_sec: 60, ..Config::default() };
        let adapter = Arc::new(FakeAgentAdapter::new());
        let pool = WorkerPool::new(adapter, "worker-bin", vec![]);
        let ui = Arc::new(FakeUiAdapter::new());
        Supervisor::new(cfg, pool, EventBus::new(256), ui, FakeClock::new())
    }

    #[test]
    fn poll_timeout_is_short_while_the_owner_is_active_and_long_otherwise() {
        let dir = tempfile::tempdir().unwrap();
        let mut supervisor = test_supervisor(dir.path());

        assert_eq!(poll_timeout(&supervisor), Duration::from_secs(5));

        supervisor.state.last_owner_message_at = Some(supervisor.clock.epoch_ms());
        assert_eq!(poll_timeout(&supervisor), Duration::from_millis(200));
    }

    #[test]
    fn refresh_status_cache_mirrors_the_live_supervisor_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut supervisor = test_supervisor(dir.path());
        supervisor.state.spent_usd = 1.25;
        supervisor.state.evolution_mode_enabled = true;
        supervisor.queue.enqueue(TaskBuilder::new(TaskType::Chat).build()).unwrap();

        let cache = StatusCache::default();
        refresh_status_cache(&supervisor, &cache);

        let report = cache.status();
        assert_eq!(report.spent_usd, 1.25);
        assert!(report.evolution_mode_enabled);
        assert_eq!(report.pending_tasks, 1);
        assert_eq!(report.running_tasks, 0);
    }
}
