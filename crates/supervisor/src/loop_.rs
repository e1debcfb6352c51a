// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! The supervisor tick loop. `Supervisor` owns every piece of mutable
//! state explicitly and is threaded through one call at a time — no
//! module-level globals, so every test gets its own isolated instance.

use crate::bus::EventBus;
use crate::error::RuntimeError;
use crate::pool::WorkerPool;
use crate::retry::Backoff;
use crate::router::{parse_command, BatchWindow, Command, Mailbox, MailboxEntry};
use crate::ui::UiAdapter;
use ouro_adapters::AgentAdapter;
use ouro_core::event::Event;
use ouro_core::queue::TaskQueue;
use ouro_core::task::{Deadlines, ImageRef, Task, TaskId, TaskPayload, TaskStatus, TaskType};
use ouro_core::{Clock, Config, SupervisorState};
use ouro_storage::archive::TaskArchive;
use ouro_storage::ledger::{BudgetLedger, LedgerEntry};
use ouro_storage::store::StateStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

const MAX_CONSECUTIVE_PANICS: u32 = 3;

/// How long the free-path batch window waits for a follow-up owner message
/// before closing and dispatching what it has collected. Owner messages
/// arriving with consecutive gaps under this threshold are treated as one
/// burst rather than separate tasks.
const BATCH_SILENCE: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Continue { sleep: Duration },
    /// Soft restart: caller should exit the process with code 42 so the
    /// launcher re-execs a fresh supervisor.
    Restart { reason: String },
    /// Owner-triggered panic: caller should exit with code 99, no further
    /// restart.
    Panic { reason: String },
}

pub struct Supervisor<A: AgentAdapter, U: UiAdapter, C: Clock> {
    pub cfg: Config,
    pub queue: TaskQueue,
    pub pool: WorkerPool<A>,
    pub bus: EventBus,
    pub state: SupervisorState,
    pub store: StateStore,
    pub ui: Arc<U>,
    pub repo_path: PathBuf,
    pub clock: C,
    mailbox: Mailbox,
    archive: TaskArchive,
    /// The single chat task currently in flight, if any. While set, fresh
    /// owner messages are injected into that task's mailbox instead of
    /// spawning a second concurrent chat task.
    current_chat_task: Option<TaskId>,
    last_evolution_cycle_epoch_ms: u64,
    last_diag_heartbeat_epoch_ms: u64,
    consecutive_panics: u32,
}

impl<A: AgentAdapter, U: UiAdapter + 'static, C: Clock> Supervisor<A, U, C> {
    /// `bus` is constructed by the caller (rather than internally) so a real
    /// `AgentAdapter` can be handed the event sender before the `Supervisor`
    /// itself exists — see `ouro_cli`'s daemon wiring.
    pub fn new(cfg: Config, pool: WorkerPool<A>, bus: EventBus, ui: Arc<U>, clock: C) -> Self {
        let store = StateStore::new(&cfg);
        let mailbox = Mailbox::new(cfg.owner_mailbox_dir());
        let archive = TaskArchive::new(cfg.archive_dir());
        let repo_path = cfg.data_dir.clone();
        Self {
            queue: TaskQueue::new(),
            pool,
            bus,
            state: SupervisorState::default(),
            store,
            ui,
            repo_path,
            clock,
            mailbox,
            archive,
            current_chat_task: None,
            last_evolution_cycle_epoch_ms: 0,
            last_diag_heartbeat_epoch_ms: 0,
            consecutive_panics: 0,
            cfg,
        }
    }

    /// Retrieves a terminal task's result if it has been archived yet —
    /// `None` means it's still pending/running or the id is unknown.
    pub fn get_task_result(&self, task_id: &TaskId) -> Option<Task> {
        self.archive.get(task_id).ok().flatten()
    }

    /// Blocks the calling thread until `task_id` is archived or `timeout`
    /// elapses. Meant for `ouroctl`-style synchronous callers, not the tick
    /// loop itself.
    pub fn wait_for_task(&self, task_id: &TaskId, timeout: Duration) -> Option<Task> {
        self.archive.wait(task_id, timeout, Duration::from_millis(200)).ok().flatten()
    }

    /// Loads persisted state and queue snapshot, requeuing any task the
    /// snapshot thought was still running. Every process boot mints a
    /// fresh `session_id` regardless of what was persisted — the
    /// rest of the snapshot (including `tg_offset`) survives untouched.
    pub fn restore(&mut self) -> Result<(), RuntimeError> {
        let mut state = self.store.load()?;
        state.session_id = format!("ses-{}", nanoid::nanoid!(12));
        self.state = state;
        let snapshot = self.store.load_queue_snapshot()?;
        self.queue = TaskQueue::from_snapshot(snapshot);
        self.queue.auto_resume_after_restart(self.cfg.max_attempts);
        Ok(())
    }

    fn enqueue_owner_text(&mut self, text: String, image: Option<ImageRef>) -> TaskId {
        let payload = TaskPayload { prompt: text, image, options: Default::default() };
        let deadlines = Deadlines::new(self.cfg.soft_timeout_sec, self.cfg.hard_timeout_sec);
        let task = Task::new(TaskType::Chat, payload, deadlines, self.clock.epoch_ms());
        let task_id = task.id.clone();
        let _ = self.queue.enqueue(task);
        task_id
    }

    fn notify(&self, text: impl Into<String>) {
        let ui = self.ui.clone();
        let text = text.into();
        tokio::spawn(async move { ui.notify(&text).await });
    }

    fn record_llm_usage(&mut self, prompt_tokens: u64, completion_tokens: u64, cost_usd: f64) {
        let ledger = BudgetLedger::new(&self.store, &self.cfg);
        let entry = LedgerEntry {
            ts_epoch_ms: self.clock.epoch_ms(),
            model: "unspecified".to_string(),
            prompt_tokens,
            completion_tokens,
            cost_usd,
            api_key_kind: "primary".to_string(),
            model_category: "chat".to_string(),
            task_category: "task".to_string(),
        };
        if let Ok(total) = ledger.record(self.state.spent_usd, entry) {
            self.state.spent_usd = total;
            self.state.spent_calls += 1;
        }
    }

    /// The pre-call refusal half of budget enforcement: a worker already
    /// dispatched can still finish the call that's in flight, but no new
    /// task (and so no new round of LLM calls) is handed out once spend is
    /// already at or past the limit. `record_llm_usage` only ever runs
    /// after a call returns, so it cannot refuse anything by itself —
    /// this is the one place that actually stops a call from starting.
    fn refuse_new_work_if_budget_exhausted(&mut self) -> bool {
        let ledger = BudgetLedger::new(&self.store, &self.cfg);
        if ledger.would_exceed(self.state.spent_usd, 0.0) {
            if !self.state.budget_notified {
                self.state.budget_notified = true;
                self.notify("⚠️ BUDGET_EXHAUSTED: new LLM calls are refused");
            }
            true
        } else {
            self.state.budget_notified = false;
            false
        }
    }

    /// Reacts to a task leaving `running`: writes its terminal record to the
    /// archive (the third bucket every task lands in exactly once), clears
    /// the single-chat-slot tracker, and archives its mailbox once it is the
    /// task that just finished.
    fn on_task_finished(&mut self, task: &Task) {
        if let Err(e) = self.archive.archive(task) {
            tracing::error!(error = %e, task_id = %task.id.as_str(), "failed to archive terminal task");
        }
        if task.task_type == TaskType::Evolution {
            self.last_evolution_cycle_epoch_ms = self.clock.epoch_ms();
            self.state.spent_usd_at_last_evolution = self.state.spent_usd;
        }
        if self.current_chat_task.as_ref() == Some(&task.id) {
            self.current_chat_task = None;
            let _ = self.mailbox.cleanup(&task.id);
        }
    }

    fn apply_event(&mut self, event: Event) -> Option<TickOutcome> {
        match event {
            Event::LlmUsage { prompt_tokens, completion_tokens, cost_usd, .. } => {
                self.record_llm_usage(prompt_tokens, completion_tokens, cost_usd);
                None
            }
            Event::TaskDone { worker_id, .. } => {
                if let Some(task) = self.queue.complete(&worker_id, TaskStatus::Done, None) {
                    self.on_task_finished(&task);
                }
                None
            }
            Event::TaskFailed { worker_id: Some(worker_id), reason, .. } => {
                if let Some(task) = self.queue.complete(&worker_id, TaskStatus::Failed, Some(reason)) {
                    self.on_task_finished(&task);
                }
                None
            }
            Event::OwnerNotify { text, .. } => {
                self.notify(text);
                None
            }
            Event::RestartRequested { reason, .. } => Some(TickOutcome::Restart { reason }),
            _ => None,
        }
    }

    /// Applies a parsed slash command. Returns `Some` when the command
    /// demands the tick loop stop immediately (`/restart`, `/panic`).
    async fn handle_command(&mut self, command: Command) -> Option<TickOutcome> {
        match command {
            Command::Evolve(enabled) => {
                self.state.evolution_mode_enabled = enabled;
                if !enabled {
                    for outcome in self.queue.cancel_by_type(TaskType::Evolution) {
                        if let ouro_core::queue::CancelOutcome::SignalSent { worker_id } = outcome {
                            self.pool.kill_worker(&worker_id, true).await;
                        }
                    }
                }
                None
            }
            Command::Bg(enabled) => {
                self.state.bg_consciousness_enabled = enabled;
                None
            }
            Command::BgStatus => {
                let status = if self.state.bg_consciousness_enabled { "on" } else { "off" };
                self.ui.notify(&format!("background consciousness is {status}")).await;
                None
            }
            Command::Status | Command::Review => {
                // Surfacing these to the owner-facing command surface is
                // `ouro_cli`'s job; the loop only mutates the state flags
                // it directly owns.
                None
            }
            Command::Restart => Some(TickOutcome::Restart { reason: "owner requested restart".to_string() }),
            Command::Panic => {
                // Awaited directly rather than through the fire-and-forget
                // `notify` helper: the owner must see this message before
                // the process exits, unlike routine telemetry notifications.
                self.ui.notify("🛑 panic requested by owner, shutting down workers").await;
                self.pool.kill_workers(true).await;
                Some(TickOutcome::Panic { reason: "owner requested panic".to_string() })
            }
        }
    }

    /// Routes a non-command owner message: injected into the in-flight
    /// chat task's mailbox if one is running; otherwise opens a free-path
    /// batch window, collecting any further owner text that arrives within
    /// `BATCH_SILENCE` of the last one, then dispatches it all as a single
    /// chat task.
    async fn route_owner_text(&mut self, text: String, image: Option<ImageRef>, msg_id: String) -> Option<TickOutcome> {
        match self.current_chat_task.clone() {
            Some(task_id) => {
                let entry = MailboxEntry { msg_id, text, image_ref: image, received_at: self.clock.epoch_ms() };
                let _ = self.mailbox.write(&task_id, &entry);
                None
            }
            None => {
                let mut window = BatchWindow::new();
                window.push(text, image);
                loop {
                    match self.ui.poll(BATCH_SILENCE).await {
                        Some(inbound) => match parse_command(&inbound.text) {
                            Some(command) => {
                                if let Some(outcome) = self.handle_command(command).await {
                                    return Some(outcome);
                                }
                            }
                            None => window.push(inbound.text, inbound.image),
                        },
                        None => break,
                    }
                }
                let (joined, image) = window.finish();
                let task_id = self.enqueue_owner_text(joined, image);
                self.current_chat_task = Some(task_id);
                None
            }
        }
    }

    /// Runs one supervisor tick. `poll_timeout` is the caller's adaptive UI
    /// poll budget (near-zero in active mode, several seconds when idle).
    /// Wraps `tick_inner` so a heartbeat/slow-cycle record is emitted
    /// regardless of which of `tick_inner`'s several return points fires.
    pub async fn tick(&mut self, poll_timeout: Duration) -> Result<TickOutcome, RuntimeError> {
        let tick_started = self.clock.now();
        let result = self.tick_inner(poll_timeout).await;
        self.emit_diagnostics(tick_started);
        result
    }

    /// Emits a `main_loop_heartbeat` record every `diag_heartbeat_sec`, and a
    /// `main_loop_slow_cycle` record whenever a single tick runs longer than
    /// `diag_slow_cycle_sec` — cheap always-on visibility into loop health.
    fn emit_diagnostics(&mut self, tick_started: Instant) {
        let elapsed = self.clock.now().saturating_duration_since(tick_started);
        if elapsed > Duration::from_secs(self.cfg.diag_slow_cycle_sec) {
            tracing::warn!(elapsed_ms = elapsed.as_millis() as u64, threshold_sec = self.cfg.diag_slow_cycle_sec, "main_loop_slow_cycle");
        }

        let now_ms = self.clock.epoch_ms();
        if now_ms.saturating_sub(self.last_diag_heartbeat_epoch_ms) >= self.cfg.diag_heartbeat_sec * 1000 {
            self.last_diag_heartbeat_epoch_ms = now_ms;
            tracing::info!(
                pending = self.queue.pending().len(),
                running = self.queue.running().len(),
                spent_usd = self.state.spent_usd,
                "main_loop_heartbeat"
            );
        }
    }

    async fn tick_inner(&mut self, poll_timeout: Duration) -> Result<TickOutcome, RuntimeError> {
        let _ = self.store.rotate_if_needed(&self.cfg.supervisor_log_path(), 10 * 1024 * 1024);

        for event in self.bus.drain_non_blocking() {
            if let Some(outcome) = self.apply_event(event) {
                return Ok(outcome);
            }
        }

        let now = self.clock.now();
        for timeout_event in self.queue.enforce_timeouts(now) {
            match timeout_event {
                ouro_core::queue::TimeoutEvent::SoftWarning { worker_id, .. } => {
                    tracing::warn!(%worker_id, "task approaching soft deadline");
                }
                ouro_core::queue::TimeoutEvent::HardKill { worker_id, task_id } => {
                    self.pool.kill_worker(&worker_id, true).await;
                    if let Some(task) = self.queue.complete(&worker_id, TaskStatus::TimedOut, Some("hard deadline exceeded".to_string())) {
                        self.on_task_finished(&task);
                    }
                    self.notify(format!("⚠️ task {} timed out", task_id.as_str()));
                }
            }
        }

        self.queue.enqueue_evolution_if_needed(&self.state, &self.cfg, self.clock.epoch_ms(), self.last_evolution_cycle_epoch_ms);

        self.pool.ensure_workers_healthy(now, Duration::from_secs(self.cfg.hard_timeout_sec)).await;
        self.pool.spawn_workers(self.cfg.max_workers, now).await;
        if !self.refuse_new_work_if_budget_exhausted() {
            self.pool.assign_tasks(&mut self.queue, now).await;
        }

        self.store.save_queue_snapshot(&self.queue.snapshot())?;
        self.store.save(&self.state)?;

        if let Some(inbound) = self.ui.poll(poll_timeout).await {
            self.state.record_owner_message(self.clock.epoch_ms());
            match parse_command(&inbound.text) {
                Some(command) => {
                    if let Some(outcome) = self.handle_command(command).await {
                        return Ok(outcome);
                    }
                }
                None => {
                    if let Some(outcome) = self.route_owner_text(inbound.text, inbound.image, inbound.msg_id).await {
                        return Ok(outcome);
                    }
                }
            }
        }

        let active = self.state.is_active(self.clock.epoch_ms(), self.cfg.active_window_sec * 1000);
        let sleep = if active { Duration::from_millis(100) } else { Duration::from_millis(500) };
        Ok(TickOutcome::Continue { sleep })
    }

    /// Retries a failing `tick()` with bounded exponential backoff; three
    /// consecutive failures trigger a restart request rather than looping
    /// forever against whatever is broken.
    pub async fn tick_with_backoff(&mut self, poll_timeout: Duration) -> Result<TickOutcome, RuntimeError> {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(5), MAX_CONSECUTIVE_PANICS);
        loop {
            match self.tick(poll_timeout).await {
                Ok(outcome) => {
                    self.consecutive_panics = 0;
                    return Ok(outcome);
                }
                Err(e) => {
                    self.consecutive_panics += 1;
                    tracing::error!(error = %e, attempt = self.consecutive_panics, "tick failed");
                    match backoff.next_delay() {
                        Some(delay) => tokio::time::sleep(delay).await,
                        None => return Err(RuntimeError::RepeatedPanic(self.consecutive_panics)),
                    }
                }
            }
        }
    }
}
