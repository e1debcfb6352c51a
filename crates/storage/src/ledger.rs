// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! Append-only budget ledger — one [`LedgerEntry`] per LLM call, backing the
//! `0 <= spent_usd <= budget_limit` invariant on [`ouro_core::SupervisorState`].

use crate::error::StorageError;
use crate::store::StateStore;
use ouro_core::Config;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub ts_epoch_ms: u64,
    pub model: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cost_usd: f64,
    pub api_key_kind: String,
    pub model_category: String,
    pub task_category: String,
}

pub struct BudgetLedger<'a> {
    store: &'a StateStore,
    cfg: &'a Config,
}

impl<'a> BudgetLedger<'a> {
    pub fn new(store: &'a StateStore, cfg: &'a Config) -> Self {
        Self { store, cfg }
    }

    /// Would recording `cost_usd` more spend push the running total past the
    /// configured budget? Callers must check this before making the LLM
    /// call that would produce the entry, since the entry itself is only
    /// ever additive (no refunds).
    pub fn would_exceed(&self, spent_so_far: f64, cost_usd: f64) -> bool {
        spent_so_far + cost_usd > self.cfg.total_budget_usd
    }

    /// Appends one entry to the on-disk ledger. Returns the new running
    /// total — the true additive sum, never clamped to the budget — so that
    /// `spent_usd_after == spent_usd_before + cost_usd` always holds; callers
    /// persist it onto `SupervisorState::spent_usd` themselves so the two
    /// stay in the same snapshot-write transaction. Refusing a call that
    /// would exceed budget is `would_exceed`'s job, checked before this is
    /// ever reached.
    pub fn record(&self, spent_so_far: f64, entry: LedgerEntry) -> Result<f64, StorageError> {
        let new_total = spent_so_far + entry.cost_usd;
        self.store.append_jsonl(&self.cfg.events_log_path(), &entry)?;
        Ok(new_total)
    }

    pub fn read_all(&self) -> Result<Vec<LedgerEntry>, StorageError> {
        self.store.read_jsonl(&self.cfg.events_log_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entry(cost: f64) -> LedgerEntry {
        LedgerEntry {
            ts_epoch_ms: 0,
            model: "fake-model".to_string(),
            prompt_tokens: 10,
            completion_tokens: 5,
            cost_usd: cost,
            api_key_kind: "primary".to_string(),
            model_category: "chat".to_string(),
            task_category: "task".to_string(),
        }
    }

    #[test]
    fn would_exceed_flags_calls_that_push_past_the_limit() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config { data_dir: dir.path().to_path_buf(), total_budget_usd: 10.0, ..Config::default() };
        let store = StateStore::new(&cfg);
        let ledger = BudgetLedger::new(&store, &cfg);
        assert!(!ledger.would_exceed(8.0, 1.5));
        assert!(ledger.would_exceed(8.0, 3.0));
    }

    #[test]
    fn record_returns_the_true_additive_total_unclamped() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config { data_dir: dir.path().to_path_buf(), total_budget_usd: 10.0, ..Config::default() };
        let store = StateStore::new(&cfg);
        let ledger = BudgetLedger::new(&store, &cfg);
        let total = ledger.record(9.0, entry(5.0)).unwrap();
        assert_eq!(total, 14.0);
        assert_eq!(ledger.read_all().unwrap().len(), 1);
    }

    proptest! {
        /// The running total `record` hands back is always exactly
        /// `spent_before + cost`, monotonically non-decreasing along a
        /// sequence of non-negative costs — budget enforcement is
        /// `would_exceed`'s job, not `record`'s.
        #[test]
        fn record_returns_the_exact_additive_sum_and_never_decreases(
            budget in 1.0..1000.0f64,
            costs in prop::collection::vec(0.0..50.0f64, 0..20),
        ) {
            let dir = tempfile::tempdir().unwrap();
            let cfg = Config { data_dir: dir.path().to_path_buf(), total_budget_usd: budget, ..Config::default() };
            let store = StateStore::new(&cfg);
            let ledger = BudgetLedger::new(&store, &cfg);

            let mut total = 0.0;
            for cost in costs {
                let next = ledger.record(total, entry(cost)).unwrap();
                prop_assert!(next >= total);
                prop_assert!((next - (total + cost)).abs() < 1e-9);
                total = next;
            }
        }
    }
}
