// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! Git operations on the supervisor's own working tree. Out-of-process
//! `git` invocations only — no `libgit2`-style binding, matching the
//! subprocess-driven tooling this is grounded on.

pub mod commit;
pub mod error;
pub mod protect;

pub use commit::{checkout_and_reset, commit as commit_scope, ensure_repo_present, rollback_to, safe_restart, CommitOutcome, CommitScope, RestartOutcome, UnsyncedPolicy};
pub use error::GitOpsError;
pub use protect::{check_delete, sync_protected_files};
