// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn { command: String, #[source] source: std::io::Error },

    #[error("`{command}` timed out after {timeout_secs}s")]
    Timeout { command: String, timeout_secs: u64 },

    #[error("`{command}` failed (exit {code:?}): {stderr}")]
    CommandFailed { command: String, code: Option<i32>, stderr: String },

    #[error("stash pop conflicted on branch {branch}; left stash intact")]
    StashPopConflict { branch: String },

    #[error("safe-push could not converge for branch {branch}: {reason}")]
    PushDidNotConverge { branch: String, reason: String },

    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),
}
