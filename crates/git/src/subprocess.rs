// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timeout-wrapped subprocess execution, shared by every Git operation in
//! [`crate::manager`]. Every suspension point gets a deadline appropriate
//! to its expected latency (§5): clone gets the longest allowance, status
//! checks the shortest.

use std::time::Duration;

use tokio::process::Command;

use crate::error::GitError;

pub const CLONE_TIMEOUT: Duration = Duration::from_secs(120);
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(60);
pub const SHORT_TIMEOUT: Duration = Duration::from_secs(15);
pub const PUSH_TIMEOUT: Duration = Duration::from_secs(30);

/// Run `cmd` to completion, enforcing `timeout`. `label` is used only for
/// error messages and tracing, not for building the command itself.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    label: &str,
) -> Result<std::process::Output, GitError> {
    let spawn_result = cmd.output();
    match tokio::time::timeout(timeout, spawn_result).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(source)) => Err(GitError::Spawn { command: label.to_string(), source }),
        Err(_) => Err(GitError::Timeout { command: label.to_string(), timeout_secs: timeout.as_secs() }),
    }
}

/// Run `cmd` and turn a non-zero exit into [`GitError::CommandFailed`].
pub async fn run_checked(cmd: Command, timeout: Duration, label: &str) -> Result<std::process::Output, GitError> {
    let output = run_with_timeout(cmd, timeout, label).await?;
    if output.status.success() {
        Ok(output)
    } else {
        Err(GitError::CommandFailed {
            command: label.to_string(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
