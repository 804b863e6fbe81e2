// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job result payload and the closed error-kind taxonomy (§3.1, §6.2, §7).

use serde::{Deserialize, Serialize};

/// The payload of a `succeed(taskToken, outputJson)` orchestrator callback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub success: bool,
    pub summary: String,
    #[serde(default)]
    pub files_changed: Vec<String>,
    pub build_ok: bool,
    pub publish_ok: bool,
    #[serde(default)]
    pub push_ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_usd: Option<f64>,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interrupted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

/// Closed taxonomy of terminal-failure error codes (§6.2, §7).
///
/// `errorCode` on the `fail` callback is always one of these, never an
/// internal error's `Display` text — free-form detail goes in `causeString`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Preempted,
    ExecSpawn,
    ExecFailed,
    BuildFailed,
    PublishFailed,
    GitFailed,
    Internal,
}

crate::simple_display! {
    ErrorKind {
        Preempted => "PREEMPTED",
        ExecSpawn => "EXEC_SPAWN",
        ExecFailed => "EXEC_FAILED",
        BuildFailed => "BUILD_FAILED",
        PublishFailed => "PUBLISH_FAILED",
        GitFailed => "GIT_FAILED",
        Internal => "INTERNAL",
    }
}

#[cfg(test)]
#[path = "result_tests.rs"]
mod tests;
