// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator callback RPC payloads, keyed by opaque `taskToken` (§4.3,
//! §6.2).

use ew_core::{ErrorKind, TaskToken};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `causeString` is capped at 32 KiB per §6.2.
const MAX_CAUSE_BYTES: usize = 32 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CallbackPayloadError {
    #[error("causeString exceeds {MAX_CAUSE_BYTES} bytes ({0} given)")]
    CauseTooLong(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    pub task_token: TaskToken,
}

/// `succeed(taskToken, outputJson)` — `output_json` is the already-encoded
/// Job Result (§3.1), kept as a raw string so this crate never needs to
/// know `JobResult`'s shape beyond what `ew_core` already defines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SucceedRequest {
    pub task_token: TaskToken,
    pub output_json: String,
}

/// `fail(taskToken, errorCode, causeString)`. `error_code` is the closed
/// taxonomy from §7/§6.2; free-form detail lives only in `cause`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailRequest {
    pub task_token: TaskToken,
    pub error_code: CallbackErrorCode,
    pub cause: String,
}

impl FailRequest {
    pub fn new(
        task_token: TaskToken,
        error_code: CallbackErrorCode,
        cause: impl Into<String>,
    ) -> Result<Self, CallbackPayloadError> {
        let cause = cause.into();
        if cause.len() > MAX_CAUSE_BYTES {
            return Err(CallbackPayloadError::CauseTooLong(cause.len()));
        }
        Ok(Self { task_token, error_code, cause })
    }
}

/// Wire alias for [`ew_core::ErrorKind`] — the `errorCode` enum is the same
/// closed taxonomy, just re-exported under the wire crate's naming so
/// callers don't need to reach into `ew_core` for callback construction.
pub type CallbackErrorCode = ErrorKind;

#[cfg(test)]
#[path = "callback_tests.rs"]
mod tests;
