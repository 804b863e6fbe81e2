// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory [`CodeModEngine`] fake, gated behind `test-support`, so the
//! Job Controller's tests (and later `ew-worker`'s) can drive a job through
//! its full lifecycle without shelling out to a real code-mod binary.

use std::path::Path;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::codemod::{CodeModEngine, CodeModOutcome};
use crate::error::CodeModError;

#[derive(Debug, Clone)]
pub enum FakeCodeModResult {
    Success(CodeModOutcome),
    Interrupted,
    ExecFailed(Option<i32>),
}

impl Default for FakeCodeModResult {
    fn default() -> Self {
        Self::Success(CodeModOutcome::default())
    }
}

#[derive(Default)]
pub struct FakeCodeModEngine {
    result: Mutex<FakeCodeModResult>,
    instructions: Mutex<Vec<String>>,
}

impl FakeCodeModEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_result(&self, result: FakeCodeModResult) {
        *self.result.lock() = result;
    }

    pub fn instructions_seen(&self) -> Vec<String> {
        self.instructions.lock().clone()
    }
}

#[async_trait]
impl CodeModEngine for FakeCodeModEngine {
    async fn run(
        &self,
        _workdir: &Path,
        instruction: &str,
        cancel: CancellationToken,
    ) -> Result<CodeModOutcome, CodeModError> {
        self.instructions.lock().push(instruction.to_string());
        if cancel.is_cancelled() {
            return Err(CodeModError::Interrupted);
        }
        match self.result.lock().clone() {
            FakeCodeModResult::Success(outcome) => Ok(outcome),
            FakeCodeModResult::Interrupted => Err(CodeModError::Interrupted),
            FakeCodeModResult::ExecFailed(code) => Err(CodeModError::ExecFailed(code)),
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
