// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator Callback Client (C3, §4.3, §6.2).

use std::time::Duration;

use async_trait::async_trait;
use ew_core::{JobResult, TaskToken};
use ew_wire::{CallbackErrorCode, FailRequest, HeartbeatRequest, SucceedRequest};
use thiserror::Error;
use tracing::{instrument, warn};

use crate::http::with_timeout;

const CALLBACK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("callback request timed out")]
    Timeout,
    #[error("callback transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("callback returned unexpected status {0}")]
    UnexpectedStatus(u16),
    #[error("job result failed to serialize: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[async_trait]
pub trait OrchestratorCallbackClient: Send + Sync {
    /// Sent every `heartbeatIntervalSecs` while a job is in-flight (§4.3).
    /// A transport failure here is logged, never surfaced — "the
    /// orchestrator will time out and reconcile".
    async fn heartbeat(&self, task_token: &TaskToken);

    /// Terminal success. Callers must ensure this is emitted at most once
    /// per job (§4.3 invariant, enforced by the Job Controller, not here).
    async fn succeed(&self, task_token: &TaskToken, result: &JobResult) -> Result<(), CallbackError>;

    /// Terminal failure with a closed-taxonomy error code (§7).
    async fn fail(
        &self,
        task_token: &TaskToken,
        error_code: CallbackErrorCode,
        cause: &str,
    ) -> Result<(), CallbackError>;
}

pub struct HttpCallbackClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCallbackClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { client: crate::http::build_client(), base_url: base_url.into() }
    }

    fn url(&self, op: &str) -> String {
        format!("{}/tasks/{op}", self.base_url)
    }
}

#[async_trait]
impl OrchestratorCallbackClient for HttpCallbackClient {
    #[instrument(skip(self), fields(task_token = %task_token))]
    async fn heartbeat(&self, task_token: &TaskToken) {
        let body = HeartbeatRequest { task_token: task_token.clone() };
        let sent = with_timeout(CALLBACK_TIMEOUT, async {
            self.client.post(self.url("heartbeat")).json(&body).send().await
        })
        .await;
        if let Err(err) = sent {
            warn!(%err, "heartbeat callback failed, orchestrator will reconcile on timeout");
        }
    }

    #[instrument(skip(self, result), fields(task_token = %task_token))]
    async fn succeed(&self, task_token: &TaskToken, result: &JobResult) -> Result<(), CallbackError> {
        let output_json = serde_json::to_string(result)?;
        let body = SucceedRequest { task_token: task_token.clone(), output_json };
        let response = with_timeout(CALLBACK_TIMEOUT, async {
            self.client.post(self.url("succeed")).json(&body).send().await
        })
        .await
        .map_err(to_callback_error)?;
        expect_ok(response)
    }

    #[instrument(skip(self), fields(task_token = %task_token, %error_code))]
    async fn fail(
        &self,
        task_token: &TaskToken,
        error_code: CallbackErrorCode,
        cause: &str,
    ) -> Result<(), CallbackError> {
        let body = FailRequest::new(task_token.clone(), error_code, cause)
            .unwrap_or_else(|_| FailRequest {
                task_token: task_token.clone(),
                error_code,
                cause: cause.chars().take(32 * 1024).collect(),
            });
        let response = with_timeout(CALLBACK_TIMEOUT, async {
            self.client.post(self.url("fail")).json(&body).send().await
        })
        .await
        .map_err(to_callback_error)?;
        expect_ok(response)
    }
}

fn expect_ok(response: reqwest::Response) -> Result<(), CallbackError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(CallbackError::UnexpectedStatus(response.status().as_u16()))
    }
}

fn to_callback_error(err: crate::http::TimeoutError<reqwest::Error>) -> CallbackError {
    match err {
        crate::http::TimeoutError::Elapsed => CallbackError::Timeout,
        crate::http::TimeoutError::Inner(e) => CallbackError::Transport(e),
    }
}

#[cfg(test)]
#[path = "callback_tests.rs"]
mod tests;
