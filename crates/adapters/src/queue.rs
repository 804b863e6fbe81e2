// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue Client (C2, §4.2, §6.1): long-polled receive, lease extension, and
//! delete against any of the three logical queues (unclaimed, per-tenant
//! work, per-tenant preempt).

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::instrument;

use crate::http::with_timeout;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueName {
    Unclaimed,
    Work,
    Preempt,
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue request timed out")]
    Timeout,
    #[error("queue transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("queue returned unexpected status {0}")]
    UnexpectedStatus(u16),
}

/// A single queue receive result, still as an opaque JSON body — callers
/// know whether to parse it as a `ClaimRequestMessage`, `WorkQueueMessage`,
/// or `PreemptQueueMessage` depending on which queue they polled.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub receipt_handle: String,
    pub body: serde_json::Value,
}

#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Long-poll `queue_url` for up to `wait_secs`. Returns at most one
    /// message (§4.2 table: batch size 1 for both work and preempt).
    async fn receive(&self, queue_url: &str, wait_secs: u64) -> Result<Option<RawMessage>, QueueError>;

    /// Reset `handle`'s invisibility window to `seconds` from now.
    async fn extend_lease(&self, queue_url: &str, handle: &str, seconds: u64) -> Result<(), QueueError>;

    /// Remove the message after terminal handling (also used to unblock a
    /// FIFO partition after preemption, §4.2).
    async fn delete(&self, queue_url: &str, handle: &str) -> Result<(), QueueError>;
}

pub struct HttpQueueClient {
    client: reqwest::Client,
}

impl HttpQueueClient {
    pub fn new() -> Self {
        Self { client: crate::http::build_client() }
    }
}

impl Default for HttpQueueClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueClient for HttpQueueClient {
    #[instrument(skip(self), fields(queue_url = %queue_url, wait_secs))]
    async fn receive(&self, queue_url: &str, wait_secs: u64) -> Result<Option<RawMessage>, QueueError> {
        // Long-poll deadline is the provider's wait time plus a 5 s margin
        // for request/response overhead (§5).
        let deadline = Duration::from_secs(wait_secs + 5);
        let response = with_timeout(deadline, async {
            self.client
                .get(queue_url)
                .query(&[("waitSecs", wait_secs.to_string()), ("maxMessages", "1".to_string())])
                .send()
                .await
        })
        .await
        .map_err(to_queue_error)?;

        if response.status().as_u16() == 204 {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(QueueError::UnexpectedStatus(response.status().as_u16()));
        }

        #[derive(serde::Deserialize)]
        struct Envelope {
            #[serde(rename = "receiptHandle")]
            receipt_handle: String,
            body: serde_json::Value,
        }
        let envelopes: Vec<Envelope> =
            with_timeout(Duration::from_secs(5), async { response.json().await })
                .await
                .map_err(to_queue_error)?;

        Ok(envelopes.into_iter().next().map(|e| RawMessage { receipt_handle: e.receipt_handle, body: e.body }))
    }

    #[instrument(skip(self), fields(queue_url = %queue_url))]
    async fn extend_lease(&self, queue_url: &str, handle: &str, seconds: u64) -> Result<(), QueueError> {
        let body = serde_json::json!({ "receiptHandle": handle, "visibilityTimeoutSecs": seconds });
        let response = with_timeout(Duration::from_secs(5), async {
            self.client.post(format!("{queue_url}/visibility")).json(&body).send().await
        })
        .await
        .map_err(to_queue_error)?;
        expect_ok(response)
    }

    #[instrument(skip(self), fields(queue_url = %queue_url))]
    async fn delete(&self, queue_url: &str, handle: &str) -> Result<(), QueueError> {
        let body = serde_json::json!({ "receiptHandle": handle });
        let response = with_timeout(Duration::from_secs(5), async {
            self.client.post(format!("{queue_url}/delete")).json(&body).send().await
        })
        .await
        .map_err(to_queue_error)?;
        expect_ok(response)
    }
}

fn expect_ok(response: reqwest::Response) -> Result<(), QueueError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(QueueError::UnexpectedStatus(response.status().as_u16()))
    }
}

fn to_queue_error(err: crate::http::TimeoutError<reqwest::Error>) -> QueueError {
    match err {
        crate::http::TimeoutError::Elapsed => QueueError::Timeout,
        crate::http::TimeoutError::Inner(e) => QueueError::Transport(e),
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
