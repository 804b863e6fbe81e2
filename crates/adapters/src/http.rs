// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared HTTP plumbing for the `reqwest`-backed adapters: a client
//! builder and the per-call timeout wrapper required by §5 ("Each [I/O
//! suspension point] is wrapped with a timeout appropriate to its expected
//! latency").

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimeoutError<E: std::error::Error + 'static> {
    #[error("operation timed out")]
    Elapsed,
    #[error(transparent)]
    Inner(#[from] E),
}

/// Run `fut` with a hard deadline, distinguishing timeout from the
/// underlying operation's own error.
pub async fn with_timeout<T, E, F>(duration: Duration, fut: F) -> Result<T, TimeoutError<E>>
where
    F: std::future::Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(inner) => inner.map_err(TimeoutError::Inner),
        Err(_) => Err(TimeoutError::Elapsed),
    }
}

/// Build the shared `reqwest::Client` used by every HTTP-backed adapter.
///
/// A connect timeout is set here; the per-request deadline is layered on
/// top by [`with_timeout`] since it varies by call (§5: claim/refresh 5 s,
/// callback 5 s).
pub fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
