// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Active-Job store (§3.1, §6.3): the second of the two logical tables
//! backing the claim registry's keyed record store, tracking which tenant
//! currently has work in flight. Conditional semantics (create/refresh
//! only on the record-owning worker) are enforced server-side, same as the
//! ownership table (C1).

use std::time::Duration;

use async_trait::async_trait;
use ew_core::{ActiveJobRecord, TaskToken, TenantKey, ThreadId};
use ew_wire::ActiveJobItem;
use thiserror::Error;
use tracing::instrument;

use crate::http::with_timeout;

const ACTIVE_JOB_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ActiveJobError {
    #[error("active-job store request timed out")]
    Timeout,
    #[error("active-job store transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("active-job store returned unexpected status {0}")]
    UnexpectedStatus(u16),
}

#[async_trait]
pub trait ActiveJobStore: Send + Sync {
    /// Created when a work message begins processing (§4.7 "Accept").
    async fn create(&self, record: &ActiveJobRecord) -> Result<(), ActiveJobError>;

    /// Extend the TTL on heartbeat.
    async fn refresh(&self, tenant_key: &TenantKey, now_ms: u64, ttl_secs: u64) -> Result<(), ActiveJobError>;

    /// Deleted on any terminal outcome (success/failure/preempted).
    async fn delete(&self, tenant_key: &TenantKey) -> Result<(), ActiveJobError>;

    /// For the orchestrator's "is there already a job for this tenant?"
    /// check; not used by the owning worker on its own record.
    async fn lookup(&self, tenant_key: &TenantKey) -> Result<Option<ActiveJobRecord>, ActiveJobError>;
}

pub struct HttpActiveJobStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpActiveJobStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { client: crate::http::build_client(), base_url: base_url.into() }
    }

    fn url(&self, tenant_key: &TenantKey, op: &str) -> String {
        format!("{}/active-jobs/{}/{op}", self.base_url, tenant_key.as_str().replace('#', "%23"))
    }
}

#[async_trait]
impl ActiveJobStore for HttpActiveJobStore {
    #[instrument(skip(self, record), fields(tenant_key = %record.tenant_key))]
    async fn create(&self, record: &ActiveJobRecord) -> Result<(), ActiveJobError> {
        let body = ActiveJobItem {
            tenant_key: record.tenant_key.as_str().to_string(),
            message_id: record.message_id.clone(),
            task_token: record.task_token.as_str().to_string(),
            lease_handle: record.lease_handle.clone(),
            thread_id: record.thread_id.clone(),
            worker_id: record.worker_id.clone(),
            started_at: record.started_at_ms,
            ttl_at: record.ttl_at_secs,
        };
        let response = with_timeout(ACTIVE_JOB_TIMEOUT, async {
            self.client.put(self.url(&record.tenant_key, "")).json(&body).send().await
        })
        .await
        .map_err(to_active_job_error)?;
        expect_ok(response)
    }

    #[instrument(skip(self), fields(tenant_key = %tenant_key))]
    async fn refresh(&self, tenant_key: &TenantKey, now_ms: u64, ttl_secs: u64) -> Result<(), ActiveJobError> {
        let body = serde_json::json!({ "nowMs": now_ms, "ttlSecs": ttl_secs });
        let response = with_timeout(ACTIVE_JOB_TIMEOUT, async {
            self.client.post(self.url(tenant_key, "refresh")).json(&body).send().await
        })
        .await
        .map_err(to_active_job_error)?;
        expect_ok(response)
    }

    #[instrument(skip(self), fields(tenant_key = %tenant_key))]
    async fn delete(&self, tenant_key: &TenantKey) -> Result<(), ActiveJobError> {
        let response = with_timeout(ACTIVE_JOB_TIMEOUT, async {
            self.client.delete(self.url(tenant_key, "")).send().await
        })
        .await
        .map_err(to_active_job_error)?;
        expect_ok(response)
    }

    #[instrument(skip(self), fields(tenant_key = %tenant_key))]
    async fn lookup(&self, tenant_key: &TenantKey) -> Result<Option<ActiveJobRecord>, ActiveJobError> {
        let response = with_timeout(ACTIVE_JOB_TIMEOUT, async {
            self.client.get(self.url(tenant_key, "")).send().await
        })
        .await
        .map_err(to_active_job_error)?;

        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ActiveJobError::UnexpectedStatus(response.status().as_u16()));
        }
        let item: ActiveJobItem =
            with_timeout(ACTIVE_JOB_TIMEOUT, async { response.json().await }).await.map_err(to_active_job_error)?;
        Ok(Some(item_to_record(item)))
    }
}

fn expect_ok(response: reqwest::Response) -> Result<(), ActiveJobError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(ActiveJobError::UnexpectedStatus(response.status().as_u16()))
    }
}

fn item_to_record(item: ActiveJobItem) -> ActiveJobRecord {
    ActiveJobRecord {
        tenant_key: TenantKey::from_string(item.tenant_key),
        message_id: item.message_id,
        task_token: TaskToken::from_string(item.task_token),
        lease_handle: item.lease_handle,
        thread_id: ThreadId::from_string(item.thread_id.as_str()),
        worker_id: item.worker_id,
        started_at_ms: item.started_at,
        ttl_at_secs: item.ttl_at,
    }
}

fn to_active_job_error(err: crate::http::TimeoutError<reqwest::Error>) -> ActiveJobError {
    match err {
        crate::http::TimeoutError::Elapsed => ActiveJobError::Timeout,
        crate::http::TimeoutError::Inner(e) => ActiveJobError::Transport(e),
    }
}

#[cfg(test)]
#[path = "active_jobs_tests.rs"]
mod tests;
