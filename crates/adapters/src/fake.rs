// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory fakes for the four adapter boundaries, gated behind
//! `test-support` so `ew-engine`/`ew-worker` can exercise the Job
//! Controller and Tenancy Supervisor end to end without live network
//! access (§8 "End-to-end scenarios").

use std::collections::VecDeque;
use std::path::Path;

use async_trait::async_trait;
use ew_core::{ActiveJobRecord, JobResult, OwnershipRecord, OwnershipStatus, TenantKey, WorkerId};
use ew_wire::CallbackErrorCode;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::active_jobs::{ActiveJobError, ActiveJobStore};
use crate::callback::{CallbackError, OrchestratorCallbackClient};
use crate::claim::{ClaimError, ClaimOutcome, ClaimRegistryClient};
use crate::queue::{QueueClient, QueueError, RawMessage};
use crate::storage::{ObjectStorageSyncer, StorageError, SyncOutcome};

/// Fake claim registry: a single-process map, enough to exercise contended
/// claims, refresh, release, and TTL expiry against a [`ew_core::Clock`].
#[derive(Default)]
pub struct FakeClaimRegistryClient {
    records: Mutex<std::collections::HashMap<String, OwnershipRecord>>,
}

impl FakeClaimRegistryClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, tenant_key: &TenantKey) -> Option<OwnershipRecord> {
        self.records.lock().get(tenant_key.as_str()).cloned()
    }
}

#[async_trait]
impl ClaimRegistryClient for FakeClaimRegistryClient {
    async fn claim(
        &self,
        tenant_key: &TenantKey,
        worker_id: &WorkerId,
        ttl_secs: u64,
    ) -> Result<ClaimOutcome, ClaimError> {
        let mut records = self.records.lock();
        let now_secs = 0;
        if let Some(existing) = records.get(tenant_key.as_str()) {
            if !existing.is_expired(now_secs) {
                return Ok(ClaimOutcome::AlreadyOwned);
            }
        }
        records.insert(
            tenant_key.as_str().to_string(),
            OwnershipRecord::new(tenant_key.clone(), worker_id.clone(), 0, ttl_secs),
        );
        Ok(ClaimOutcome::Claimed)
    }

    async fn refresh(
        &self,
        tenant_key: &TenantKey,
        worker_id: &WorkerId,
        ttl_secs: u64,
    ) -> Result<(), ClaimError> {
        let mut records = self.records.lock();
        if let Some(existing) = records.get(tenant_key.as_str()) {
            if existing.worker_id == *worker_id {
                let refreshed = existing.refreshed(existing.last_activity_ms, ttl_secs);
                records.insert(tenant_key.as_str().to_string(), refreshed);
            }
        }
        Ok(())
    }

    async fn release(&self, tenant_key: &TenantKey, worker_id: &WorkerId) -> Result<(), ClaimError> {
        let mut records = self.records.lock();
        if let Some(existing) = records.get(tenant_key.as_str()) {
            if existing.worker_id == *worker_id {
                records.remove(tenant_key.as_str());
            }
        }
        Ok(())
    }

    async fn lookup(&self, tenant_key: &TenantKey) -> Result<Option<OwnershipRecord>, ClaimError> {
        Ok(self.records.lock().get(tenant_key.as_str()).cloned())
    }
}

/// Fake active-job store: a single-process map keyed by tenant.
#[derive(Default)]
pub struct FakeActiveJobStore {
    records: Mutex<std::collections::HashMap<String, ActiveJobRecord>>,
}

impl FakeActiveJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, tenant_key: &TenantKey) -> Option<ActiveJobRecord> {
        self.records.lock().get(tenant_key.as_str()).cloned()
    }
}

#[async_trait]
impl ActiveJobStore for FakeActiveJobStore {
    async fn create(&self, record: &ActiveJobRecord) -> Result<(), ActiveJobError> {
        self.records.lock().insert(record.tenant_key.as_str().to_string(), record.clone());
        Ok(())
    }

    async fn refresh(&self, tenant_key: &TenantKey, now_ms: u64, ttl_secs: u64) -> Result<(), ActiveJobError> {
        if let Some(existing) = self.records.lock().get_mut(tenant_key.as_str()) {
            *existing = existing.refreshed(now_ms, ttl_secs);
        }
        Ok(())
    }

    async fn delete(&self, tenant_key: &TenantKey) -> Result<(), ActiveJobError> {
        self.records.lock().remove(tenant_key.as_str());
        Ok(())
    }

    async fn lookup(&self, tenant_key: &TenantKey) -> Result<Option<ActiveJobRecord>, ActiveJobError> {
        Ok(self.records.lock().get(tenant_key.as_str()).cloned())
    }
}

/// Fake queue client: one in-memory FIFO `VecDeque` per queue URL.
#[derive(Default)]
pub struct FakeQueueClient {
    queues: Mutex<std::collections::HashMap<String, VecDeque<RawMessage>>>,
}

impl FakeQueueClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, queue_url: &str, receipt_handle: impl Into<String>, body: serde_json::Value) {
        self.queues
            .lock()
            .entry(queue_url.to_string())
            .or_default()
            .push_back(RawMessage { receipt_handle: receipt_handle.into(), body });
    }

    pub fn is_empty(&self, queue_url: &str) -> bool {
        self.queues.lock().get(queue_url).map_or(true, |q| q.is_empty())
    }
}

#[async_trait]
impl QueueClient for FakeQueueClient {
    async fn receive(&self, queue_url: &str, _wait_secs: u64) -> Result<Option<RawMessage>, QueueError> {
        Ok(self.queues.lock().get_mut(queue_url).and_then(|q| q.pop_front()))
    }

    async fn extend_lease(&self, _queue_url: &str, _handle: &str, _seconds: u64) -> Result<(), QueueError> {
        Ok(())
    }

    async fn delete(&self, _queue_url: &str, _handle: &str) -> Result<(), QueueError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallbackCall {
    Heartbeat,
    Succeed(JobResult),
    Fail(CallbackErrorCode, String),
}

/// Fake orchestrator callback client: records every call so tests can
/// assert the "exactly one terminal callback" invariant (§4.3).
#[derive(Default)]
pub struct FakeCallbackClient {
    calls: Mutex<Vec<CallbackCall>>,
}

impl FakeCallbackClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<CallbackCall> {
        self.calls.lock().clone()
    }

    pub fn terminal_call_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, CallbackCall::Succeed(_) | CallbackCall::Fail(_, _)))
            .count()
    }
}

#[async_trait]
impl OrchestratorCallbackClient for FakeCallbackClient {
    async fn heartbeat(&self, _task_token: &ew_core::TaskToken) {
        self.calls.lock().push(CallbackCall::Heartbeat);
    }

    async fn succeed(&self, _task_token: &ew_core::TaskToken, result: &JobResult) -> Result<(), CallbackError> {
        self.calls.lock().push(CallbackCall::Succeed(result.clone()));
        Ok(())
    }

    async fn fail(
        &self,
        _task_token: &ew_core::TaskToken,
        error_code: CallbackErrorCode,
        cause: &str,
    ) -> Result<(), CallbackError> {
        self.calls.lock().push(CallbackCall::Fail(error_code, cause.to_string()));
        Ok(())
    }
}

/// Fake object-storage syncer: counts files under `local_dir` instead of
/// shelling out, and honors cancellation the same way the real syncer does.
#[derive(Default)]
pub struct FakeObjectStorageSyncer {
    pub fail_next: Mutex<bool>,
}

impl FakeObjectStorageSyncer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStorageSyncer for FakeObjectStorageSyncer {
    async fn sync(
        &self,
        local_dir: &Path,
        _bucket: &str,
        _region: &str,
        cancel: CancellationToken,
    ) -> Result<SyncOutcome, StorageError> {
        if *self.fail_next.lock() {
            return Err(StorageError::NonZeroExit(1));
        }
        if cancel.is_cancelled() {
            return Ok(SyncOutcome { uploaded: 0, deleted: 0, completed: false });
        }
        let uploaded = std::fs::read_dir(local_dir).map(|d| d.count() as u64).unwrap_or(0);
        Ok(SyncOutcome { uploaded, deleted: 0, completed: true })
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
