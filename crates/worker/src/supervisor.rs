// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tenancy Supervisor (C8, §4.8): the top-level loop each worker process
//! runs for its whole lifetime — claim a tenant off the unclaimed queue,
//! run its owned loop for as long as the claim holds, release, repeat.

use std::time::Duration;

use ew_adapters::{
    ActiveJobStore, ClaimOutcome, ClaimRegistryClient, ObjectStorageSyncer, OrchestratorCallbackClient, QueueClient,
};
use ew_core::{preempt_queue_url, tenant_key, BackoffPolicy, Clock, TenantKey, WorkerId};
use ew_engine::Metrics;
use ew_git::WorkspaceManager;
use ew_wire::ClaimRequestMessage;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::owned_loop::{self, OwnedLoopHandles};

/// Everything the supervisor needs to know that isn't already carried by
/// [`OwnedLoopHandles`] — cadence knobs plus the collaborators that are
/// only ever touched by the top loop, not the owned loop itself.
pub struct SupervisorConfig {
    pub unclaimed_queue_url: String,
    pub region: String,
    pub account_id: String,
    pub claim_ttl_secs: u64,
    pub refresh_interval: Duration,
    pub idle_timeout: Duration,
    pub work_poll_wait_secs: u64,
    pub preempt_poll_wait_secs: u64,
    pub claim_poll_wait_secs: u64,
}

struct ClaimedTenant {
    tenant_key: TenantKey,
    work_queue_url: String,
    preempt_queue_url: String,
}

#[allow(clippy::too_many_arguments)]
pub struct TenancySupervisor<Q, CB, J, G, E, P, CL, C>
where
    Q: QueueClient + 'static,
    CB: OrchestratorCallbackClient + 'static,
    J: ActiveJobStore + 'static,
    G: WorkspaceManager + 'static,
    E: ew_engine::CodeModEngine + 'static,
    P: ObjectStorageSyncer + 'static,
    CL: Clock,
    C: ClaimRegistryClient + 'static,
{
    handles: OwnedLoopHandles<Q, CB, J, G, E, P, CL, C>,
    worker_id: WorkerId,
    config: SupervisorConfig,
    metrics: Arc<Metrics>,
}

impl<Q, CB, J, G, E, P, CL, C> TenancySupervisor<Q, CB, J, G, E, P, CL, C>
where
    Q: QueueClient + 'static,
    CB: OrchestratorCallbackClient + 'static,
    J: ActiveJobStore + 'static,
    G: WorkspaceManager + 'static,
    E: ew_engine::CodeModEngine + 'static,
    P: ObjectStorageSyncer + 'static,
    CL: Clock,
    C: ClaimRegistryClient + 'static,
{
    pub fn new(
        handles: OwnedLoopHandles<Q, CB, J, G, E, P, CL, C>,
        worker_id: WorkerId,
        config: SupervisorConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self { handles, worker_id, config, metrics }
    }

    /// The top loop itself (§4.8): `loop forever: tenantKey ←
    /// tryClaimFromUnclaimedQueue(); if nil continue; run owned loop;
    /// release(tenantKey) // best effort`. Returns once `shutdown` fires.
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, shutdown: CancellationToken) {
        loop {
            if shutdown.is_cancelled() {
                return;
            }
            let Some(claimed) = self.try_claim(&shutdown).await else {
                continue;
            };
            info!(tenant_key = %claimed.tenant_key, "claimed tenant, starting owned loop");

            owned_loop::run(
                &self.handles,
                claimed.tenant_key.clone(),
                self.worker_id.clone(),
                claimed.work_queue_url,
                claimed.preempt_queue_url,
                self.config.work_poll_wait_secs,
                self.config.preempt_poll_wait_secs,
                self.config.refresh_interval,
                self.config.claim_ttl_secs,
                self.config.idle_timeout,
                shutdown.clone(),
            )
            .await;

            if let Err(err) = self.handles.claim.release(&claimed.tenant_key, &self.worker_id).await {
                warn!(%err, tenant_key = %claimed.tenant_key, "best-effort claim release failed");
            }
        }
    }

    /// §4.8.1: long-poll the unclaimed queue for `CLAIM_REQUEST` messages.
    /// On receipt, attempt the claim; only delete the message once the
    /// claim succeeds — a contended claim leaves the message in place so
    /// the queue's visibility timeout redelivers it to whichever worker
    /// eventually wins.
    async fn try_claim(&self, shutdown: &CancellationToken) -> Option<ClaimedTenant> {
        let backoff = BackoffPolicy::default();
        let mut attempt: u32 = 0;
        loop {
            let received = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return None,
                result = self
                    .handles
                    .queue
                    .receive(&self.config.unclaimed_queue_url, self.config.claim_poll_wait_secs) => result,
            };
            let raw = match received {
                Ok(Some(raw)) => {
                    attempt = 0;
                    raw
                }
                Ok(None) => {
                    attempt = 0;
                    continue;
                }
                Err(err) => {
                    warn!(%err, "unclaimed queue receive failed");
                    attempt += 1;
                    tokio::time::sleep(backoff.delay(attempt)).await;
                    continue;
                }
            };

            let request: ClaimRequestMessage = match serde_json::from_value(raw.body.clone()) {
                Ok(request) if request.is_claim_request() => request,
                Ok(_) => {
                    warn!("unclaimed queue message was not a CLAIM_REQUEST, dropping");
                    self.delete_unclaimed(&raw.receipt_handle).await;
                    continue;
                }
                Err(err) => {
                    warn!(%err, "malformed claim request, dropping");
                    self.delete_unclaimed(&raw.receipt_handle).await;
                    continue;
                }
            };

            let tenant = tenant_key(&request.project_id, &request.user_id);
            match self.handles.claim.claim(&tenant, &self.worker_id, self.config.claim_ttl_secs).await {
                Ok(ClaimOutcome::Claimed) => {
                    self.delete_unclaimed(&raw.receipt_handle).await;
                    self.metrics.claim_won();
                    let preempt_url =
                        preempt_queue_url(&self.config.region, &self.config.account_id, &request.project_id, &request.user_id);
                    return Some(ClaimedTenant {
                        tenant_key: tenant,
                        work_queue_url: request.queue_url,
                        preempt_queue_url: preempt_url,
                    });
                }
                Ok(ClaimOutcome::AlreadyOwned) => {
                    attempt = 0;
                    self.metrics.claim_lost();
                    continue;
                }
                Err(err) => {
                    warn!(%err, tenant_key = %tenant, "claim attempt failed");
                    attempt += 1;
                    tokio::time::sleep(backoff.delay(attempt)).await;
                    continue;
                }
            }
        }
    }

    async fn delete_unclaimed(&self, receipt_handle: &str) {
        if let Err(err) = self.handles.queue.delete(&self.config.unclaimed_queue_url, receipt_handle).await {
            warn!(%err, "failed to delete unclaimed-queue message");
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
