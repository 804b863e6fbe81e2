// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Owned Loop (§4.8.2): the three concurrent activities a worker runs while
//! it holds a tenant's claim — the work poller, the preempt poller, and the
//! idle/TTL refresher — plus the shared state they coordinate through (a
//! preempt slot, a `lastWorkActivity` timestamp, and a termination signal).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ew_adapters::{ActiveJobStore, ClaimRegistryClient, ObjectStorageSyncer, OrchestratorCallbackClient, QueueClient};
use ew_core::{BackoffPolicy, Clock, TenantKey, WorkerId};
use ew_engine::{JobController, JobOutcome, PreemptHandle};
use ew_git::WorkspaceManager;
use ew_wire::{PreemptQueueMessage, QueuedMessage, WorkQueueMessage};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Idle check cadence is fixed at 60 s (§4.8.2(c)); only the idle threshold
/// itself and the refresh cadence are configurable.
const IDLE_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Single-producer/single-consumer-ish preempt signal shared between the
/// preempt poller and the work poller (§5 "Concurrency contract"). Wraps a
/// [`PreemptHandle`] so triggering it before a job is accepted still reaches
/// that job once it starts (the "idle tiebreak", §4.8.2 "Concurrency
/// contract").
#[derive(Clone)]
pub(crate) struct PreemptSlot(Arc<Mutex<PreemptHandle>>);

impl PreemptSlot {
    pub(crate) fn new() -> Self {
        Self(Arc::new(Mutex::new(PreemptHandle::new())))
    }

    pub(crate) fn trigger(&self, reason: impl Into<String>) {
        self.0.lock().trigger_with_reason(reason);
    }

    fn current(&self) -> PreemptHandle {
        self.0.lock().clone()
    }

    fn reset(&self) {
        *self.0.lock() = PreemptHandle::new();
    }
}

pub struct OwnedLoopHandles<Q, CB, J, G, E, P, CL, C>
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
    pub queue: Arc<Q>,
    pub claim: Arc<C>,
    pub controller: Arc<JobController<Q, CB, J, G, E, P, CL>>,
    pub clock: CL,
}

#[allow(clippy::too_many_arguments)]
#[instrument(skip_all, fields(tenant_key = %tenant_key))]
pub(crate) async fn run<Q, CB, J, G, E, P, CL, C>(
    handles: &OwnedLoopHandles<Q, CB, J, G, E, P, CL, C>,
    tenant_key: TenantKey,
    worker_id: WorkerId,
    work_queue_url: String,
    preempt_queue_url: String,
    work_poll_wait_secs: u64,
    preempt_poll_wait_secs: u64,
    refresh_interval: Duration,
    claim_ttl_secs: u64,
    idle_timeout: Duration,
    shutdown: CancellationToken,
) where
    Q: QueueClient + 'static,
    CB: OrchestratorCallbackClient + 'static,
    J: ActiveJobStore + 'static,
    G: WorkspaceManager + 'static,
    E: ew_engine::CodeModEngine + 'static,
    P: ObjectStorageSyncer + 'static,
    CL: Clock,
    C: ClaimRegistryClient + 'static,
{
    let loop_done = shutdown.child_token();
    let slot = PreemptSlot::new();
    let last_activity = Arc::new(AtomicU64::new(handles.clock.epoch_ms()));

    let work_task = tokio::spawn(work_poller(
        Arc::clone(&handles.queue),
        Arc::clone(&handles.controller),
        work_queue_url,
        work_poll_wait_secs,
        slot.clone(),
        Arc::clone(&last_activity),
        handles.clock.clone(),
        loop_done.clone(),
    ));

    let preempt_task = tokio::spawn(preempt_poller(
        Arc::clone(&handles.queue),
        preempt_queue_url,
        preempt_poll_wait_secs,
        slot.clone(),
        loop_done.clone(),
    ));

    let refresher_task = tokio::spawn(idle_and_ttl_refresher(
        Arc::clone(&handles.claim),
        tenant_key,
        worker_id,
        claim_ttl_secs,
        refresh_interval,
        idle_timeout,
        Arc::clone(&last_activity),
        handles.clock.clone(),
        loop_done.clone(),
    ));

    let shutdown_task = tokio::spawn(shutdown_watcher(shutdown, slot));

    loop_done.cancelled().await;

    work_task.abort();
    preempt_task.abort();
    refresher_task.abort();
    shutdown_task.abort();
}

/// (a) Work poller (§4.8.2): long-poll the tenant work queue, hand messages
/// to the Job Controller synchronously (one job at a time per tenant), and
/// end the owned loop the moment a job comes back preempted.
#[allow(clippy::too_many_arguments)]
async fn work_poller<Q, CB, J, G, E, P, CL>(
    queue: Arc<Q>,
    controller: Arc<JobController<Q, CB, J, G, E, P, CL>>,
    work_queue_url: String,
    wait_secs: u64,
    slot: PreemptSlot,
    last_activity: Arc<AtomicU64>,
    clock: CL,
    loop_done: CancellationToken,
) where
    Q: QueueClient + 'static,
    CB: OrchestratorCallbackClient + 'static,
    J: ActiveJobStore + 'static,
    G: WorkspaceManager + 'static,
    E: ew_engine::CodeModEngine + 'static,
    P: ObjectStorageSyncer + 'static,
    CL: Clock,
{
    let backoff = BackoffPolicy::default();
    let mut attempt: u32 = 0;
    loop {
        let received = tokio::select! {
            biased;
            _ = loop_done.cancelled() => break,
            result = queue.receive(&work_queue_url, wait_secs) => result,
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
                warn!(%err, "work queue receive failed");
                attempt += 1;
                tokio::time::sleep(backoff.delay(attempt)).await;
                continue;
            }
        };
        let body: WorkQueueMessage = match serde_json::from_value(raw.body.clone()) {
            Ok(body) => body,
            Err(err) => {
                warn!(%err, "malformed work message, dropping");
                if let Err(err) = queue.delete(&work_queue_url, &raw.receipt_handle).await {
                    warn!(%err, "failed to delete malformed work message");
                }
                continue;
            }
        };
        let message = QueuedMessage { receipt_handle: raw.receipt_handle, body }.into_domain();

        last_activity.store(clock.epoch_ms(), Ordering::Relaxed);
        let handle = slot.current();
        let outcome = controller.run_job(&work_queue_url, message, handle).await;
        last_activity.store(clock.epoch_ms(), Ordering::Relaxed);

        if matches!(outcome, JobOutcome::Preempted) {
            info!("job preempted, ending owned loop");
            loop_done.cancel();
        }
        slot.reset();
    }
}

/// (b) Preempt poller (§4.8.2): short-poll the tenant preempt queue. On
/// receipt, record the preempt against the shared slot, delete the message,
/// and stop polling — "releasing ownership is a consequence of preempt".
async fn preempt_poller<Q: QueueClient + 'static>(
    queue: Arc<Q>,
    preempt_queue_url: String,
    wait_secs: u64,
    slot: PreemptSlot,
    loop_done: CancellationToken,
) {
    let backoff = BackoffPolicy::default();
    let mut attempt: u32 = 0;
    loop {
        let received = tokio::select! {
            biased;
            _ = loop_done.cancelled() => break,
            result = queue.receive(&preempt_queue_url, wait_secs) => result,
        };
        match received {
            Ok(Some(raw)) => {
                let reason = serde_json::from_value::<PreemptQueueMessage>(raw.body.clone())
                    .map(|m| m.reason)
                    .unwrap_or_else(|_| "preempted by newer message".to_string());
                info!(reason = %reason, "preempt received");
                slot.trigger(reason);
                if let Err(err) = queue.delete(&preempt_queue_url, &raw.receipt_handle).await {
                    warn!(%err, "failed to delete preempt message");
                }
                break;
            }
            Ok(None) => {
                attempt = 0;
                continue;
            }
            Err(err) => {
                warn!(%err, "preempt queue receive failed");
                attempt += 1;
                tokio::time::sleep(backoff.delay(attempt)).await;
                continue;
            }
        }
    }
}

/// (c) Idle & TTL refresher (§4.8.2): refresh the claim every
/// `refresh_interval` and, every 60 s, release the owned loop once
/// `lastWorkActivity` has been stale for longer than `idle_timeout`.
#[allow(clippy::too_many_arguments)]
async fn idle_and_ttl_refresher<C: ClaimRegistryClient + 'static, CL: Clock>(
    claim: Arc<C>,
    tenant_key: TenantKey,
    worker_id: WorkerId,
    ttl_secs: u64,
    refresh_interval: Duration,
    idle_timeout: Duration,
    last_activity: Arc<AtomicU64>,
    clock: CL,
    loop_done: CancellationToken,
) {
    let mut refresh_ticker = tokio::time::interval(refresh_interval);
    let mut idle_ticker = tokio::time::interval(IDLE_CHECK_INTERVAL);
    refresh_ticker.tick().await;
    idle_ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = loop_done.cancelled() => break,
            _ = refresh_ticker.tick() => {
                if let Err(err) = claim.refresh(&tenant_key, &worker_id, ttl_secs).await {
                    warn!(%err, "claim refresh failed");
                }
            }
            _ = idle_ticker.tick() => {
                let now = clock.epoch_ms();
                let last = last_activity.load(Ordering::Relaxed);
                if idle_exceeded(now, last, idle_timeout) {
                    info!("owned loop idle timeout exceeded, releasing claim");
                    loop_done.cancel();
                }
            }
        }
    }
}

/// §4.8.2(c): has `lastWorkActivity` been stale for longer than the
/// configured idle threshold?
fn idle_exceeded(now_ms: u64, last_activity_ms: u64, idle_timeout: Duration) -> bool {
    Duration::from_millis(now_ms.saturating_sub(last_activity_ms)) > idle_timeout
}

/// Shutdown turns in-flight work into a preempt the moment SIGTERM/SIGINT
/// arrives (§4.8.3): the job currently running (or about to be accepted)
/// observes the same [`PreemptSlot`] the preempt poller uses.
async fn shutdown_watcher(shutdown: CancellationToken, slot: PreemptSlot) {
    shutdown.cancelled().await;
    slot.trigger("shutdown");
}

#[cfg(test)]
#[path = "owned_loop_tests.rs"]
mod tests;
