// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process entrypoint (§6.8). Reads [`ew_worker::Config`] from the
//! environment, wires the production adapters together, and runs the
//! Tenancy Supervisor until SIGTERM/SIGINT.

use std::sync::Arc;

use ew_adapters::{CliObjectStorageSyncer, HttpActiveJobStore, HttpCallbackClient, HttpClaimRegistryClient, HttpQueueClient};
use ew_core::{SystemClock, WorkerId};
use ew_engine::{CodeModRunner, JobController, JobControllerConfig, Metrics, Publisher};
use ew_git::GitWorkspaceManager;
use ew_worker::{Config, OwnedLoopHandles, SupervisorConfig, TenancySupervisor};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(%err, "invalid configuration");
            std::process::exit(1);
        }
    };

    let worker_id = WorkerId::generate();
    tracing::info!(worker_id = %worker_id, "edit worker starting");

    let queue = Arc::new(HttpQueueClient::new());
    let callback = Arc::new(HttpCallbackClient::new(config.orchestrator_callback_base_url.clone()));
    let active_jobs = Arc::new(HttpActiveJobStore::new(config.active_job_store_base_url.clone()));
    let claim = Arc::new(HttpClaimRegistryClient::new(config.claim_registry_base_url.clone()));
    let git = Arc::new(GitWorkspaceManager::new());
    let codemod = Arc::new(CodeModRunner::new());
    let publisher = Publisher::new(CliObjectStorageSyncer::new());
    let clock = SystemClock;
    let metrics = Arc::new(Metrics::new());

    let controller = Arc::new(JobController::new(
        Arc::clone(&queue),
        Arc::clone(&callback),
        Arc::clone(&active_jobs),
        Arc::clone(&git),
        Arc::clone(&codemod),
        publisher,
        clock.clone(),
        worker_id.clone(),
        JobControllerConfig {
            workspace_root: config.workspace_root.clone(),
            region: config.region.clone(),
            heartbeat_interval: config.heartbeat_interval(),
            lease_extend_interval: config.lease_extend_interval(),
            lease_extend_secs: config.lease_extend_secs,
            git_push_enabled: config.git_push_enabled,
            git_push_retries: config.git_push_retries,
            ..Default::default()
        },
        Arc::clone(&metrics),
    ));

    let handles = OwnedLoopHandles { queue, claim, controller, clock };

    let supervisor_config = SupervisorConfig {
        unclaimed_queue_url: config.unclaimed_queue_url.clone(),
        region: config.region.clone(),
        account_id: config.account_id.clone(),
        claim_ttl_secs: config.claim_ttl_secs,
        refresh_interval: config.refresh_interval(),
        idle_timeout: config.idle_timeout(),
        work_poll_wait_secs: config.work_poll_wait_secs,
        preempt_poll_wait_secs: config.preempt_poll_wait_secs,
        claim_poll_wait_secs: config.work_poll_wait_secs,
    };

    let supervisor = TenancySupervisor::new(handles, worker_id, supervisor_config, metrics);

    let shutdown = CancellationToken::new();
    let watcher_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        tracing::info!("shutdown signal received");
        watcher_shutdown.cancel();
    });

    supervisor.run(shutdown).await;
    tracing::info!("edit worker exiting");
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(err) => {
            tracing::warn!(%err, "failed to install SIGTERM handler, falling back to SIGINT only");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {}
        _ = tokio::signal::ctrl_c() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
