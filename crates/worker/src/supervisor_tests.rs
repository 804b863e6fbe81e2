use std::sync::Arc;
use std::time::Duration;

use ew_adapters::fake::{FakeActiveJobStore, FakeCallbackClient, FakeClaimRegistryClient, FakeObjectStorageSyncer, FakeQueueClient};
use ew_adapters::ClaimRegistryClient;
use ew_core::{tenant_key, FakeClock, ProjectId, UserId, WorkerId};
use ew_engine::fake::FakeCodeModEngine;
use ew_engine::{JobController, JobControllerConfig, Metrics, Publisher};
use ew_git::fake::FakeWorkspaceManager;
use tokio_util::sync::CancellationToken;

use super::*;

const UNCLAIMED_QUEUE: &str = "https://queue.example/unclaimed";

#[allow(clippy::type_complexity)]
fn supervisor(
    tmp: &std::path::Path,
    claim: Arc<FakeClaimRegistryClient>,
    worker_id: WorkerId,
    metrics: Arc<Metrics>,
) -> (
    TenancySupervisor<
        FakeQueueClient,
        FakeCallbackClient,
        FakeActiveJobStore,
        FakeWorkspaceManager,
        FakeCodeModEngine,
        FakeObjectStorageSyncer,
        FakeClock,
        FakeClaimRegistryClient,
    >,
    Arc<FakeQueueClient>,
) {
    let queue = Arc::new(FakeQueueClient::new());
    let callback = Arc::new(FakeCallbackClient::new());
    let active_jobs = Arc::new(FakeActiveJobStore::new());
    let git = Arc::new(FakeWorkspaceManager::new());
    let codemod = Arc::new(FakeCodeModEngine::new());
    let publisher = Publisher::new(FakeObjectStorageSyncer::new()).with_build_command("true");
    let clock = FakeClock::new();

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
            workspace_root: tmp.to_path_buf(),
            heartbeat_interval: Duration::from_secs(3600),
            lease_extend_interval: Duration::from_secs(3600),
            ..Default::default()
        },
        Arc::clone(&metrics),
    ));

    let handles = OwnedLoopHandles { queue: Arc::clone(&queue), claim, controller, clock };

    let config = SupervisorConfig {
        unclaimed_queue_url: UNCLAIMED_QUEUE.to_string(),
        region: "us-west-2".to_string(),
        account_id: "123456789012".to_string(),
        claim_ttl_secs: 3600,
        refresh_interval: Duration::from_secs(30),
        idle_timeout: Duration::from_secs(300),
        work_poll_wait_secs: 20,
        preempt_poll_wait_secs: 5,
        claim_poll_wait_secs: 1,
    };

    (TenancySupervisor::new(handles, worker_id, config, metrics), queue)
}

fn claim_request_json() -> serde_json::Value {
    serde_json::json!({
        "type": "CLAIM_REQUEST",
        "projectId": "amelia",
        "userId": "scott",
        "threadId": "t1",
        "messageId": "msg-1",
        "queueUrl": "https://queue.example/work/amelia-scott",
        "timestamp": 1_700_000_000_000u64,
    })
}

#[tokio::test]
async fn a_winning_claim_deletes_the_request_and_releases_on_owned_loop_exit() {
    let tmp = tempfile::tempdir().unwrap();
    let claim = Arc::new(FakeClaimRegistryClient::new());
    let worker_id = WorkerId::generate();
    let metrics = Arc::new(Metrics::new());
    let (sup, unclaimed) = supervisor(tmp.path(), Arc::clone(&claim), worker_id.clone(), Arc::clone(&metrics));
    unclaimed.push(UNCLAIMED_QUEUE, "rh-1", claim_request_json());

    let shutdown = CancellationToken::new();
    let shutdown_clone = shutdown.clone();
    let handle = tokio::spawn(async move { sup.run(shutdown_clone).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();

    assert!(unclaimed.is_empty(UNCLAIMED_QUEUE), "the claim request must be deleted once the claim is won");
    let tenant = tenant_key(&ProjectId::from("amelia"), &UserId::from("scott"));
    assert!(claim.record(&tenant).is_none(), "the claim must be released once the owned loop exits");
    assert_eq!(metrics.snapshot().claims_won, 1);
}

#[tokio::test]
async fn a_contended_claim_is_not_deleted_and_counts_as_lost() {
    let tmp = tempfile::tempdir().unwrap();
    let claim = Arc::new(FakeClaimRegistryClient::new());
    let tenant = tenant_key(&ProjectId::from("amelia"), &UserId::from("scott"));
    let other_worker = WorkerId::generate();
    claim.claim(&tenant, &other_worker, 3600).await.unwrap();

    let worker_id = WorkerId::generate();
    let metrics = Arc::new(Metrics::new());
    let (sup, unclaimed) = supervisor(tmp.path(), Arc::clone(&claim), worker_id, Arc::clone(&metrics));
    unclaimed.push(UNCLAIMED_QUEUE, "rh-1", claim_request_json());

    let shutdown = CancellationToken::new();
    let shutdown_clone = shutdown.clone();
    let handle = tokio::spawn(async move { sup.run(shutdown_clone).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();

    assert_eq!(metrics.snapshot().claims_lost, 1);
    assert_eq!(metrics.snapshot().claims_won, 0);
    // the original owner's claim must be untouched
    assert_eq!(claim.record(&tenant).map(|r| r.worker_id), Some(other_worker));
}
