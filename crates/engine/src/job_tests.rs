use std::path::{Path, PathBuf};
use std::sync::Arc;

use ew_adapters::fake::{CallbackCall, FakeActiveJobStore, FakeCallbackClient, FakeObjectStorageSyncer, FakeQueueClient};
use ew_core::{FakeClock, MessageId, ProjectId, TaskToken, ThreadId, UserId};
use ew_git::fake::FakeWorkspaceManager;
use ew_wire::CallbackErrorCode;

use super::*;
use crate::codemod::CodeModOutcome;
use crate::fake::{FakeCodeModEngine, FakeCodeModResult};

const REPO_URL: &str = "https://example.com/amelia-site.git";

fn build_message(workspace_root: &Path) -> (WorkMessage, PathBuf) {
    let project = ProjectId::from("amelia");
    let user = UserId::from("scott");
    let workspace = ew_core::work_dir(workspace_root, &project, &user, REPO_URL);
    let message = WorkMessage {
        task_token: TaskToken::from("tok-1"),
        message_id: MessageId::from("msg-1"),
        project_id: project,
        user_id: user,
        thread_id: ThreadId::from("t1"),
        instruction: "Please fix the header".to_string(),
        repo_url: REPO_URL.to_string(),
        attachments: vec![],
        receipt_handle: "rh-1".to_string(),
    };
    (message, workspace)
}

#[allow(clippy::type_complexity)]
struct Harness {
    controller: JobController<
        FakeQueueClient,
        FakeCallbackClient,
        FakeActiveJobStore,
        FakeWorkspaceManager,
        FakeCodeModEngine,
        FakeObjectStorageSyncer,
        FakeClock,
    >,
    queue: Arc<FakeQueueClient>,
    callback: Arc<FakeCallbackClient>,
    active_jobs: Arc<FakeActiveJobStore>,
    git: Arc<FakeWorkspaceManager>,
    codemod: Arc<FakeCodeModEngine>,
}

fn harness(build_command: &str, workspace_root: &Path) -> Harness {
    let queue = Arc::new(FakeQueueClient::new());
    let callback = Arc::new(FakeCallbackClient::new());
    let active_jobs = Arc::new(FakeActiveJobStore::new());
    let git = Arc::new(FakeWorkspaceManager::new());
    let codemod = Arc::new(FakeCodeModEngine::new());
    let publisher = Publisher::new(FakeObjectStorageSyncer::new()).with_build_command(build_command);

    let controller = JobController::new(
        Arc::clone(&queue),
        Arc::clone(&callback),
        Arc::clone(&active_jobs),
        Arc::clone(&git),
        Arc::clone(&codemod),
        publisher,
        FakeClock::new(),
        WorkerId::generate(),
        JobControllerConfig {
            workspace_root: workspace_root.to_path_buf(),
            heartbeat_interval: Duration::from_secs(3600),
            lease_extend_interval: Duration::from_secs(3600),
            ..Default::default()
        },
        Arc::new(Metrics::new()),
    );

    Harness { controller, queue, callback, active_jobs, git, codemod }
}

#[tokio::test]
async fn a_clean_run_commits_builds_publishes_and_succeeds() {
    let tmp = tempfile::tempdir().unwrap();
    let (message, workspace) = build_message(tmp.path());
    let harness = harness("true", tmp.path());
    std::fs::create_dir_all(&workspace).unwrap();
    harness.git.set_changed_files(&workspace, vec!["src/header.tsx".to_string()]);
    harness.codemod.set_result(FakeCodeModResult::Success(CodeModOutcome {
        output: "done".to_string(),
        session_id: Some("sess-1".to_string()),
        cost_usd: Some(0.12),
        duration_ms: Some(4000),
    }));

    let outcome = harness
        .controller
        .run_job("https://queue.example/work", message.clone(), PreemptHandle::new())
        .await;

    match outcome {
        JobOutcome::Succeeded(result) => {
            assert!(result.success);
            assert!(result.build_ok);
            assert!(result.publish_ok);
            assert_eq!(result.files_changed, vec!["src/header.tsx".to_string()]);
            assert_eq!(result.session_id.as_deref(), Some("sess-1"));
        }
        other => panic!("expected Succeeded, got {other:?}"),
    }

    assert_eq!(harness.callback.terminal_call_count(), 1);
    assert!(matches!(harness.callback.calls().last(), Some(CallbackCall::Succeed(_))));
    assert!(harness.queue.is_empty("https://queue.example/work"));
    let tenant_key = ew_core::tenant_key(&message.project_id, &message.user_id);
    assert!(harness.active_jobs.record(&tenant_key).is_none(), "active-job record must be cleared on success");
}

#[tokio::test]
async fn a_run_with_no_file_changes_still_succeeds_without_committing() {
    let tmp = tempfile::tempdir().unwrap();
    let (message, workspace) = build_message(tmp.path());
    let harness = harness("true", tmp.path());
    std::fs::create_dir_all(&workspace).unwrap();

    let outcome = harness.controller.run_job("https://queue.example/work", message, PreemptHandle::new()).await;

    assert!(matches!(outcome, JobOutcome::Succeeded(_)));
    assert!(!harness.git.calls().iter().any(|c| matches!(c, ew_git::fake::ManagerCall::Commit { committed: true })));
}

#[tokio::test]
async fn a_preempt_delivered_before_codemod_salvages_and_reports_preempted() {
    let tmp = tempfile::tempdir().unwrap();
    let (message, workspace) = build_message(tmp.path());
    let harness = harness("true", tmp.path());
    std::fs::create_dir_all(&workspace).unwrap();
    let preempt = PreemptHandle::new();
    preempt.trigger();

    let outcome = harness.controller.run_job("https://queue.example/work", message.clone(), preempt).await;

    assert_eq!(outcome, JobOutcome::Preempted);
    assert_eq!(
        harness.callback.calls().last(),
        Some(&CallbackCall::Fail(CallbackErrorCode::Preempted, "preempted by newer message".to_string()))
    );
    assert!(harness.codemod.instructions_seen().is_empty(), "codemod must not run once already preempted");
    let tenant_key = ew_core::tenant_key(&message.project_id, &message.user_id);
    assert!(harness.active_jobs.record(&tenant_key).is_none());
}

#[tokio::test]
async fn codemod_interruption_produces_a_wip_salvage_commit() {
    let tmp = tempfile::tempdir().unwrap();
    let (message, workspace) = build_message(tmp.path());
    let harness = harness("true", tmp.path());
    std::fs::create_dir_all(&workspace).unwrap();
    harness.git.set_changed_files(&workspace, vec!["src/partial.tsx".to_string()]);
    harness.codemod.set_result(FakeCodeModResult::Interrupted);

    let outcome = harness.controller.run_job("https://queue.example/work", message, PreemptHandle::new()).await;

    assert_eq!(outcome, JobOutcome::Preempted);
    assert!(harness.git.calls().iter().any(|c| matches!(c, ew_git::fake::ManagerCall::Commit { committed: true })));
    assert!(harness.git.calls().iter().any(|c| matches!(c, ew_git::fake::ManagerCall::Push)));
}

#[tokio::test]
async fn a_codemod_exec_failure_fails_the_job_without_touching_git() {
    let tmp = tempfile::tempdir().unwrap();
    let (message, workspace) = build_message(tmp.path());
    let harness = harness("true", tmp.path());
    std::fs::create_dir_all(&workspace).unwrap();
    harness.codemod.set_result(FakeCodeModResult::ExecFailed(Some(7)));

    let outcome = harness.controller.run_job("https://queue.example/work", message, PreemptHandle::new()).await;

    assert_eq!(outcome, JobOutcome::Failed(ErrorKind::ExecFailed));
    assert!(matches!(harness.callback.calls().last(), Some(CallbackCall::Fail(CallbackErrorCode::ExecFailed, _))));
}

#[tokio::test]
async fn a_build_failure_is_not_fatal_and_still_reports_success() {
    let tmp = tempfile::tempdir().unwrap();
    let (message, workspace) = build_message(tmp.path());
    let harness = harness("false", tmp.path());
    std::fs::create_dir_all(&workspace).unwrap();
    harness.git.set_changed_files(&workspace, vec!["src/header.tsx".to_string()]);

    let outcome = harness.controller.run_job("https://queue.example/work", message, PreemptHandle::new()).await;

    match outcome {
        JobOutcome::Succeeded(result) => {
            assert!(!result.build_ok);
            assert!(!result.publish_ok);
        }
        other => panic!("expected Succeeded, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn a_push_failure_after_a_good_build_and_publish_still_reports_success() {
    let tmp = tempfile::tempdir().unwrap();
    let (message, workspace) = build_message(tmp.path());
    let harness = harness("true", tmp.path());
    std::fs::create_dir_all(&workspace).unwrap();
    harness.git.set_changed_files(&workspace, vec!["src/header.tsx".to_string()]);
    *harness.git.fail_push_non_convergent.lock() = true;

    let outcome = harness.controller.run_job("https://queue.example/work", message, PreemptHandle::new()).await;

    match outcome {
        JobOutcome::Succeeded(result) => {
            assert!(result.build_ok);
            assert!(result.publish_ok);
            assert!(!result.push_ok);
        }
        other => panic!("expected Succeeded, got {other:?}"),
    }
    assert_eq!(harness.callback.terminal_call_count(), 1);
    assert!(matches!(harness.callback.calls().last(), Some(CallbackCall::Succeed(_))));
}

#[tokio::test(start_paused = true)]
async fn a_push_failure_after_a_failed_build_fails_the_job_as_git_failed() {
    let tmp = tempfile::tempdir().unwrap();
    let (message, workspace) = build_message(tmp.path());
    let harness = harness("false", tmp.path());
    std::fs::create_dir_all(&workspace).unwrap();
    harness.git.set_changed_files(&workspace, vec!["src/header.tsx".to_string()]);
    *harness.git.fail_push_non_convergent.lock() = true;

    let outcome = harness.controller.run_job("https://queue.example/work", message, PreemptHandle::new()).await;

    assert_eq!(outcome, JobOutcome::Failed(ErrorKind::GitFailed));
    assert!(matches!(harness.callback.calls().last(), Some(CallbackCall::Fail(CallbackErrorCode::GitFailed, _))));
}

#[tokio::test]
async fn disabling_git_push_skips_the_push_stage_entirely() {
    let tmp = tempfile::tempdir().unwrap();
    let (message, workspace) = build_message(tmp.path());
    std::fs::create_dir_all(&workspace).unwrap();

    let queue = Arc::new(FakeQueueClient::new());
    let callback = Arc::new(FakeCallbackClient::new());
    let active_jobs = Arc::new(FakeActiveJobStore::new());
    let git = Arc::new(FakeWorkspaceManager::new());
    let codemod = Arc::new(FakeCodeModEngine::new());
    let publisher = Publisher::new(FakeObjectStorageSyncer::new()).with_build_command("true");

    let controller = JobController::new(
        Arc::clone(&queue),
        Arc::clone(&callback),
        Arc::clone(&active_jobs),
        Arc::clone(&git),
        Arc::clone(&codemod),
        publisher,
        FakeClock::new(),
        WorkerId::generate(),
        JobControllerConfig {
            workspace_root: tmp.path().to_path_buf(),
            heartbeat_interval: Duration::from_secs(3600),
            lease_extend_interval: Duration::from_secs(3600),
            git_push_enabled: false,
            ..Default::default()
        },
        Arc::new(Metrics::new()),
    );
    git.set_changed_files(&workspace, vec!["src/header.tsx".to_string()]);

    let outcome = controller.run_job("https://queue.example/work", message, PreemptHandle::new()).await;

    match outcome {
        JobOutcome::Succeeded(result) => {
            assert!(result.build_ok);
            assert!(result.publish_ok);
            assert!(!result.push_ok, "push_ok must be false when git_push_enabled is false");
        }
        other => panic!("expected Succeeded, got {other:?}"),
    }
    assert!(!git.calls().iter().any(|c| matches!(c, ew_git::fake::ManagerCall::Push)), "push must not be attempted");
}

#[tokio::test]
async fn a_publish_sync_failure_is_absorbed_into_publish_ok_false() {
    let tmp = tempfile::tempdir().unwrap();
    let (message, workspace) = build_message(tmp.path());
    std::fs::create_dir_all(&workspace).unwrap();

    let queue = Arc::new(FakeQueueClient::new());
    let callback = Arc::new(FakeCallbackClient::new());
    let active_jobs = Arc::new(FakeActiveJobStore::new());
    let git = Arc::new(FakeWorkspaceManager::new());
    let codemod = Arc::new(FakeCodeModEngine::new());
    let syncer = FakeObjectStorageSyncer::new();
    *syncer.fail_next.lock() = true;
    let publisher = Publisher::new(syncer).with_build_command("true");

    let controller = JobController::new(
        Arc::clone(&queue),
        Arc::clone(&callback),
        Arc::clone(&active_jobs),
        Arc::clone(&git),
        Arc::clone(&codemod),
        publisher,
        FakeClock::new(),
        WorkerId::generate(),
        JobControllerConfig {
            workspace_root: tmp.path().to_path_buf(),
            heartbeat_interval: Duration::from_secs(3600),
            lease_extend_interval: Duration::from_secs(3600),
            ..Default::default()
        },
        Arc::new(Metrics::new()),
    );
    git.set_changed_files(&workspace, vec!["src/header.tsx".to_string()]);

    let outcome = controller.run_job("https://queue.example/work", message, PreemptHandle::new()).await;

    match outcome {
        JobOutcome::Succeeded(result) => {
            assert!(result.success);
            assert!(result.build_ok);
            assert!(!result.publish_ok, "a sync failure must not fail the job, only flip publish_ok");
        }
        other => panic!("expected Succeeded, got {other:?}"),
    }
    assert!(matches!(callback.calls().last(), Some(CallbackCall::Succeed(_))));
}

#[tokio::test]
async fn triggering_preempt_twice_is_idempotent() {
    let tmp = tempfile::tempdir().unwrap();
    let (message, workspace) = build_message(tmp.path());
    let harness = harness("true", tmp.path());
    std::fs::create_dir_all(&workspace).unwrap();
    let preempt = PreemptHandle::new();
    preempt.trigger();
    preempt.trigger();

    let outcome = harness.controller.run_job("https://queue.example/work", message, preempt).await;

    assert_eq!(outcome, JobOutcome::Preempted);
    assert_eq!(harness.callback.terminal_call_count(), 1);
}

#[tokio::test]
async fn a_shutdown_triggered_preempt_reports_the_shutdown_reason() {
    let tmp = tempfile::tempdir().unwrap();
    let (message, workspace) = build_message(tmp.path());
    let harness = harness("true", tmp.path());
    std::fs::create_dir_all(&workspace).unwrap();
    let preempt = PreemptHandle::new();
    preempt.trigger_with_reason("shutdown");

    let outcome = harness.controller.run_job("https://queue.example/work", message, preempt).await;

    assert_eq!(outcome, JobOutcome::Preempted);
    assert_eq!(
        harness.callback.calls().last(),
        Some(&CallbackCall::Fail(CallbackErrorCode::Preempted, "shutdown".to_string()))
    );
}
