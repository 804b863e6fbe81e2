// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Job Controller (C7, §4.7): the state machine that drives one work
//! message from Accept through Done, racing a [`PreemptHandle`] against
//! every cancellable stage and owning the "exactly one terminal callback"
//! invariant (§4.3).

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use ew_adapters::{ActiveJobStore, ObjectStorageSyncer, OrchestratorCallbackClient, QueueClient};
use ew_core::{
    backoff_delay, format_commit_message, ActiveJobRecord, Clock, CommitInput, ErrorKind, JobResult, TenantKey,
    WorkMessage, WorkerId,
};
use ew_git::WorkspaceManager;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use crate::codemod::CodeModEngine;
use crate::error::{CodeModError, JobError};
use crate::metrics::Metrics;
use crate::publish::Publisher;

/// Heartbeat/lease-extension cadence and workspace placement (§4.7, §4.10).
#[derive(Debug, Clone)]
pub struct JobControllerConfig {
    pub workspace_root: std::path::PathBuf,
    pub region: String,
    pub heartbeat_interval: Duration,
    pub lease_extend_interval: Duration,
    pub lease_extend_secs: u64,
    pub active_job_ttl_secs: u64,
    /// §4.10 "Master switch for push" — when `false`, the push stage is
    /// skipped entirely (build/publish/commit still run) in both the
    /// normal and salvage paths.
    pub git_push_enabled: bool,
    /// §4.10 "Retries in `pushWithRetry`" — attempts beyond the first are
    /// spaced out with [`ew_core::backoff_delay`] (base 1 s, cap 30 s).
    pub git_push_retries: u32,
}

impl Default for JobControllerConfig {
    fn default() -> Self {
        Self {
            workspace_root: std::path::PathBuf::from("/workspace"),
            region: "us-west-2".to_string(),
            heartbeat_interval: Duration::from_secs(30),
            lease_extend_interval: Duration::from_secs(50 * 60),
            lease_extend_secs: 60 * 60,
            active_job_ttl_secs: 60 * 60,
            git_push_enabled: true,
            git_push_retries: 3,
        }
    }
}

/// The preempt signal a job watches for the entire time it runs. Cancelling
/// it twice is a no-op (`CancellationToken`'s own guarantee), which is what
/// makes duplicate preempt deliveries idempotent (§C.4). The first caller to
/// trigger it wins the `causeString` that ends up on the `fail(PREEMPTED)`
/// callback — a shutdown-triggered preempt reports `"shutdown"` instead of
/// the default newer-message reason (§4.8.3).
#[derive(Clone, Default)]
pub struct PreemptHandle {
    cancel: CancellationToken,
    reason: Arc<Mutex<Option<String>>>,
}

impl PreemptHandle {
    pub fn new() -> Self {
        Self { cancel: CancellationToken::new(), reason: Arc::new(Mutex::new(None)) }
    }

    pub fn trigger(&self) {
        self.trigger_with_reason("preempted by newer message");
    }

    pub fn trigger_with_reason(&self, reason: impl Into<String>) {
        let mut slot = self.reason.lock();
        if slot.is_none() {
            *slot = Some(reason.into());
        }
        self.cancel.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn reason(&self) -> String {
        self.reason.lock().clone().unwrap_or_else(|| "preempted by newer message".to_string())
    }
}

/// What a finished job reported, for the Tenancy Supervisor and logs. The
/// orchestrator-facing outcome has already been delivered by the time this
/// is returned (`succeed`/`fail` is called from inside [`JobController::run_job`]).
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Succeeded(JobResult),
    Preempted,
    Failed(ErrorKind),
}

enum StageOutcome {
    Completed(JobResult),
    Interrupted { at_build_stage: bool },
}

/// Drives one tenant's work message through the full lifecycle. Adapter
/// generics match `ew-adapters`'/`ew-git`'s trait boundaries so production
/// code and tests assemble the same controller from different collaborators.
pub struct JobController<Q, CB, J, G, E, P, CL: Clock> {
    queue: Arc<Q>,
    callback: Arc<CB>,
    active_jobs: Arc<J>,
    git: Arc<G>,
    codemod: Arc<E>,
    publisher: Arc<Publisher<P>>,
    clock: CL,
    worker_id: WorkerId,
    config: JobControllerConfig,
    metrics: Arc<Metrics>,
}

impl<Q, CB, J, G, E, P, CL> JobController<Q, CB, J, G, E, P, CL>
where
    Q: QueueClient + 'static,
    CB: OrchestratorCallbackClient + 'static,
    J: ActiveJobStore + 'static,
    G: WorkspaceManager + 'static,
    E: CodeModEngine + 'static,
    P: ObjectStorageSyncer + 'static,
    CL: Clock,
{
    /// Takes already-shared collaborators so callers (tests especially) can
    /// keep a handle to the same instance the controller drives, to inspect
    /// recorded calls afterward.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        queue: Arc<Q>,
        callback: Arc<CB>,
        active_jobs: Arc<J>,
        git: Arc<G>,
        codemod: Arc<E>,
        publisher: Publisher<P>,
        clock: CL,
        worker_id: WorkerId,
        config: JobControllerConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            queue,
            callback,
            active_jobs,
            git,
            codemod,
            publisher: Arc::new(publisher),
            clock,
            worker_id,
            config,
            metrics,
        }
    }

    /// Run one work message to a terminal outcome: Done, Preempted (with a
    /// salvage pass), or Failed. Emits exactly one terminal callback.
    #[instrument(skip(self, message, preempt), fields(message_id = %message.message_id, thread_id = %message.thread_id))]
    pub async fn run_job(
        &self,
        work_queue_url: &str,
        message: WorkMessage,
        preempt: PreemptHandle,
    ) -> JobOutcome {
        let tenant_key = ew_core::tenant_key(&message.project_id, &message.user_id);
        let workspace = ew_core::work_dir(
            &self.config.workspace_root,
            &message.project_id,
            &message.user_id,
            &message.repo_url,
        );

        let record = ActiveJobRecord::new(
            tenant_key.clone(),
            message.message_id.clone(),
            message.task_token.clone(),
            message.receipt_handle.clone(),
            message.thread_id.clone(),
            self.worker_id.clone(),
            self.clock.epoch_ms(),
            self.config.active_job_ttl_secs,
        );
        if let Err(err) = self.active_jobs.create(&record).await {
            warn!(%err, "failed to record active-job entry, failing job");
            return self
                .fail_job(work_queue_url, &message, &tenant_key, ErrorKind::Internal, &err.to_string())
                .await;
        }

        let heartbeat_task = self.spawn_heartbeat(tenant_key.clone(), message.task_token.clone());
        let lease_task =
            self.spawn_lease_extender(work_queue_url.to_string(), message.receipt_handle.clone());

        let stage_result = self.process(&workspace, &message, preempt.cancel.clone()).await;
        let preempt_reason = preempt.reason();

        heartbeat_task.abort();
        lease_task.abort();

        match stage_result {
            Ok(StageOutcome::Completed(result)) => {
                self.metrics.job_completed();
                if let Err(err) = self.callback.succeed(&message.task_token, &result).await {
                    warn!(%err, "succeed callback failed");
                }
                if let Err(err) = self.queue.delete(work_queue_url, &message.receipt_handle).await {
                    warn!(%err, "failed to delete work message after success");
                }
                if let Err(err) = self.active_jobs.delete(&tenant_key).await {
                    warn!(%err, "failed to clear active-job record after success");
                }
                JobOutcome::Succeeded(result)
            }
            Ok(StageOutcome::Interrupted { at_build_stage }) => {
                self.metrics.job_preempted();
                self.salvage(&workspace, &message, at_build_stage).await;
                if let Err(err) = self.callback.fail(&message.task_token, ErrorKind::Preempted, &preempt_reason).await
                {
                    warn!(%err, "fail(PREEMPTED) callback failed");
                }
                if let Err(err) = self.queue.delete(work_queue_url, &message.receipt_handle).await {
                    warn!(%err, "failed to delete work message after preemption");
                }
                if let Err(err) = self.active_jobs.delete(&tenant_key).await {
                    warn!(%err, "failed to clear active-job record after preemption");
                }
                JobOutcome::Preempted
            }
            Err(err) => {
                let kind = err.kind();
                warn!(%err, ?kind, "job failed with an unexpected exception");
                self.fail_job(work_queue_url, &message, &tenant_key, kind, &err.to_string()).await
            }
        }
    }

    /// Prepare, CodeMod, Commit, Build, Publish, Push, in order. Returns
    /// `Interrupted` the first time the preempt token is observed set,
    /// rather than propagating an error — preemption is not a failure.
    async fn process(
        &self,
        workspace: &Path,
        message: &WorkMessage,
        cancel: CancellationToken,
    ) -> Result<StageOutcome, JobError> {
        self.git.init(workspace, &message.repo_url).await?;
        self.git.ensure_branch(workspace, &message.thread_id).await?;

        if cancel.is_cancelled() {
            return Ok(StageOutcome::Interrupted { at_build_stage: false });
        }

        let codemod_outcome = match self.codemod.run(workspace, &message.instruction, cancel.clone()).await {
            Ok(outcome) => outcome,
            Err(CodeModError::Interrupted) => return Ok(StageOutcome::Interrupted { at_build_stage: false }),
            Err(err) => return Err(JobError::CodeMod(err)),
        };

        let files_changed = self.git.changed_files(workspace).await?;
        let mut commit_subject = None;
        if !files_changed.is_empty() {
            let mut input =
                CommitInput::new().with_files_changed(files_changed.clone()).instruction(message.instruction.clone());
            if let Some(session_id) = &codemod_outcome.session_id {
                input = input.session_id(session_id.clone());
            }
            let (subject, body) = format_commit_message(&input);
            self.git.commit(workspace, &subject, body.as_deref()).await?;
            commit_subject = Some(subject);
        }

        if cancel.is_cancelled() {
            return Ok(StageOutcome::Interrupted { at_build_stage: false });
        }

        let build_outcome = self.publisher.build(workspace, cancel.clone()).await?;
        if build_outcome.interrupted {
            return Ok(StageOutcome::Interrupted { at_build_stage: true });
        }
        let build_ok = build_outcome.ok;

        let mut publish_ok = false;
        if build_ok {
            let bucket = ew_core::bucket_name(&message.project_id);
            match self.publisher.sync(workspace, &bucket, &self.config.region, cancel.clone()).await {
                Ok(sync_outcome) if sync_outcome.completed => publish_ok = true,
                Ok(_) => return Ok(StageOutcome::Interrupted { at_build_stage: true }),
                Err(err) => {
                    // §7: PUBLISH_FAILED gets the same handling as BUILD_FAILED —
                    // non-terminal, the job still succeeds with publish_ok=false.
                    warn!(%err, "publish sync failed; job still reports success with publish_ok=false");
                }
            }
        }

        let push_ok = if !self.config.git_push_enabled {
            false
        } else {
            match self.push_with_retry(workspace).await {
                Ok(()) => true,
                Err(err) if build_ok && publish_ok => {
                    warn!(%err, "push failed after a successful build+publish; job still reports success");
                    false
                }
                Err(err) => return Err(JobError::Git(err)),
            }
        };

        let preview_url =
            if publish_ok { Some(format!("https://{}", ew_core::bucket_name(&message.project_id))) } else { None };

        Ok(StageOutcome::Completed(JobResult {
            success: true,
            summary: commit_subject.unwrap_or_else(|| "No changes made".to_string()),
            files_changed,
            build_ok,
            publish_ok,
            push_ok,
            preview_url,
            cost_usd: codemod_outcome.cost_usd,
            duration_ms: codemod_outcome.duration_ms.unwrap_or(0),
            session_id: codemod_outcome.session_id,
            interrupted: None,
            error_kind: None,
        }))
    }

    /// Best-effort cleanup after an interrupted stage: commit whatever the
    /// code-mod left behind as a WIP commit, sync a partial build if the
    /// build stage itself was interrupted, then push. Every step here logs
    /// and continues on error — none of this can turn into a second
    /// terminal callback (§4.7 "On preempt").
    async fn salvage(&self, workspace: &Path, message: &WorkMessage, at_build_stage: bool) {
        match self.git.changed_files(workspace).await {
            Ok(files) if !files.is_empty() => {
                let input = CommitInput::new()
                    .with_files_changed(files)
                    .instruction(message.instruction.clone())
                    .interrupted(true);
                let (subject, body) = format_commit_message(&input);
                if let Err(err) = self.git.commit(workspace, &subject, body.as_deref()).await {
                    warn!(%err, "salvage commit failed");
                }
            }
            Ok(_) => {}
            Err(err) => warn!(%err, "failed to inspect changed files during salvage"),
        }

        if at_build_stage {
            let bucket = ew_core::bucket_name(&message.project_id);
            let sync_result =
                self.publisher.sync(workspace, &bucket, &self.config.region, CancellationToken::new()).await;
            if let Err(err) = sync_result {
                warn!(%err, "salvage sync failed");
            }
        }

        if !self.config.git_push_enabled {
            return;
        }
        if let Err(err) = self.push_with_retry(workspace).await {
            warn!(%err, "salvage push failed");
        }
    }

    /// §4.10 "Retries in `pushWithRetry`": attempt [`WorkspaceManager::push`]
    /// up to `git_push_retries` times beyond the first, backing off between
    /// attempts with the same exponential-with-full-jitter schedule the
    /// claim/queue retry paths use.
    async fn push_with_retry(&self, workspace: &Path) -> Result<(), ew_git::GitError> {
        let mut attempt = 0u32;
        loop {
            match self.git.push(workspace, None).await {
                Ok(()) => return Ok(()),
                Err(err) if attempt >= self.config.git_push_retries => return Err(err),
                Err(err) => {
                    attempt += 1;
                    let delay = backoff_delay(Duration::from_secs(1), Duration::from_secs(30), attempt);
                    warn!(%err, attempt, "git push failed, retrying after backoff");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn fail_job(
        &self,
        work_queue_url: &str,
        message: &WorkMessage,
        tenant_key: &TenantKey,
        kind: ErrorKind,
        cause: &str,
    ) -> JobOutcome {
        self.metrics.job_failed();
        if let Err(err) = self.callback.fail(&message.task_token, kind, cause).await {
            warn!(%err, "fail callback failed");
        }
        if let Err(err) = self.queue.delete(work_queue_url, &message.receipt_handle).await {
            warn!(%err, "failed to delete work message after failure");
        }
        if let Err(err) = self.active_jobs.delete(tenant_key).await {
            warn!(%err, "failed to clear active-job record after failure");
        }
        JobOutcome::Failed(kind)
    }

    fn spawn_heartbeat(&self, tenant_key: TenantKey, task_token: ew_core::TaskToken) -> JoinHandle<()> {
        let callback = Arc::clone(&self.callback);
        let active_jobs = Arc::clone(&self.active_jobs);
        let clock = self.clock.clone();
        let interval = self.config.heartbeat_interval;
        let ttl_secs = self.config.active_job_ttl_secs;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                callback.heartbeat(&task_token).await;
                if let Err(err) = active_jobs.refresh(&tenant_key, clock.epoch_ms(), ttl_secs).await {
                    warn!(%err, "active-job TTL refresh failed");
                }
            }
        })
    }

    fn spawn_lease_extender(&self, work_queue_url: String, receipt_handle: String) -> JoinHandle<()> {
        let queue = Arc::clone(&self.queue);
        let interval = self.config.lease_extend_interval;
        let seconds = self.config.lease_extend_secs;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if let Err(err) = queue.extend_lease(&work_queue_url, &receipt_handle, seconds).await {
                    warn!(%err, "lease extension failed");
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
