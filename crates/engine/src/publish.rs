// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Publisher (C6, §4.6): the two-stage static-site publish. Build runs
//! `npm run build` in the workspace; sync mirrors `dist/` to object
//! storage. Both stages are cancellable and a SIGINT mid-stage degrades to
//! a partial result rather than failing the surrounding job (§4.6
//! "Interrupt policy").

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use ew_adapters::{ObjectStorageSyncer, SyncOutcome};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::error::PublishError;

/// §5/§6.5: the build subprocess must exit within 5s of SIGINT or be killed.
const INTERRUPT_WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOutcome {
    pub ok: bool,
    pub interrupted: bool,
}

pub struct Publisher<S> {
    syncer: S,
    build_command: String,
}

impl<S: ObjectStorageSyncer> Publisher<S> {
    pub fn new(syncer: S) -> Self {
        Self { syncer, build_command: "npm run build".to_string() }
    }

    pub fn with_build_command(mut self, command: impl Into<String>) -> Self {
        self.build_command = command.into();
        self
    }

    /// `npm run build` in `workspace`, production env (§4.6 "Build
    /// stage"). Non-zero exit is not fatal to the job — it only disables
    /// the sync stage. A spawn failure is fatal (`BuildSpawn`).
    #[instrument(skip(self, cancel), fields(workspace = %workspace.display()))]
    pub async fn build(
        &self,
        workspace: &Path,
        cancel: CancellationToken,
    ) -> Result<BuildOutcome, PublishError> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.build_command)
            .current_dir(workspace)
            .env("NODE_ENV", "production")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(PublishError::BuildSpawn)?;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                interrupt_child(&mut child).await;
                warn!("build interrupted by preempt signal");
                Ok(BuildOutcome { ok: false, interrupted: true })
            }
            status = child.wait() => {
                let ok = status.map(|s| s.success()).unwrap_or(false);
                if !ok {
                    info!(ok, "build finished with non-zero exit, publish will be skipped");
                }
                Ok(BuildOutcome { ok, interrupted: false })
            }
        }
    }

    /// Mirror `workspace/dist` to the project's bucket (§4.6 "Sync
    /// stage", only called when `buildOk`). SIGINT mid-sync yields a
    /// partial `SyncOutcome` rather than an error.
    #[instrument(skip(self, cancel), fields(bucket = %bucket, region = %region))]
    pub async fn sync(
        &self,
        workspace: &Path,
        bucket: &str,
        region: &str,
        cancel: CancellationToken,
    ) -> Result<SyncOutcome, PublishError> {
        let dist = workspace.join("dist");
        Ok(self.syncer.sync(&dist, bucket, region, cancel).await?)
    }
}

/// SIGINT, await up to [`INTERRUPT_WAIT`], then force-kill — the same
/// cancellation policy `codemod::interrupt` applies to the code-mod
/// subprocess (§6.5 "Responsive to SIGINT").
async fn interrupt_child(child: &mut Child) {
    if let Some(pid) = child.id() {
        let pid = nix::unistd::Pid::from_raw(pid as i32);
        if let Err(err) = nix::sys::signal::kill(pid, nix::sys::signal::Signal::SIGINT) {
            warn!(%err, "failed to signal build subprocess, killing directly");
            let _ = child.start_kill();
        }
    }
    if tokio::time::timeout(INTERRUPT_WAIT, child.wait()).await.is_err() {
        let _ = child.start_kill();
    }
}

#[cfg(test)]
#[path = "publish_tests.rs"]
mod tests;
