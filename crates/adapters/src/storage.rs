// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Object-storage syncer used by the Publisher's sync stage (C6, §4.6,
//! §6.6). Mirrors a local `dist/` tree to a bucket with `--delete`
//! semantics, parsing stdout for `upload:`/`delete:` counts, and supports
//! best-effort cancellation: "SIGINT mid-sync → partial upload is
//! acceptable; report `publishOk=false` but do not fail the job".

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to spawn sync subprocess: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("sync subprocess exited with status {0}")]
    NonZeroExit(i32),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub uploaded: u64,
    pub deleted: u64,
    /// False when the sync was cancelled mid-flight — the caller reports
    /// `publishOk=false` without treating this as a job-terminal error.
    pub completed: bool,
}

#[async_trait]
pub trait ObjectStorageSyncer: Send + Sync {
    async fn sync(
        &self,
        local_dir: &Path,
        bucket: &str,
        region: &str,
        cancel: CancellationToken,
    ) -> Result<SyncOutcome, StorageError>;
}

/// Shells out to an `aws s3 sync`-shaped CLI. Treated as opaque per §1
/// ("Infrastructure provisioning of queues, tables, and buckets" is out of
/// scope — this only drives an existing bucket, it never creates one).
pub struct CliObjectStorageSyncer {
    binary: String,
}

impl CliObjectStorageSyncer {
    pub fn new() -> Self {
        Self { binary: "aws".to_string() }
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }
}

impl Default for CliObjectStorageSyncer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStorageSyncer for CliObjectStorageSyncer {
    #[instrument(skip(self, cancel), fields(bucket = %bucket, region = %region))]
    async fn sync(
        &self,
        local_dir: &Path,
        bucket: &str,
        region: &str,
        cancel: CancellationToken,
    ) -> Result<SyncOutcome, StorageError> {
        let mut child = Command::new(&self.binary)
            .args([
                "s3",
                "sync",
                &local_dir.display().to_string(),
                &format!("s3://{bucket}"),
                "--delete",
                "--region",
                region,
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(StorageError::Spawn)?;

        let stdout = child.stdout.take();
        let mut uploaded = 0u64;
        let mut deleted = 0u64;

        if let Some(stdout) = stdout {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        let _ = child.start_kill();
                        info!(uploaded, deleted, "sync cancelled mid-flight, reporting partial result");
                        return Ok(SyncOutcome { uploaded, deleted, completed: false });
                    }
                    line = lines.next_line() => {
                        match line {
                            Ok(Some(line)) => {
                                if line.starts_with("upload:") {
                                    uploaded += 1;
                                } else if line.starts_with("delete:") {
                                    deleted += 1;
                                }
                            }
                            Ok(None) => break,
                            Err(_) => break,
                        }
                    }
                }
            }
        }

        let status = child.wait().await.map_err(StorageError::Spawn)?;
        if status.success() {
            Ok(SyncOutcome { uploaded, deleted, completed: true })
        } else {
            Err(StorageError::NonZeroExit(status.code().unwrap_or(-1)))
        }
    }
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod tests;
