// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-boundary error enums for the Code-Mod Runner, Publisher, and Job
//! Controller (§4.5–§4.7, §7). Narrow and crate-scoped, matching the rest
//! of the workspace's error taxonomy (§B.2) — only the Job Controller maps
//! these into the closed `ErrorKind` callback taxonomy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodeModError {
    #[error("failed to spawn code-mod subprocess: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("code-mod subprocess exited with status {0:?}")]
    ExecFailed(Option<i32>),
    #[error("code-mod subprocess was interrupted")]
    Interrupted,
    #[error("code-mod subprocess emitted an unparsable event: {0}")]
    MalformedEvent(String),
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to spawn build subprocess: {0}")]
    BuildSpawn(#[source] std::io::Error),
    #[error(transparent)]
    Sync(#[from] ew_adapters::StorageError),
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Git(#[from] ew_git::GitError),
    #[error(transparent)]
    CodeMod(#[from] CodeModError),
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error(transparent)]
    Callback(#[from] ew_adapters::CallbackError),
    #[error(transparent)]
    Queue(#[from] ew_adapters::QueueError),
    #[error("job was preempted: {0}")]
    Preempted(String),
}

impl JobError {
    /// Map to the closed callback taxonomy (§6.2, §7). Internal detail
    /// never crosses this boundary — only `Display` text goes into
    /// `causeString`.
    pub fn kind(&self) -> ew_core::ErrorKind {
        match self {
            JobError::Git(_) => ew_core::ErrorKind::GitFailed,
            JobError::CodeMod(CodeModError::Spawn(_)) => ew_core::ErrorKind::ExecSpawn,
            JobError::CodeMod(CodeModError::Interrupted) => ew_core::ErrorKind::Preempted,
            JobError::CodeMod(_) => ew_core::ErrorKind::ExecFailed,
            JobError::Publish(PublishError::BuildSpawn(_)) => ew_core::ErrorKind::BuildFailed,
            JobError::Publish(PublishError::Sync(_)) => ew_core::ErrorKind::PublishFailed,
            JobError::Callback(_) | JobError::Queue(_) => ew_core::ErrorKind::Internal,
            JobError::Preempted(_) => ew_core::ErrorKind::Preempted,
        }
    }
}
