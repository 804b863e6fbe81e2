// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identity/Path Resolver (§4.9).
//!
//! Every path, branch name, bucket name, and queue URL construction in the
//! worker routes through this module. Ad-hoc string concatenation elsewhere
//! would defeat the tenancy isolation invariant the rest of the system
//! relies on, so these are the only functions allowed to build these names.

use crate::id::{ProjectId, ThreadId, UserId};
use std::path::{Path, PathBuf};

/// Primary identity of a tenant: `"<projectId>#<userId>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct TenantKey(String);

impl TenantKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reconstruct a tenant key already rendered as `"<projectId>#<userId>"`.
    ///
    /// Only meant for adapter boundaries translating a wire record back
    /// into the domain type; normal call sites should go through
    /// [`tenant_key`] so the `"#"` separator stays in one place.
    pub fn from_string(rendered: impl Into<String>) -> Self {
        Self(rendered.into())
    }
}

impl std::fmt::Display for TenantKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Derive the tenant key from a project/user pair.
pub fn tenant_key(project: &ProjectId, user: &UserId) -> TenantKey {
    TenantKey(format!("{}#{}", project.as_str(), user.as_str()))
}

/// Resolve the local workspace path for a tenant's clone of `repo_url`.
///
/// `<root>/<projectId>/<userId>/<repoName>` where `repoName` is the
/// trailing path segment of `repo_url` with a trailing `.git` stripped,
/// falling back to `"workspace"` when the URL has no derivable segment.
pub fn work_dir(root: &Path, project: &ProjectId, user: &UserId, repo_url: &str) -> PathBuf {
    root.join(project.as_str()).join(user.as_str()).join(repo_name(repo_url))
}

/// Derive a filesystem-safe repo name from a git remote URL.
///
/// Prefer the URL-derived name uniformly. Implementers should not carry
/// forward a hard-coded repo-name fallback for any particular project; the
/// only fallback is the generic `"workspace"` name used when no segment can
/// be derived at all (§9 "Open question — repo-name derivation").
fn repo_name(repo_url: &str) -> String {
    let trimmed = repo_url.trim_end_matches('/');
    let last_segment = trimmed.rsplit('/').next().unwrap_or("");
    let name = last_segment.strip_suffix(".git").unwrap_or(last_segment);
    if name.is_empty() {
        "workspace".to_string()
    } else {
        name.to_string()
    }
}

/// Derive the branch name for a chat thread: `thread-<threadId>`.
///
/// Already-prefixed IDs are not double-prefixed.
pub fn branch_name(thread: &ThreadId) -> String {
    let id = thread.as_str();
    if let Some(stripped) = id.strip_prefix("thread-") {
        format!("thread-{stripped}")
    } else {
        format!("thread-{id}")
    }
}

/// Derive the object-storage bucket name for a project's published site.
pub fn bucket_name(project: &ProjectId) -> String {
    format!("edit.{}.webordinary.com", project.as_str())
}

/// Derive the strict-ordered FIFO work-queue URL for a tenant (§6.1).
pub fn work_queue_url(region: &str, account_id: &str, project: &ProjectId, user: &UserId) -> String {
    format!(
        "https://sqs.{region}.amazonaws.com/{account_id}/webordinary-input-{}-{}.fifo",
        project.as_str(),
        user.as_str()
    )
}

/// Derive the standard preempt-queue URL for a tenant (§6.1).
pub fn preempt_queue_url(
    region: &str,
    account_id: &str,
    project: &ProjectId,
    user: &UserId,
) -> String {
    format!(
        "https://sqs.{region}.amazonaws.com/{account_id}/webordinary-interrupts-{}-{}",
        project.as_str(),
        user.as_str()
    )
}

#[cfg(test)]
#[path = "tenant_tests.rs"]
mod tests;
