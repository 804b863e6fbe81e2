// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The tenancy and job-lifecycle data model (§3.1).

use crate::id::{MessageId, ProjectId, TaskToken, ThreadId, UserId, WorkerId};
use crate::tenant::TenantKey;
use serde::{Deserialize, Serialize};

/// Ownership record in the Claim Registry — one per tenant while owned.
///
/// Presence of a non-expired record (`now <= ttl_at`) is the sole signal of
/// ownership; `status` exists only for forward-compatible wire shape (§3.1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipRecord {
    pub tenant_key: TenantKey,
    pub worker_id: WorkerId,
    pub claimed_at_ms: u64,
    pub last_activity_ms: u64,
    pub ttl_at_secs: u64,
    pub status: OwnershipStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipStatus {
    Active,
}

crate::simple_display!(OwnershipStatus { Active => "active" });

impl OwnershipRecord {
    pub fn new(tenant_key: TenantKey, worker_id: WorkerId, now_ms: u64, ttl_secs: u64) -> Self {
        Self {
            tenant_key,
            worker_id,
            claimed_at_ms: now_ms,
            last_activity_ms: now_ms,
            ttl_at_secs: now_ms / 1000 + ttl_secs,
            status: OwnershipStatus::Active,
        }
    }

    /// True iff `now_epoch_secs` is past this record's TTL — i.e. the
    /// record is self-healing-eligible and may be overwritten by any worker.
    pub fn is_expired(&self, now_epoch_secs: u64) -> bool {
        now_epoch_secs > self.ttl_at_secs
    }

    /// Produce a refreshed copy with a new `last_activity`/`ttl_at`, keeping
    /// identity fields. Caller is responsible for the conditional write.
    pub fn refreshed(&self, now_ms: u64, ttl_secs: u64) -> Self {
        Self {
            last_activity_ms: now_ms,
            ttl_at_secs: now_ms / 1000 + ttl_secs,
            ..self.clone()
        }
    }
}

/// Active-Job record — one per tenant while a job runs (§3.1).
///
/// Its *presence*, not its fields, is the authoritative "is this tenant
/// busy?" signal (§9 "Open question — dual active-jobs semantics"); the
/// TTL exists purely so a crashed worker's record does not linger forever.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveJobRecord {
    pub tenant_key: TenantKey,
    pub message_id: MessageId,
    pub task_token: TaskToken,
    pub lease_handle: String,
    pub thread_id: ThreadId,
    pub worker_id: WorkerId,
    pub started_at_ms: u64,
    pub ttl_at_secs: u64,
}

impl ActiveJobRecord {
    pub fn new(
        tenant_key: TenantKey,
        message_id: MessageId,
        task_token: TaskToken,
        lease_handle: String,
        thread_id: ThreadId,
        worker_id: WorkerId,
        now_ms: u64,
        ttl_secs: u64,
    ) -> Self {
        Self {
            tenant_key,
            message_id,
            task_token,
            lease_handle,
            thread_id,
            worker_id,
            started_at_ms: now_ms,
            ttl_at_secs: now_ms / 1000 + ttl_secs,
        }
    }

    pub fn refreshed(&self, now_ms: u64, ttl_secs: u64) -> Self {
        Self { ttl_at_secs: now_ms / 1000 + ttl_secs, ..self.clone() }
    }
}

/// A work message dequeued from the tenant's FIFO work queue (§3.1, §6.1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkMessage {
    pub task_token: TaskToken,
    pub message_id: MessageId,
    pub project_id: ProjectId,
    pub user_id: UserId,
    pub thread_id: ThreadId,
    pub instruction: String,
    pub repo_url: String,
    #[serde(default)]
    pub attachments: Vec<String>,
    /// Queue-provider handle used to extend visibility / delete the message.
    #[serde(default)]
    pub receipt_handle: String,
}

/// A preempt message delivered out-of-band on the tenant's preempt queue
/// (§3.1, §6.1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreemptMessage {
    pub reason: String,
    pub interrupting_message_id: Option<MessageId>,
    pub new_thread_id: Option<ThreadId>,
    pub timestamp_ms: u64,
    #[serde(default)]
    pub receipt_handle: String,
}

#[cfg(test)]
#[path = "records_tests.rs"]
mod tests;
