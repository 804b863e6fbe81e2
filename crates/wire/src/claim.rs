// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Claim-registry wire shapes: the unclaimed-queue request (§4.8.1, §6.1)
//! and the two record-store item shapes (§6.3).

use ew_core::{MessageId, ProjectId, ThreadId, UserId, WorkerId};
use serde::{Deserialize, Serialize};

/// `{type:"CLAIM_REQUEST", ...}` message on the process-wide unclaimed
/// queue (§4.8.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequestMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    pub project_id: ProjectId,
    pub user_id: UserId,
    pub thread_id: ThreadId,
    pub message_id: MessageId,
    pub queue_url: String,
    pub timestamp: u64,
}

impl ClaimRequestMessage {
    pub const TYPE_TAG: &'static str = "CLAIM_REQUEST";

    pub fn is_claim_request(&self) -> bool {
        self.message_type == Self::TYPE_TAG
    }
}

/// Wire shape of the `ownership` table item (§6.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipItem {
    pub tenant_key: String,
    pub worker_id: WorkerId,
    pub claimed_at: u64,
    pub last_activity: u64,
    pub ttl_at: u64,
    pub status: String,
}

/// Wire shape of the `active-jobs` table item (§6.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveJobItem {
    pub tenant_key: String,
    pub message_id: MessageId,
    pub task_token: String,
    pub lease_handle: String,
    pub thread_id: ThreadId,
    pub worker_id: WorkerId,
    pub started_at: u64,
    pub ttl_at: u64,
}

#[cfg(test)]
#[path = "claim_tests.rs"]
mod tests;
