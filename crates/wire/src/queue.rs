// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue message shapes (§3.1, §6.1). These mirror the JSON a queue
//! provider actually hands back — camelCase field names — and convert into
//! `ew_core`'s domain records, which use the crate's own naming.

use ew_core::{MessageId, ProjectId, TaskToken, ThreadId, UserId, WorkMessage, PreemptMessage};
use serde::{Deserialize, Serialize};

/// A raw queue receive result: the provider-assigned receipt handle plus
/// whatever body the queue carried. `T` is one of [`WorkQueueMessage`] or
/// [`PreemptQueueMessage`].
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedMessage<T> {
    pub receipt_handle: String,
    pub body: T,
}

/// Wire shape of a "Work message" (§3.1, §6.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkQueueMessage {
    pub task_token: TaskToken,
    pub message_id: MessageId,
    pub project_id: ProjectId,
    pub user_id: UserId,
    pub thread_id: ThreadId,
    pub instruction: String,
    pub repo_url: String,
    #[serde(default)]
    pub attachments: Vec<String>,
}

impl QueuedMessage<WorkQueueMessage> {
    /// Fold the receipt handle into the domain type so downstream
    /// components only deal with one `WorkMessage` shape.
    pub fn into_domain(self) -> WorkMessage {
        WorkMessage {
            task_token: self.body.task_token,
            message_id: self.body.message_id,
            project_id: self.body.project_id,
            user_id: self.body.user_id,
            thread_id: self.body.thread_id,
            instruction: self.body.instruction,
            repo_url: self.body.repo_url,
            attachments: self.body.attachments,
            receipt_handle: self.receipt_handle,
        }
    }
}

/// Wire shape of a "Preempt message" (§3.1, §6.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreemptQueueMessage {
    pub reason: String,
    #[serde(default)]
    pub interrupting_message_id: Option<MessageId>,
    #[serde(default)]
    pub new_thread_id: Option<ThreadId>,
    pub timestamp: u64,
}

impl QueuedMessage<PreemptQueueMessage> {
    pub fn into_domain(self) -> PreemptMessage {
        PreemptMessage {
            reason: self.body.reason,
            interrupting_message_id: self.body.interrupting_message_id,
            new_thread_id: self.body.new_thread_id,
            timestamp_ms: self.body.timestamp,
            receipt_handle: self.receipt_handle,
        }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
