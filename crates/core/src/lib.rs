// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Core data model for the Edit Worker Core.
//!
//! This crate has no I/O. It defines the tenancy/job/workspace data model
//! (ownership records, active-job records, queue message shapes, job
//! results), the identity/path resolver that every other crate must route
//! name construction through, the commit-message formatter, and small
//! testable-time/backoff utilities.

pub mod backoff;
pub mod clock;
pub mod commit;
pub mod id;
mod macros;
pub mod records;
pub mod result;
pub mod tenant;

pub use backoff::{backoff_delay, BackoffPolicy};
pub use clock::{Clock, FakeClock, SystemClock};
pub use commit::{format_commit_message, CommitInput};
pub use id::{MessageId, ProjectId, TaskToken, ThreadId, UserId, WorkerId};
pub use records::{
    ActiveJobRecord, OwnershipRecord, OwnershipStatus, PreemptMessage, WorkMessage,
};
pub use result::{ErrorKind, JobResult};
pub use tenant::{
    branch_name, bucket_name, preempt_queue_url, tenant_key, work_dir, work_queue_url, TenantKey,
};
