// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Trait boundaries for the core's external collaborators (§1 "contracts
//! only"): the Claim Registry Client (C1), the Queue Client (C2), the
//! Orchestrator Callback Client (C3), and the object-storage syncer used by
//! the Publisher (C6).
//!
//! Each boundary ships a `reqwest`-backed production implementation and,
//! behind the `test-support` feature, an in-memory fake so `ew-engine` and
//! `ew-worker` can exercise the Job Controller and Tenancy Supervisor
//! without live network access.

pub mod active_jobs;
pub mod callback;
pub mod claim;
pub mod http;
pub mod queue;
pub mod storage;

pub use active_jobs::{ActiveJobError, ActiveJobStore, HttpActiveJobStore};
pub use callback::{CallbackError, HttpCallbackClient, OrchestratorCallbackClient};
pub use claim::{ClaimError, ClaimOutcome, ClaimRegistryClient, HttpClaimRegistryClient};
pub use queue::{HttpQueueClient, QueueClient, QueueError, QueueName};
pub use storage::{CliObjectStorageSyncer, ObjectStorageSyncer, StorageError, SyncOutcome};

#[cfg(any(test, feature = "test-support"))]
pub mod fake;
