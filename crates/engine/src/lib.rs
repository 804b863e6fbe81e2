// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The job-processing engine: the Code-Mod Runner (C5), the Publisher
//! (C6), and the Job Controller (C7) that drives a work message through
//! both of them (§4.5–§4.7).

pub mod codemod;
pub mod error;
pub mod job;
pub mod metrics;
pub mod publish;

pub use codemod::{CodeModEngine, CodeModOutcome, CodeModRunner};
pub use error::{CodeModError, JobError, PublishError};
pub use job::{JobController, JobControllerConfig, JobOutcome, PreemptHandle};
pub use metrics::{Metrics, MetricsSnapshot};
pub use publish::{BuildOutcome, Publisher};

#[cfg(any(test, feature = "test-support"))]
pub mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeCodeModEngine, FakeCodeModResult};
