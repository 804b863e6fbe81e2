// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Liveness-oriented process metrics (§C.3): counts of claims won/lost and
//! jobs completed/preempted/failed. Ambient observability the core carries
//! even though cross-tenant coordination is out of scope — this is purely
//! per-process self-reporting, read by nothing but logs/`Debug` today.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct Metrics {
    claims_won: AtomicU64,
    claims_lost: AtomicU64,
    jobs_completed: AtomicU64,
    jobs_preempted: AtomicU64,
    jobs_failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub claims_won: u64,
    pub claims_lost: u64,
    pub jobs_completed: u64,
    pub jobs_preempted: u64,
    pub jobs_failed: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim_won(&self) {
        self.claims_won.fetch_add(1, Ordering::Relaxed);
    }

    pub fn claim_lost(&self) {
        self.claims_lost.fetch_add(1, Ordering::Relaxed);
    }

    pub fn job_completed(&self) {
        self.jobs_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn job_preempted(&self) {
        self.jobs_preempted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn job_failed(&self) {
        self.jobs_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            claims_won: self.claims_won.load(Ordering::Relaxed),
            claims_lost: self.claims_lost.load(Ordering::Relaxed),
            jobs_completed: self.jobs_completed.load(Ordering::Relaxed),
            jobs_preempted: self.jobs_preempted.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
