// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exponential backoff with full jitter, shared by every adapter that
//! retries against the claim registry, queues, or orchestrator (§4.1, §C.2).

use std::time::Duration;

use rand::Rng;

/// Base and cap for an exponential-backoff-with-full-jitter schedule.
///
/// `delay(attempt) = uniform(0, min(cap, base * 2^attempt))`, matching the
/// "full jitter" formula from the usual exponential-backoff literature: the
/// whole interval is randomized rather than just its width, so a thundering
/// herd of workers retrying the same failure doesn't re-synchronize.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub cap: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self { base: Duration::from_secs(1), cap: Duration::from_secs(30) }
    }
}

impl BackoffPolicy {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }

    /// Delay to sleep before retry number `attempt` (0-indexed: the delay
    /// before the *first* retry, after the initial attempt already failed).
    pub fn delay(&self, attempt: u32) -> Duration {
        backoff_delay(self.base, self.cap, attempt)
    }
}

/// Pure full-jitter backoff calculation, factored out of [`BackoffPolicy`]
/// so callers without a policy value handy (tests, one-off retries) can
/// still get the exact same curve.
pub fn backoff_delay(base: Duration, cap: Duration, attempt: u32) -> Duration {
    let uncapped = base.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX));
    let ceiling = uncapped.min(cap);
    if ceiling.is_zero() {
        return ceiling;
    }
    let jittered_nanos = rand::thread_rng().gen_range(0..=ceiling.as_nanos());
    Duration::from_nanos(jittered_nanos.min(u64::MAX as u128) as u64)
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
