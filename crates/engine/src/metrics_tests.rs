use super::*;

#[test]
fn snapshot_reflects_recorded_events() {
    let metrics = Metrics::new();
    metrics.claim_won();
    metrics.claim_won();
    metrics.claim_lost();
    metrics.job_completed();
    metrics.job_preempted();
    metrics.job_failed();
    metrics.job_failed();

    assert_eq!(
        metrics.snapshot(),
        MetricsSnapshot {
            claims_won: 2,
            claims_lost: 1,
            jobs_completed: 1,
            jobs_preempted: 1,
            jobs_failed: 2,
        }
    );
}

#[test]
fn fresh_metrics_snapshot_is_all_zero() {
    assert_eq!(Metrics::new().snapshot(), MetricsSnapshot::default());
}
