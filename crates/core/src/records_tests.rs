use super::*;

fn key() -> TenantKey {
    crate::tenant::tenant_key(&ProjectId::from("amelia"), &UserId::from("scott"))
}

#[test]
fn ownership_record_expires_strictly_after_ttl() {
    let record = OwnershipRecord::new(key(), WorkerId::generate(), 0, 60);
    assert!(!record.is_expired(60));
    assert!(record.is_expired(61));
}

#[test]
fn ownership_record_refresh_preserves_worker_identity() {
    let worker = WorkerId::generate();
    let record = OwnershipRecord::new(key(), worker.clone(), 0, 60);
    let refreshed = record.refreshed(30_000, 60);
    assert_eq!(refreshed.worker_id, worker);
    assert_eq!(refreshed.ttl_at_secs, 30 + 60);
    assert_eq!(refreshed.claimed_at_ms, 0, "claimed_at is identity, not refreshed");
}

#[test]
fn active_job_record_ttl_tracks_heartbeats() {
    let record = ActiveJobRecord::new(
        key(),
        MessageId::from("m1"),
        TaskToken::from("tt1"),
        "lease-1".to_string(),
        ThreadId::from("t1"),
        WorkerId::generate(),
        0,
        3600,
    );
    let refreshed = record.refreshed(1_800_000, 3600);
    assert_eq!(refreshed.ttl_at_secs, 1800 + 3600);
    assert_eq!(refreshed.message_id, record.message_id);
}

#[test]
fn work_message_deserializes_with_optional_attachments() {
    let json = serde_json::json!({
        "task_token": "tt1",
        "message_id": "m1",
        "project_id": "amelia",
        "user_id": "scott",
        "thread_id": "t1",
        "instruction": "Change heading to 'Hi'",
        "repo_url": "https://git.example/acme.git",
    });
    let msg: WorkMessage = serde_json::from_value(json).unwrap();
    assert!(msg.attachments.is_empty());
    assert_eq!(msg.instruction, "Change heading to 'Hi'");
}
