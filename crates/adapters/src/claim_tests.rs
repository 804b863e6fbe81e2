use super::*;
use ew_core::{ProjectId, UserId};

#[test]
fn tenant_key_hash_is_escaped_in_urls() {
    let key = ew_core::tenant_key(&ProjectId::from("amelia"), &UserId::from("scott"));
    assert_eq!(urlencoding_safe(key.as_str()), "amelia%23scott");
}

#[test]
fn item_to_record_rejects_unknown_status() {
    let item = OwnershipItem {
        tenant_key: "amelia#scott".to_string(),
        worker_id: WorkerId::from_string("wrk-1"),
        claimed_at: 0,
        last_activity: 0,
        ttl_at: 60,
        status: "retired".to_string(),
    };
    assert!(item_to_record(item).is_err());
}

#[test]
fn item_to_record_converts_active_record() {
    let item = OwnershipItem {
        tenant_key: "amelia#scott".to_string(),
        worker_id: WorkerId::from_string("wrk-1"),
        claimed_at: 0,
        last_activity: 0,
        ttl_at: 60,
        status: "active".to_string(),
    };
    let record = item_to_record(item).unwrap();
    assert_eq!(record.tenant_key.as_str(), "amelia#scott");
    assert_eq!(record.ttl_at_secs, 60);
}

#[test]
fn claim_outcome_already_owned_is_distinct_from_claimed() {
    assert_ne!(ClaimOutcome::Claimed, ClaimOutcome::AlreadyOwned);
}
