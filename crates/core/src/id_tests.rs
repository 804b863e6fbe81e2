use super::*;

define_opaque_id! {
    pub struct TestId;
}

#[test]
fn opaque_id_roundtrips_through_display_and_from_string() {
    let id = TestId::from("abc-123");
    assert_eq!(id.as_str(), "abc-123");
    assert_eq!(id.to_string(), "abc-123");
    assert_eq!(id, TestId::from_string("abc-123".to_string()));
}

#[test]
fn opaque_id_compares_against_str() {
    let id = TestId::from("tid-1");
    assert_eq!(id, *"tid-1");
}

#[test]
fn worker_id_generate_is_prefixed_and_unique() {
    let a = WorkerId::generate();
    let b = WorkerId::generate();
    assert!(a.as_str().starts_with("wrk-"));
    assert_ne!(a, b);
}
