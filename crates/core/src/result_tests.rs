use super::*;

#[test]
fn error_kind_display_matches_wire_error_code() {
    assert_eq!(ErrorKind::Preempted.to_string(), "PREEMPTED");
    assert_eq!(ErrorKind::ExecSpawn.to_string(), "EXEC_SPAWN");
    assert_eq!(ErrorKind::GitFailed.to_string(), "GIT_FAILED");
}

#[test]
fn error_kind_serializes_to_screaming_snake_case() {
    let json = serde_json::to_string(&ErrorKind::BuildFailed).unwrap();
    assert_eq!(json, "\"BUILD_FAILED\"");
}

#[test]
fn job_result_omits_none_optionals_from_json() {
    let result = JobResult {
        success: true,
        summary: "did the thing".into(),
        build_ok: true,
        publish_ok: true,
        duration_ms: 1200,
        ..Default::default()
    };
    let json = serde_json::to_value(&result).unwrap();
    assert!(json.get("preview_url").is_none());
    assert!(json.get("error_kind").is_none());
    assert_eq!(json["success"], true);
}
