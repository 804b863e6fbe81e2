use super::*;

#[tokio::test]
async fn run_with_timeout_surfaces_spawn_error_for_missing_binary() {
    let cmd = Command::new("definitely-not-a-real-binary-xyz");
    let err = run_with_timeout(cmd, Duration::from_secs(1), "bogus").await.unwrap_err();
    assert!(matches!(err, GitError::Spawn { .. }));
}

#[tokio::test]
async fn run_with_timeout_times_out_a_slow_command() {
    let mut cmd = Command::new("sleep");
    cmd.arg("5");
    let err = run_with_timeout(cmd, Duration::from_millis(50), "sleep").await.unwrap_err();
    assert!(matches!(err, GitError::Timeout { .. }));
}

#[tokio::test]
async fn run_checked_turns_nonzero_exit_into_command_failed() {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", "echo boom 1>&2; exit 3"]);
    let err = run_checked(cmd, Duration::from_secs(5), "sh").await.unwrap_err();
    match err {
        GitError::CommandFailed { code, stderr, .. } => {
            assert_eq!(code, Some(3));
            assert!(stderr.contains("boom"));
        }
        other => panic!("expected CommandFailed, got {other:?}"),
    }
}
