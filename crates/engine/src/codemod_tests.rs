use super::*;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use tempfile::{tempdir, NamedTempFile};

/// Write an executable shell script that ignores whatever arguments the
/// runner passes it, standing in for the real code-mod CLI.
fn script(body: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "#!/bin/sh").unwrap();
    writeln!(file, "{body}").unwrap();
    file.flush().unwrap();
    let mut perms = file.as_file().metadata().unwrap().permissions();
    perms.set_mode(0o755);
    file.as_file().set_permissions(perms).unwrap();
    file
}

#[tokio::test]
async fn run_accumulates_assistant_text_and_result_metadata() {
    let bin = script(
        r#"
echo '{"type":"system","sessionId":"abc12345"}'
echo '{"type":"assistant","content":[{"type":"text","text":"Hello "}]}'
echo '{"type":"assistant","content":[{"type":"text","text":"world"}]}'
echo '{"type":"result","subtype":"success","totalCostUsd":0.05,"durationMs":1200}'
exit 0
"#,
    );
    let runner = CodeModRunner::with_binary(bin.path().display().to_string());
    let workdir = tempdir().unwrap();

    let outcome = runner.run(workdir.path(), "do the thing", CancellationToken::new()).await.unwrap();
    assert_eq!(outcome.output, "Hello world");
    assert_eq!(outcome.session_id, Some("abc12345".to_string()));
    assert_eq!(outcome.cost_usd, Some(0.05));
    assert_eq!(outcome.duration_ms, Some(1200));
}

#[tokio::test]
async fn run_ignores_unparsable_lines_and_keeps_going() {
    let bin = script(
        r#"
echo 'not json at all'
echo '{"type":"assistant","content":[{"type":"text","text":"ok"}]}'
exit 0
"#,
    );
    let runner = CodeModRunner::with_binary(bin.path().display().to_string());
    let workdir = tempdir().unwrap();

    let outcome = runner.run(workdir.path(), "instr", CancellationToken::new()).await.unwrap();
    assert_eq!(outcome.output, "ok");
}

#[tokio::test]
async fn run_fails_with_exec_failed_on_nonzero_exit() {
    let bin = script("exit 7");
    let runner = CodeModRunner::with_binary(bin.path().display().to_string());
    let workdir = tempdir().unwrap();

    let err = runner.run(workdir.path(), "instr", CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, CodeModError::ExecFailed(Some(7))));
}

#[tokio::test]
async fn run_fails_with_spawn_error_for_missing_binary() {
    let runner = CodeModRunner::with_binary("/nonexistent/binary/path");
    let workdir = tempdir().unwrap();

    let err = runner.run(workdir.path(), "instr", CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, CodeModError::Spawn(_)));
}

#[tokio::test]
async fn run_returns_interrupted_when_cancelled_and_force_kills_after_grace_period() {
    let bin = script(
        r#"
trap '' INT
sleep 10
"#,
    );
    let runner = CodeModRunner::with_binary(bin.path().display().to_string());
    let workdir = tempdir().unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let start = std::time::Instant::now();
    let err = runner.run(workdir.path(), "instr", cancel).await.unwrap_err();
    assert!(matches!(err, CodeModError::Interrupted));
    assert!(start.elapsed() < Duration::from_secs(9), "should force-kill at the 5s grace deadline");
}
