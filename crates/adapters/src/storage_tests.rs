use super::*;

#[test]
fn sync_outcome_default_is_empty_and_incomplete() {
    let outcome = SyncOutcome::default();
    assert_eq!(outcome.uploaded, 0);
    assert_eq!(outcome.deleted, 0);
    assert!(!outcome.completed);
}

#[test]
fn storage_error_non_zero_exit_reports_code() {
    let err = StorageError::NonZeroExit(2);
    assert!(err.to_string().contains('2'));
}

#[tokio::test]
async fn sync_reports_spawn_error_for_missing_binary() {
    let syncer = CliObjectStorageSyncer::with_binary("definitely-not-a-real-binary-xyz");
    let result = syncer
        .sync(Path::new("/tmp"), "some-bucket", "us-west-2", CancellationToken::new())
        .await;
    assert!(matches!(result, Err(StorageError::Spawn(_))));
}
