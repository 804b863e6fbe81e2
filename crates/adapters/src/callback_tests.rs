use super::*;

#[test]
fn callback_error_timeout_displays_clearly() {
    assert_eq!(CallbackError::Timeout.to_string(), "callback request timed out");
}

#[test]
fn callback_error_unexpected_status_includes_code() {
    let err = CallbackError::UnexpectedStatus(500);
    assert!(err.to_string().contains("500"));
}

#[test]
fn http_callback_client_builds_task_scoped_urls() {
    let client = HttpCallbackClient::new("https://orchestrator.example");
    assert_eq!(client.url("succeed"), "https://orchestrator.example/tasks/succeed");
    assert_eq!(client.url("fail"), "https://orchestrator.example/tasks/fail");
}
