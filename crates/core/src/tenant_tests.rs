use super::*;
use yare::parameterized;

fn p(s: &str) -> ProjectId {
    ProjectId::from(s)
}
fn u(s: &str) -> UserId {
    UserId::from(s)
}
fn t(s: &str) -> ThreadId {
    ThreadId::from(s)
}

#[test]
fn tenant_key_joins_project_and_user_with_hash() {
    assert_eq!(tenant_key(&p("amelia"), &u("scott")).as_str(), "amelia#scott");
}

#[test]
fn tenant_key_is_a_pure_function() {
    assert_eq!(tenant_key(&p("amelia"), &u("scott")), tenant_key(&p("amelia"), &u("scott")));
}

#[parameterized(
    plain = {"https://git.example/acme.git", "acme"},
    no_dot_git = {"https://git.example/acme", "acme"},
    trailing_slash = {"https://git.example/acme.git/", "acme"},
    empty = {"", "workspace"},
    root_only = {"https://git.example/", "workspace"},
)]
fn work_dir_derives_repo_name_from_url(repo_url: &str, expected_repo: &str) {
    let path = work_dir(Path::new("/ws"), &p("amelia"), &u("scott"), repo_url);
    assert_eq!(path, Path::new("/ws/amelia/scott").join(expected_repo));
}

#[test]
fn branch_name_adds_thread_prefix() {
    assert_eq!(branch_name(&t("t1")), "thread-t1");
}

#[test]
fn branch_name_does_not_double_prefix() {
    assert_eq!(branch_name(&t("thread-t1")), "thread-t1");
}

#[test]
fn bucket_name_follows_template() {
    assert_eq!(bucket_name(&p("amelia")), "edit.amelia.webordinary.com");
}

#[test]
fn queue_urls_are_deterministic_templates() {
    let work = work_queue_url("us-west-2", "123456789012", &p("amelia"), &u("scott"));
    assert_eq!(
        work,
        "https://sqs.us-west-2.amazonaws.com/123456789012/webordinary-input-amelia-scott.fifo"
    );
    let preempt = preempt_queue_url("us-west-2", "123456789012", &p("amelia"), &u("scott"));
    assert_eq!(
        preempt,
        "https://sqs.us-west-2.amazonaws.com/123456789012/webordinary-interrupts-amelia-scott"
    );
}
