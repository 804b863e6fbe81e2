use super::*;
use serial_test::serial;

const REQUIRED: &[(&str, &str)] = &[
    ("EWCORE_ACCOUNT_ID", "123456789012"),
    ("EWCORE_UNCLAIMED_QUEUE_URL", "https://queue.example/unclaimed"),
    ("EWCORE_CLAIM_REGISTRY_URL", "https://registry.example"),
    ("EWCORE_ACTIVE_JOB_STORE_URL", "https://registry.example/active-jobs"),
    ("EWCORE_ORCHESTRATOR_CALLBACK_URL", "https://orchestrator.example"),
];

const ALL_VARS: &[&str] = &[
    "EWCORE_ACCOUNT_ID",
    "EWCORE_UNCLAIMED_QUEUE_URL",
    "EWCORE_CLAIM_REGISTRY_URL",
    "EWCORE_ACTIVE_JOB_STORE_URL",
    "EWCORE_ORCHESTRATOR_CALLBACK_URL",
    "EWCORE_WORKSPACE_ROOT",
    "EWCORE_REGION",
    "EWCORE_CLAIM_TTL_SECS",
    "EWCORE_IDLE_TIMEOUT_MS",
    "EWCORE_GIT_PUSH_ENABLED",
    "EWCORE_GIT_PUSH_RETRIES",
];

fn clear_all() {
    for var in ALL_VARS {
        std::env::remove_var(var);
    }
}

fn set_required() {
    for (name, value) in REQUIRED {
        std::env::set_var(name, value);
    }
}

#[test]
#[serial]
fn defaults_match_the_documented_table_when_only_required_vars_are_set() {
    clear_all();
    set_required();

    let config = Config::from_env().unwrap();

    assert_eq!(config.workspace_root, PathBuf::from("/workspace"));
    assert_eq!(config.region, "us-west-2");
    assert_eq!(config.claim_ttl_secs, 3600);
    assert_eq!(config.refresh_interval_secs, 30);
    assert_eq!(config.idle_timeout_ms, 300_000);
    assert_eq!(config.heartbeat_interval_secs, 30);
    assert_eq!(config.lease_extend_interval_mins, 50);
    assert_eq!(config.lease_extend_secs, 3600);
    assert_eq!(config.work_poll_wait_secs, 20);
    assert_eq!(config.preempt_poll_wait_secs, 5);
    assert_eq!(config.code_mod_max_turns, 3);
    assert_eq!(config.code_mod_output_tok_cap, 4096);
    assert!(config.git_push_enabled);
    assert_eq!(config.git_push_retries, 3);

    clear_all();
}

#[test]
#[serial]
fn missing_required_variable_is_a_config_error() {
    clear_all();

    let err = Config::from_env().unwrap_err();
    assert!(matches!(err, ConfigError::Missing("EWCORE_ACCOUNT_ID")));

    clear_all();
}

#[test]
#[serial]
fn malformed_numeric_variable_is_a_config_error() {
    clear_all();
    set_required();
    std::env::set_var("EWCORE_CLAIM_TTL_SECS", "not-a-number");

    let err = Config::from_env().unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Invalid { variable: "EWCORE_CLAIM_TTL_SECS", expected: "u64", .. }
    ));

    clear_all();
}

#[test]
#[serial]
fn git_push_enabled_accepts_common_boolean_spellings() {
    clear_all();
    set_required();
    std::env::set_var("EWCORE_GIT_PUSH_ENABLED", "false");

    let config = Config::from_env().unwrap();
    assert!(!config.git_push_enabled);

    clear_all();
}

#[test]
#[serial]
fn derived_durations_apply_the_right_unit_conversions() {
    clear_all();
    set_required();

    let config = Config::from_env().unwrap();
    assert_eq!(config.heartbeat_interval(), Duration::from_secs(30));
    assert_eq!(config.lease_extend_interval(), Duration::from_secs(50 * 60));
    assert_eq!(config.idle_timeout(), Duration::from_millis(300_000));

    clear_all();
}
