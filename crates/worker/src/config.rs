// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Config & Shutdown (C10, §4.10): a single immutable configuration struct
//! populated once at process startup from environment variables. Every
//! option in §4.10's table has a corresponding `EWCORE_*` variable here;
//! unset variables fall back to the documented default.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{variable} must be a valid {expected}, got {value:?}")]
    Invalid { variable: &'static str, expected: &'static str, value: String },
    #[error("{0} is required and was not set")]
    Missing(&'static str),
}

/// Populated once from the environment at startup (§4.10). Nothing in the
/// worker reads `std::env` after [`Config::from_env`] returns.
#[derive(Debug, Clone)]
pub struct Config {
    pub workspace_root: PathBuf,
    pub region: String,
    pub account_id: String,
    pub claim_ttl_secs: u64,
    pub refresh_interval_secs: u64,
    pub idle_timeout_ms: u64,
    pub heartbeat_interval_secs: u64,
    pub lease_extend_interval_mins: u64,
    pub lease_extend_secs: u64,
    pub work_poll_wait_secs: u64,
    pub preempt_poll_wait_secs: u64,
    pub code_mod_max_turns: u32,
    pub code_mod_output_tok_cap: u32,
    pub git_push_enabled: bool,
    pub git_push_retries: u32,
    pub unclaimed_queue_url: String,
    pub claim_registry_base_url: String,
    pub active_job_store_base_url: String,
    pub orchestrator_callback_base_url: String,
}

impl Config {
    /// Read every recognized `EWCORE_*` variable, falling back to the
    /// §4.10 default when unset. `ACCOUNT_ID` and the three collaborator
    /// base URLs have no sensible default and are required.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            workspace_root: path_var("EWCORE_WORKSPACE_ROOT", "/workspace"),
            region: string_var("EWCORE_REGION", "us-west-2"),
            account_id: required_string_var("EWCORE_ACCOUNT_ID")?,
            claim_ttl_secs: u64_var("EWCORE_CLAIM_TTL_SECS", 3600)?,
            refresh_interval_secs: u64_var("EWCORE_REFRESH_INTERVAL_SECS", 30)?,
            idle_timeout_ms: u64_var("EWCORE_IDLE_TIMEOUT_MS", 300_000)?,
            heartbeat_interval_secs: u64_var("EWCORE_HEARTBEAT_INTERVAL_SECS", 30)?,
            lease_extend_interval_mins: u64_var("EWCORE_LEASE_EXTEND_INTERVAL_MINS", 50)?,
            lease_extend_secs: u64_var("EWCORE_LEASE_EXTEND_SECS", 3600)?,
            work_poll_wait_secs: u64_var("EWCORE_WORK_POLL_WAIT_SECS", 20)?,
            preempt_poll_wait_secs: u64_var("EWCORE_PREEMPT_POLL_WAIT_SECS", 5)?,
            code_mod_max_turns: u32_var("EWCORE_CODE_MOD_MAX_TURNS", 3)?,
            code_mod_output_tok_cap: u32_var("EWCORE_CODE_MOD_OUTPUT_TOK_CAP", 4096)?,
            git_push_enabled: bool_var("EWCORE_GIT_PUSH_ENABLED", true)?,
            git_push_retries: u32_var("EWCORE_GIT_PUSH_RETRIES", 3)?,
            unclaimed_queue_url: required_string_var("EWCORE_UNCLAIMED_QUEUE_URL")?,
            claim_registry_base_url: required_string_var("EWCORE_CLAIM_REGISTRY_URL")?,
            active_job_store_base_url: required_string_var("EWCORE_ACTIVE_JOB_STORE_URL")?,
            orchestrator_callback_base_url: required_string_var("EWCORE_ORCHESTRATOR_CALLBACK_URL")?,
        })
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn lease_extend_interval(&self) -> Duration {
        Duration::from_secs(self.lease_extend_interval_mins * 60)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}

fn string_var(name: &'static str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn required_string_var(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn path_var(name: &'static str, default: &str) -> PathBuf {
    std::env::var(name).map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(default))
}

fn u64_var(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::Invalid { variable: name, expected: "u64", value: raw }),
        Err(_) => Ok(default),
    }
}

fn u32_var(name: &'static str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::Invalid { variable: name, expected: "u32", value: raw }),
        Err(_) => Ok(default),
    }
}

fn bool_var(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            _ => Err(ConfigError::Invalid { variable: name, expected: "bool", value: raw }),
        },
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
