// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Claim Registry Client (C1, §4.1).

use std::time::Duration;

use async_trait::async_trait;
use ew_core::{OwnershipRecord, OwnershipStatus, TenantKey, WorkerId};
use ew_wire::OwnershipItem;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::http::with_timeout;

/// The claim/refresh/release/lookup suspension points get a 5 s deadline
/// (§5).
const CLAIM_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("claim registry request timed out")]
    Timeout,
    #[error("claim registry transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("claim registry returned malformed record: {0}")]
    MalformedRecord(String),
    #[error("claim registry returned unexpected status {0}")]
    UnexpectedStatus(u16),
}

/// Outcome of a `claim` attempt. `AlreadyOwned` is expected and non-fatal
/// (§4.1 "Failure semantics") — callers must not treat it as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed,
    AlreadyOwned,
}

#[async_trait]
pub trait ClaimRegistryClient: Send + Sync {
    async fn claim(
        &self,
        tenant_key: &TenantKey,
        worker_id: &WorkerId,
        ttl_secs: u64,
    ) -> Result<ClaimOutcome, ClaimError>;

    async fn refresh(
        &self,
        tenant_key: &TenantKey,
        worker_id: &WorkerId,
        ttl_secs: u64,
    ) -> Result<(), ClaimError>;

    async fn release(&self, tenant_key: &TenantKey, worker_id: &WorkerId) -> Result<(), ClaimError>;

    async fn lookup(&self, tenant_key: &TenantKey) -> Result<Option<OwnershipRecord>, ClaimError>;
}

/// Production client: a REST-ish facade over the ownership table (§6.3).
/// Conditional semantics (claim-iff-absent-or-expired, refresh/release-iff-
/// worker-matches) are enforced server-side; this client only shapes the
/// request/response.
pub struct HttpClaimRegistryClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpClaimRegistryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { client: crate::http::build_client(), base_url: base_url.into() }
    }

    fn url(&self, tenant_key: &TenantKey, op: &str) -> String {
        format!("{}/ownership/{}/{op}", self.base_url, urlencoding_safe(tenant_key.as_str()))
    }
}

#[async_trait]
impl ClaimRegistryClient for HttpClaimRegistryClient {
    #[instrument(skip(self), fields(tenant_key = %tenant_key))]
    async fn claim(
        &self,
        tenant_key: &TenantKey,
        worker_id: &WorkerId,
        ttl_secs: u64,
    ) -> Result<ClaimOutcome, ClaimError> {
        let body = serde_json::json!({ "workerId": worker_id.as_str(), "ttlSecs": ttl_secs });
        let response = with_timeout(CLAIM_TIMEOUT, async {
            self.client.post(self.url(tenant_key, "claim")).json(&body).send().await
        })
        .await
        .map_err(to_claim_error)?;

        match response.status().as_u16() {
            200 | 201 => Ok(ClaimOutcome::Claimed),
            409 => {
                debug!("claim contended");
                Ok(ClaimOutcome::AlreadyOwned)
            }
            status => Err(ClaimError::UnexpectedStatus(status)),
        }
    }

    #[instrument(skip(self), fields(tenant_key = %tenant_key))]
    async fn refresh(
        &self,
        tenant_key: &TenantKey,
        worker_id: &WorkerId,
        ttl_secs: u64,
    ) -> Result<(), ClaimError> {
        let body = serde_json::json!({ "workerId": worker_id.as_str(), "ttlSecs": ttl_secs });
        let response = with_timeout(CLAIM_TIMEOUT, async {
            self.client.post(self.url(tenant_key, "refresh")).json(&body).send().await
        })
        .await
        .map_err(to_claim_error)?;
        expect_ok(response)
    }

    #[instrument(skip(self), fields(tenant_key = %tenant_key))]
    async fn release(&self, tenant_key: &TenantKey, worker_id: &WorkerId) -> Result<(), ClaimError> {
        let body = serde_json::json!({ "workerId": worker_id.as_str() });
        let response = with_timeout(CLAIM_TIMEOUT, async {
            self.client.post(self.url(tenant_key, "release")).json(&body).send().await
        })
        .await
        .map_err(to_claim_error)?;
        expect_ok(response)
    }

    #[instrument(skip(self), fields(tenant_key = %tenant_key))]
    async fn lookup(&self, tenant_key: &TenantKey) -> Result<Option<OwnershipRecord>, ClaimError> {
        let response = with_timeout(CLAIM_TIMEOUT, async {
            self.client.get(self.url(tenant_key, "")).send().await
        })
        .await
        .map_err(to_claim_error)?;

        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ClaimError::UnexpectedStatus(response.status().as_u16()));
        }
        let item: OwnershipItem =
            with_timeout(CLAIM_TIMEOUT, async { response.json().await }).await.map_err(to_claim_error)?;
        Ok(Some(item_to_record(item)?))
    }
}

fn expect_ok(response: reqwest::Response) -> Result<(), ClaimError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(ClaimError::UnexpectedStatus(response.status().as_u16()))
    }
}

fn item_to_record(item: OwnershipItem) -> Result<OwnershipRecord, ClaimError> {
    if item.status != "active" {
        return Err(ClaimError::MalformedRecord(format!("unknown status {}", item.status)));
    }
    Ok(OwnershipRecord {
        tenant_key: TenantKey::from_string(item.tenant_key),
        worker_id: item.worker_id,
        claimed_at_ms: item.claimed_at,
        last_activity_ms: item.last_activity,
        ttl_at_secs: item.ttl_at,
        status: OwnershipStatus::Active,
    })
}

fn to_claim_error(err: crate::http::TimeoutError<reqwest::Error>) -> ClaimError {
    match err {
        crate::http::TimeoutError::Elapsed => ClaimError::Timeout,
        crate::http::TimeoutError::Inner(e) => ClaimError::Transport(e),
    }
}

/// Minimal path-segment escaping; tenant keys contain `#` which must not
/// reach the URL unescaped.
fn urlencoding_safe(segment: &str) -> String {
    segment.replace('#', "%23")
}

#[cfg(test)]
#[path = "claim_tests.rs"]
mod tests;
