//! The claim operation.
//!
//! One implementation serves both execution paths: the coordinator's
//! synchronous attempt and the queued job a worker replays later. Because
//! a timed-out synchronous attempt is never cancelled, the same logical
//! claim can execute twice; safety comes from re-validating availability
//! immediately before the irreversible insert, so the losing execution
//! observes the slug as taken and fails cleanly instead of corrupting
//! state.

use std::sync::Arc;
use std::time::Instant;

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::availability::{AvailabilityError, AvailabilityResolver};
use crate::cache::CacheStore;
use crate::epoch_ms;
use crate::keys;
use crate::metrics::Metrics;
use crate::records::{ClaimPayload, RecordStore, RecordStoreError};

const EDIT_TOKEN_LEN: usize = 32;

/// How a conflicting claim was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictKind {
    /// The pre-insert availability check already saw an active claim
    AlreadyTaken,
    /// The check passed but a concurrent claim won the insert race
    LostRace,
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictKind::AlreadyTaken => f.write_str("already taken"),
            ConflictKind::LostRace => f.write_str("lost the claim race"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("invalid slug: {0}")]
    Validation(String),
    #[error("slug conflict: {0}")]
    Conflict(ConflictKind),
    #[error("no active claim for that slug")]
    NotFound,
    #[error("edit token mismatch")]
    TokenMismatch,
    /// The System of Record could not record the claim. Fatal to the
    /// request; no retry guidance beyond "try again".
    #[error("record store failure: {0}")]
    Records(String),
    #[error("claim execution aborted: {0}")]
    Aborted(String),
}

impl From<RecordStoreError> for ClaimError {
    fn from(e: RecordStoreError) -> Self {
        match e {
            RecordStoreError::Duplicate(_) => ClaimError::Conflict(ConflictKind::LostRace),
            other => ClaimError::Records(other.to_string()),
        }
    }
}

impl From<AvailabilityError> for ClaimError {
    fn from(e: AvailabilityError) -> Self {
        match e {
            AvailabilityError::Records(inner) => ClaimError::Records(inner.to_string()),
        }
    }
}

/// A claim to execute: the slug plus the content to store under it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClaimRequest {
    pub slug: String,
    pub payload: ClaimPayload,
    /// Hashed identity of the requesting client, for audit fields
    pub client_hash: String,
}

/// Proof of a successful claim, including the capability token that
/// authorizes later mutation or release.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClaimReceipt {
    pub record_id: u64,
    pub slug: String,
    pub edit_token: String,
    pub created_at_ms: i64,
}

/// Everything the claim operation touches, cheap to clone into a task.
#[derive(Clone)]
pub struct ClaimContext {
    pub resolver: AvailabilityResolver,
    pub records: Arc<dyn RecordStore>,
    pub cache: CacheStore,
    pub metrics: Arc<Metrics>,
}

/// Execute a claim: re-validate, insert, invalidate the cached verdict.
pub async fn execute(ctx: &ClaimContext, request: &ClaimRequest) -> Result<ClaimReceipt, ClaimError> {
    let started = Instant::now();
    let result = execute_inner(ctx, request).await;
    let outcome = match &result {
        Ok(_) => "success",
        Err(ClaimError::Validation(_)) => "validation",
        Err(ClaimError::Conflict(_)) => "conflict",
        Err(_) => "error",
    };
    ctx.metrics
        .record_claim(outcome, started.elapsed().as_secs_f64());
    result
}

async fn execute_inner(
    ctx: &ClaimContext,
    request: &ClaimRequest,
) -> Result<ClaimReceipt, ClaimError> {
    // Race protection: this check runs immediately before the insert on
    // every execution path, which is what makes duplicate execution of the
    // same logical claim converge to one success and one conflict.
    let verdict = ctx.resolver.check(&request.slug).await?;
    if !verdict.available {
        let reason = verdict.reason.unwrap_or_default();
        if ctx.resolver.validate_format(&request.slug).is_err() {
            return Err(ClaimError::Validation(reason));
        }
        if ctx.resolver.is_reserved(&request.slug) {
            return Err(ClaimError::Validation(reason));
        }
        return Err(ClaimError::Conflict(ConflictKind::AlreadyTaken));
    }

    let edit_token = generate_edit_token();
    let record = ctx
        .records
        .insert_claim(&request.slug, &request.payload, &edit_token, epoch_ms())
        .await?;

    // Delete, never overwrite: a stale verdict must not outlive the claim.
    ctx.cache.delete(&keys::verdict_key(&request.slug)).await;

    info!(
        slug = %record.slug,
        record_id = record.id,
        client = %request.client_hash,
        "slug claimed"
    );
    Ok(ClaimReceipt {
        record_id: record.id,
        slug: record.slug,
        edit_token: record.edit_token,
        created_at_ms: record.created_at_ms,
    })
}

/// Release a claim, freeing its slug. Requires the capability token issued
/// at claim time. Deletes the cached verdict so "taken" can flip back to
/// "available" immediately.
pub async fn release(ctx: &ClaimContext, slug: &str, edit_token: &str) -> Result<(), ClaimError> {
    let record = ctx
        .records
        .read_by_slug(slug)
        .await
        .map_err(|e| ClaimError::Records(e.to_string()))?
        .ok_or(ClaimError::NotFound)?;
    if record.edit_token != edit_token {
        return Err(ClaimError::TokenMismatch);
    }
    ctx.records
        .soft_delete(record.id)
        .await
        .map_err(|e| ClaimError::Records(e.to_string()))?;
    ctx.cache.delete(&keys::verdict_key(slug)).await;
    debug!(slug, record_id = record.id, "slug released");
    Ok(())
}

fn generate_edit_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(EDIT_TOKEN_LEN)
        .map(char::from)
        .collect()
}
