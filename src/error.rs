//! Error taxonomy exposed to the request layer.
//!
//! Infrastructure faults on the limiter and cache never reach here; those
//! paths fail open and fail miss respectively. [`CoreError::Storage`] only
//! means the System of Record itself could not record a claim.

use thiserror::Error;

use crate::claim::{ClaimError, ConflictKind};
use crate::queue::QueueError;
use crate::rate_limit::Decision;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Bad slug format; never retried, never cached
    #[error("invalid request: {0}")]
    Validation(String),
    /// Rate limited; carries a machine-readable retry hint
    #[error("rate limited, retry after {retry_after_secs}s")]
    AdmissionDenied { retry_after_secs: u64 },
    /// The slug is claimed, either known-taken or lost in a race
    #[error("slug conflict: {0}")]
    Conflict(ConflictKind),
    /// The System of Record failed; fatal to this request
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("job not found: {0}")]
    JobNotFound(String),
    /// A queued claim failed; carries the operation's error verbatim
    #[error("job failed: {0}")]
    JobFailed(String),
}

impl From<ClaimError> for CoreError {
    fn from(e: ClaimError) -> Self {
        match e {
            ClaimError::Validation(reason) => CoreError::Validation(reason),
            ClaimError::Conflict(kind) => CoreError::Conflict(kind),
            ClaimError::NotFound => CoreError::Validation("no active claim for that slug".into()),
            ClaimError::TokenMismatch => CoreError::Validation("edit token mismatch".into()),
            ClaimError::Records(msg) | ClaimError::Aborted(msg) => CoreError::Storage(msg),
        }
    }
}

impl From<QueueError> for CoreError {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::NotFound(id) => CoreError::JobNotFound(id),
            other => CoreError::Storage(other.to_string()),
        }
    }
}

impl Decision {
    /// Convert a denial into the structured rejection the request layer
    /// surfaces. Calling this on an allowed decision is a logic error and
    /// reports a zero-second retry hint.
    pub fn denied_error(&self) -> CoreError {
        CoreError::AdmissionDenied {
            retry_after_secs: self.retry_after_secs().unwrap_or(0),
        }
    }
}
