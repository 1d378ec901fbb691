//! claimgate: admission, resolution, and dispatch core for public slug
//! claims.
//!
//! The serving path is three gates in order: a distributed sliding-window
//! [`rate_limit`] check, a cache-aside [`availability`] verdict, and a
//! [`coordinator`] that races the claim against a deadline and falls back
//! to a durable, pollable [`queue`] job consumed by a [`worker`]. The
//! rate limiter, verdict cache, and queue all ride one shared [`store`];
//! the authoritative [`records`] store is external and injected.

pub mod availability;
pub mod cache;
pub mod claim;
pub mod coordinator;
pub mod error;
pub mod identity;
pub mod keys;
pub mod metrics;
pub mod queue;
pub mod rate_limit;
pub mod records;
pub mod service;
pub mod settings;
pub mod store;
pub mod templates;
pub mod trace;
pub mod worker;

pub use availability::{AvailabilityResolver, Verdict};
pub use claim::{ClaimError, ClaimReceipt, ClaimRequest, ConflictKind};
pub use coordinator::{ExecutionCoordinator, Submission};
pub use error::CoreError;
pub use identity::ClientId;
pub use queue::{JobHandle, JobQueue, JobStatus};
pub use rate_limit::{Decision, RateLimitRule, RateLimiter};
pub use records::{ClaimPayload, ClaimRecord, MemoryRecordStore, RecordStore};
pub use service::ClaimService;
pub use settings::AppConfig;
pub use store::{MemoryStore, RedisStore, SharedStore};
pub use templates::{TemplateId, TemplateRegistry};
pub use worker::Worker;

/// Milliseconds since the Unix epoch.
pub(crate) fn epoch_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
