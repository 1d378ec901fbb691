//! Shared ephemeral store backing the rate limiter, verdict cache, and
//! job queue.
//!
//! The backends surface faults faithfully as [`StoreError`]; degradation
//! policies (fail-open admission, fail-miss caching) belong to the callers.
//! Operations that must be atomic as a unit (the sliding-window
//! prune/count/insert) are expressed as single trait methods so each
//! backend can use its native atomic primitive instead of client-side
//! compare-and-swap loops.

mod memory;
mod redis;

pub use memory::MemoryStore;
pub use redis::RedisStore;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unreachable: {0}")]
    Connection(String),
    #[error("store command failed: {0}")]
    Command(String),
}

/// Outcome of one atomic sliding-window admission batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowDecision {
    /// Whether an event was inserted at `now`
    pub admitted: bool,
    /// Entries in the window after pruning (including the new one if admitted)
    pub count: u32,
    /// Oldest surviving event timestamp; present only on denial
    pub oldest_ms: Option<i64>,
}

#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Atomically prune entries at or before `now_ms - window_ms`, count
    /// the remainder, and insert an event at `now_ms` if the count is
    /// below `limit`, refreshing the key's expiry to `ttl`.
    async fn window_admit(
        &self,
        key: &str,
        now_ms: i64,
        window_ms: i64,
        limit: u32,
        ttl: Duration,
    ) -> Result<WindowDecision, StoreError>;

    async fn cache_get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    async fn cache_set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError>;

    async fn cache_delete(&self, key: &str) -> Result<(), StoreError>;

    async fn cache_exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Push a job id onto the tail of a named FIFO queue.
    async fn queue_push(&self, queue: &str, job_id: &str) -> Result<(), StoreError>;

    /// Pop the next job id, waiting up to `timeout` for one to arrive.
    async fn queue_pop(&self, queue: &str, timeout: Duration)
        -> Result<Option<String>, StoreError>;

    async fn job_put(&self, id: &str, record: &[u8], ttl: Duration) -> Result<(), StoreError>;

    async fn job_get(&self, id: &str) -> Result<Option<Vec<u8>>, StoreError>;
}
