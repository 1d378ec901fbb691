//! Sliding-window admission control over the shared store.
//!
//! Each (client, action class) pair owns a window of event timestamps;
//! a check prunes stale events, counts the survivors, and inserts the new
//! event only when the count is under the limit. The whole batch executes
//! atomically in the backend, so concurrent callers can never both observe
//! `count < limit` and both be admitted past it.
//!
//! If the store is unreachable the limiter fails open: availability over
//! strictness for a public, low-stakes endpoint.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::epoch_ms;
use crate::identity::ClientId;
use crate::keys;
use crate::metrics::Metrics;
use crate::settings::RateLimitConfig;
use crate::store::SharedStore;

/// Expired window keys linger this long past the window before the store
/// garbage-collects them.
const GC_BUFFER: Duration = Duration::from_secs(60);

/// A named action class with its `(limit, window)` pair. Windows for
/// different actions are fully independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    pub action: &'static str,
    pub limit: u32,
    pub window: Duration,
}

impl RateLimitRule {
    /// Claims of new slugs, default 10 per hour.
    pub fn claim_create(cfg: &RateLimitConfig) -> Self {
        Self {
            action: "claim_create",
            limit: cfg.claims_per_hour,
            window: Duration::from_secs(3_600),
        }
    }

    /// Availability pre-flight checks, default 60 per minute.
    pub fn availability_check(cfg: &RateLimitConfig) -> Self {
        Self {
            action: "availability_check",
            limit: cfg.checks_per_minute,
            window: Duration::from_secs(60),
        }
    }
}

/// Outcome of an admission check. A denial always carries a
/// machine-readable retry hint in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied { retry_after_secs: u64 },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }

    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Decision::Allowed => None,
            Decision::Denied { retry_after_secs } => Some(*retry_after_secs),
        }
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn SharedStore>,
    metrics: Arc<Metrics>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn SharedStore>, metrics: Arc<Metrics>) -> Self {
        Self { store, metrics }
    }

    pub async fn check(&self, client: &ClientId, rule: &RateLimitRule) -> Decision {
        self.check_at(client, rule, epoch_ms()).await
    }

    /// Deterministic variant taking an explicit `now`.
    pub async fn check_at(&self, client: &ClientId, rule: &RateLimitRule, now_ms: i64) -> Decision {
        let key = keys::rate_limit_key(rule.action, client);
        let window_ms = rule.window.as_millis() as i64;
        let decision = match self
            .store
            .window_admit(&key, now_ms, window_ms, rule.limit, rule.window + GC_BUFFER)
            .await
        {
            Ok(outcome) if outcome.admitted => Decision::Allowed,
            Ok(outcome) => {
                let retry_after_secs = match outcome.oldest_ms {
                    Some(oldest_ms) => {
                        let remaining_ms = (oldest_ms + window_ms - now_ms).max(0);
                        (remaining_ms / 1_000) as u64 + 1
                    }
                    // The window was emptied between count and read-back;
                    // fall back to the full window.
                    None => rule.window.as_secs(),
                };
                Decision::Denied {
                    retry_after_secs: retry_after_secs.max(1),
                }
            }
            Err(e) => {
                warn!(
                    action = rule.action,
                    client = client.as_str(),
                    error = %e,
                    "rate limit store unavailable, failing open"
                );
                Decision::Allowed
            }
        };
        self.metrics
            .record_admission(rule.action, decision.is_allowed());
        decision
    }
}
