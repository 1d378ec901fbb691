//! Service construction and lifecycle.
//!
//! No module-level singletons: [`ClaimService`] owns the whole graph and
//! is passed into request handlers by the transport layer. `connect`
//! builds the Redis-backed production graph; `with_stores` builds over
//! injected backends for tests and single-node development.

use std::sync::Arc;

use crate::availability::AvailabilityResolver;
use crate::cache::CacheStore;
use crate::claim::ClaimContext;
use crate::coordinator::ExecutionCoordinator;
use crate::metrics::Metrics;
use crate::queue::JobQueue;
use crate::rate_limit::{RateLimiter, RateLimitRule};
use crate::records::RecordStore;
use crate::settings::AppConfig;
use crate::store::{RedisStore, SharedStore};
use crate::templates::TemplateRegistry;
use crate::worker::Worker;

pub struct ClaimService {
    pub limiter: RateLimiter,
    pub resolver: AvailabilityResolver,
    pub coordinator: ExecutionCoordinator,
    pub queue: Arc<JobQueue>,
    pub templates: TemplateRegistry,
    pub metrics: Arc<Metrics>,
    claim_rule: RateLimitRule,
    check_rule: RateLimitRule,
    ctx: ClaimContext,
    poll_timeout: std::time::Duration,
}

impl ClaimService {
    /// Connect to Redis and assemble the production service graph. The
    /// System of Record is external and must be injected.
    pub async fn connect(
        cfg: &AppConfig,
        records: Arc<dyn RecordStore>,
    ) -> anyhow::Result<Self> {
        let store = Arc::new(RedisStore::connect(&cfg.redis.url).await?);
        Ok(Self::with_stores(cfg, store, records)?)
    }

    /// Assemble the service graph over injected backends.
    pub fn with_stores(
        cfg: &AppConfig,
        store: Arc<dyn SharedStore>,
        records: Arc<dyn RecordStore>,
    ) -> Result<Self, anyhow::Error> {
        let metrics = Arc::new(Metrics::new()?);
        let templates = TemplateRegistry::builtin()?;
        let cache = CacheStore::new(store.clone());
        let resolver = AvailabilityResolver::new(
            cache.clone(),
            records.clone(),
            cfg.slugs.clone(),
            metrics.clone(),
        );
        let ctx = ClaimContext {
            resolver: resolver.clone(),
            records,
            cache,
            metrics: metrics.clone(),
        };
        let queue = Arc::new(JobQueue::new(
            store.clone(),
            &cfg.queue.name,
            cfg.queue.record_ttl(),
        ));
        let coordinator =
            ExecutionCoordinator::new(ctx.clone(), queue.clone(), cfg.coordinator.deadline());
        Ok(Self {
            limiter: RateLimiter::new(store, metrics.clone()),
            resolver,
            coordinator,
            queue,
            templates,
            metrics,
            claim_rule: RateLimitRule::claim_create(&cfg.limits),
            check_rule: RateLimitRule::availability_check(&cfg.limits),
            ctx,
            poll_timeout: cfg.queue.poll_timeout(),
        })
    }

    /// The configured admission rule for claim submissions.
    pub fn claim_rule(&self) -> &RateLimitRule {
        &self.claim_rule
    }

    /// The configured admission rule for availability pre-flight checks.
    pub fn check_rule(&self) -> &RateLimitRule {
        &self.check_rule
    }

    /// Build a worker over this service's queue and claim context.
    pub fn worker(&self) -> Worker {
        Worker::new(self.queue.clone(), self.ctx.clone(), self.poll_timeout)
    }
}
