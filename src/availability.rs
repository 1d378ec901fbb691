//! Slug availability resolution.
//!
//! Checks short-circuit in a fixed order: structural validation and the
//! reserved-word denylist are cheap and deterministic, so they run first
//! and are never cached. Only the authoritative lookup is cached, with a
//! short TTL: "taken" flips to "available" on release, and "available"
//! flips to "taken" the instant a concurrent claim wins.
//!
//! Whoever claims or releases a slug must delete the cached verdict (not
//! overwrite it); see the claim module.

use std::collections::HashSet;
use std::sync::Arc;

use once_cell::sync::Lazy;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::CacheStore;
use crate::keys;
use crate::metrics::Metrics;
use crate::records::{RecordStore, RecordStoreError};
use crate::settings::SlugConfig;

/// Slugs that would shadow application routes or invite abuse.
static RESERVED_SLUGS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "admin", "api", "static", "assets", "create", "edit", "delete", "login", "logout",
        "signup", "settings", "profile", "dashboard", "help", "about", "contact", "terms",
        "privacy", "404", "500",
    ])
});

/// Affixes tried by the second suggestion strategy, in order.
const AFFIX_WORDS: &[&str] = &["love", "heart", "sweet", "dear", "my", "xoxo", "forever"];

/// Upper bound on random-suffix draws; the slug space makes eventual
/// termination certain, this just bounds the store traffic.
const MAX_RANDOM_ATTEMPTS: usize = 250;

#[derive(Debug, Error)]
pub enum AvailabilityError {
    #[error(transparent)]
    Records(#[from] RecordStoreError),
}

/// The answer to "can this slug still be claimed?".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Verdict {
    pub available: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

impl Verdict {
    fn available() -> Self {
        Self {
            available: true,
            reason: None,
        }
    }

    fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            available: false,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Clone)]
pub struct AvailabilityResolver {
    cache: CacheStore,
    records: Arc<dyn RecordStore>,
    policy: SlugConfig,
    metrics: Arc<Metrics>,
}

impl AvailabilityResolver {
    pub fn new(
        cache: CacheStore,
        records: Arc<dyn RecordStore>,
        policy: SlugConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            cache,
            records,
            policy,
            metrics,
        }
    }

    /// Validate structure only: length bounds, then the anchored character
    /// class (starts and ends alphanumeric, interior may add hyphens).
    pub fn validate_format(&self, slug: &str) -> Result<(), String> {
        if slug.len() < self.policy.min_length {
            return Err(format!(
                "slug must be at least {} characters",
                self.policy.min_length
            ));
        }
        if slug.len() > self.policy.max_length {
            return Err(format!(
                "slug must be at most {} characters",
                self.policy.max_length
            ));
        }
        let chars: Vec<char> = slug.chars().collect();
        let first_ok = chars.first().is_some_and(|c| c.is_ascii_alphanumeric());
        let last_ok = chars.last().is_some_and(|c| c.is_ascii_alphanumeric());
        let interior_ok = chars
            .iter()
            .all(|c| c.is_ascii_alphanumeric() || *c == '-');
        if !(first_ok && last_ok && interior_ok) {
            return Err(
                "slug must start and end with an alphanumeric character and may only contain \
                 letters, numbers, and hyphens"
                    .to_string(),
            );
        }
        Ok(())
    }

    pub fn is_reserved(&self, slug: &str) -> bool {
        RESERVED_SLUGS.contains(slug.to_lowercase().as_str())
    }

    /// Resolve whether `slug` can still be claimed.
    ///
    /// Validation and reserved-word failures are never cached; verdicts
    /// from the authoritative lookup are cached under the configured TTL.
    pub async fn check(&self, slug: &str) -> Result<Verdict, AvailabilityError> {
        if let Err(reason) = self.validate_format(slug) {
            return Ok(Verdict::unavailable(reason));
        }
        if self.is_reserved(slug) {
            return Ok(Verdict::unavailable("this slug is reserved"));
        }

        let key = keys::verdict_key(slug);
        if let Some(verdict) = self.cache.get::<Verdict>(&key).await {
            self.metrics.record_verdict_lookup("hit");
            return Ok(verdict);
        }
        self.metrics.record_verdict_lookup("miss");

        let verdict = match self.records.read_by_slug(slug).await? {
            Some(_) => Verdict::unavailable("this slug is already taken"),
            None => Verdict::available(),
        };
        self.cache
            .set(&key, &verdict, self.policy.verdict_ttl())
            .await;
        Ok(verdict)
    }

    /// Generate up to `count` distinct available alternatives for `base`.
    ///
    /// Strategies run strictly in order until enough hits are found:
    /// numeric suffixes `base-1..base-99`, then the affix words as prefix
    /// and suffix, then random numeric suffixes. Every candidate passes
    /// through a full [`check`](Self::check) at generation time; none is
    /// guaranteed to still be available at claim time.
    pub async fn suggest(&self, base: &str, count: usize) -> Result<Vec<String>, AvailabilityError> {
        let base = self.clean_base(base);
        let mut suggestions = Vec::with_capacity(count);
        let mut seen: HashSet<String> = HashSet::new();

        for n in 1..100u32 {
            if suggestions.len() >= count {
                return Ok(suggestions);
            }
            let candidate = format!("{base}-{n}");
            self.consider(candidate, &mut suggestions, &mut seen).await?;
        }

        for word in AFFIX_WORDS {
            for candidate in [format!("{word}-{base}"), format!("{base}-{word}")] {
                if suggestions.len() >= count {
                    return Ok(suggestions);
                }
                if candidate.len() > self.policy.max_length {
                    continue;
                }
                self.consider(candidate, &mut suggestions, &mut seen).await?;
            }
        }

        let mut attempts = 0;
        while suggestions.len() < count && attempts < MAX_RANDOM_ATTEMPTS {
            attempts += 1;
            let n: u32 = {
                let mut rng = rand::thread_rng();
                rng.gen_range(100..=9_999)
            };
            let candidate = format!("{base}-{n}");
            self.consider(candidate, &mut suggestions, &mut seen).await?;
        }

        Ok(suggestions)
    }

    async fn consider(
        &self,
        candidate: String,
        suggestions: &mut Vec<String>,
        seen: &mut HashSet<String>,
    ) -> Result<(), AvailabilityError> {
        if !seen.insert(candidate.clone()) {
            return Ok(());
        }
        if self.check(&candidate).await?.available {
            suggestions.push(candidate);
        }
        Ok(())
    }

    /// Strip the base down to the allowed character class; fall back to the
    /// configured seed word when nothing usable remains.
    fn clean_base(&self, base: &str) -> String {
        let cleaned: String = base
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect();
        let cleaned = cleaned.trim_matches('-').to_string();
        if cleaned.len() < self.policy.min_length {
            self.policy.suggestion_seed.clone()
        } else {
            cleaned
        }
    }
}
