use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub limits: RateLimitConfig,
    #[serde(default)]
    pub slugs: SlugConfig,
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Bind address for the optional /metrics endpoint, e.g. 127.0.0.1:9187
    #[serde(default)]
    pub metrics_addr: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    /// Base URL without a database suffix; logical DBs 0..2 are derived from it
    #[serde(default = "default_redis_url")]
    pub url: String,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    #[serde(default = "default_claims_per_hour")]
    pub claims_per_hour: u32,
    #[serde(default = "default_checks_per_minute")]
    pub checks_per_minute: u32,
}

fn default_claims_per_hour() -> u32 {
    10
}
fn default_checks_per_minute() -> u32 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            claims_per_hour: default_claims_per_hour(),
            checks_per_minute: default_checks_per_minute(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SlugConfig {
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    /// How long availability verdicts stay cached. Deliberately short: a
    /// verdict can flip the moment a concurrent claim or release lands.
    #[serde(default = "default_verdict_ttl_secs")]
    pub verdict_ttl_secs: u64,
    /// Fallback base for suggestions when the requested base is unusable
    #[serde(default = "default_suggestion_seed")]
    pub suggestion_seed: String,
}

fn default_min_length() -> usize {
    3
}
fn default_max_length() -> usize {
    50
}
fn default_verdict_ttl_secs() -> u64 {
    30
}
fn default_suggestion_seed() -> String {
    "love".to_string()
}

impl Default for SlugConfig {
    fn default() -> Self {
        Self {
            min_length: default_min_length(),
            max_length: default_max_length(),
            verdict_ttl_secs: default_verdict_ttl_secs(),
            suggestion_seed: default_suggestion_seed(),
        }
    }
}

impl SlugConfig {
    pub fn verdict_ttl(&self) -> Duration {
        Duration::from_secs(self.verdict_ttl_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CoordinatorConfig {
    /// How long a claim may run synchronously before it is handed to the queue
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,
}

fn default_deadline_ms() -> u64 {
    2_000
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            deadline_ms: default_deadline_ms(),
        }
    }
}

impl CoordinatorConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueueConfig {
    #[serde(default = "default_queue_name")]
    pub name: String,
    /// Job records expire after this long; later polls report not-found
    #[serde(default = "default_record_ttl_secs")]
    pub record_ttl_secs: u64,
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
}

fn default_queue_name() -> String {
    "page_creation".to_string()
}
fn default_record_ttl_secs() -> u64 {
    86_400
}
fn default_poll_timeout_ms() -> u64 {
    1_000
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: default_queue_name(),
            record_ttl_secs: default_record_ttl_secs(),
            poll_timeout_ms: default_poll_timeout_ms(),
        }
    }
}

impl QueueConfig {
    pub fn record_ttl(&self) -> Duration {
        Duration::from_secs(self.record_ttl_secs)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl AppConfig {
    /// Load configuration from an optional TOML file, falling back to
    /// defaults. `REDIS_URL` in the environment overrides the file.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = match path {
            Some(p) => {
                let data = fs::read_to_string(p)?;
                toml::from_str::<Self>(&data)?
            }
            None => Self::default(),
        };
        if let Ok(url) = std::env::var("REDIS_URL") {
            if !url.is_empty() {
                cfg.redis.url = url;
            }
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.limits.claims_per_hour == 0 || self.limits.checks_per_minute == 0 {
            anyhow::bail!("rate limits must be at least 1");
        }
        if self.slugs.min_length == 0 {
            anyhow::bail!("slug min_length must be at least 1");
        }
        if self.slugs.min_length > self.slugs.max_length {
            anyhow::bail!(
                "slug min_length {} exceeds max_length {}",
                self.slugs.min_length,
                self.slugs.max_length
            );
        }
        if self.coordinator.deadline_ms == 0 {
            anyhow::bail!("coordinator deadline_ms must be positive");
        }
        if self.queue.name.is_empty() {
            anyhow::bail!("queue name must not be empty");
        }
        Ok(())
    }
}
