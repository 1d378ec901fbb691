//! Redis backend for the shared store.
//!
//! One server, three logical databases so volatile concerns stay
//! separable: /0 rate limiting, /1 verdict cache, /2 queue and job
//! records. Each database gets its own auto-reconnecting connection
//! manager.
//!
//! The sliding-window admission batch runs as a Lua script so the
//! prune/count/conditional-insert sequence is atomic per key on the
//! server, never interleaving with a concurrent caller.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};
use uuid::Uuid;

use super::{SharedStore, StoreError, WindowDecision};

/// KEYS[1] window key; ARGV: prune horizon, limit, now_ms, member, ttl_secs.
/// Returns {admitted, count, oldest_ms (-1 when absent)}.
static WINDOW_ADMIT: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
redis.call('ZREMRANGEBYSCORE', KEYS[1], '-inf', ARGV[1])
local count = redis.call('ZCARD', KEYS[1])
if count >= tonumber(ARGV[2]) then
    local oldest = redis.call('ZRANGE', KEYS[1], 0, 0, 'WITHSCORES')
    local oldest_ms = -1
    if oldest[2] then
        oldest_ms = math.floor(tonumber(oldest[2]))
    end
    return {0, count, oldest_ms}
end
redis.call('ZADD', KEYS[1], tonumber(ARGV[3]), ARGV[4])
redis.call('EXPIRE', KEYS[1], tonumber(ARGV[5]))
return {1, count + 1, -1}
"#,
    )
});

#[derive(Clone)]
pub struct RedisStore {
    rate_limit: ConnectionManager,
    cache: ConnectionManager,
    queue: ConnectionManager,
}

impl RedisStore {
    /// Connect to `url` (no database suffix) and open the three logical
    /// databases.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let base = url.trim_end_matches('/');
        Ok(Self {
            rate_limit: open(&format!("{base}/0")).await?,
            cache: open(&format!("{base}/1")).await?,
            queue: open(&format!("{base}/2")).await?,
        })
    }
}

async fn open(url: &str) -> Result<ConnectionManager, StoreError> {
    let client = Client::open(url).map_err(|e| StoreError::Connection(e.to_string()))?;
    ConnectionManager::new(client)
        .await
        .map_err(|e| StoreError::Connection(e.to_string()))
}

fn command_err(e: redis::RedisError) -> StoreError {
    if e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout() {
        StoreError::Connection(e.to_string())
    } else {
        StoreError::Command(e.to_string())
    }
}

#[async_trait]
impl SharedStore for RedisStore {
    async fn window_admit(
        &self,
        key: &str,
        now_ms: i64,
        window_ms: i64,
        limit: u32,
        ttl: Duration,
    ) -> Result<WindowDecision, StoreError> {
        // Members carry a uuid so two events in the same millisecond never
        // collapse into one sorted-set entry.
        let member = format!("{}-{}", now_ms, Uuid::new_v4());
        let mut conn = self.rate_limit.clone();
        let (admitted, count, oldest_ms): (i64, i64, i64) = WINDOW_ADMIT
            .key(key)
            .arg(now_ms - window_ms)
            .arg(limit)
            .arg(now_ms)
            .arg(member)
            .arg(ttl.as_secs())
            .invoke_async(&mut conn)
            .await
            .map_err(command_err)?;
        Ok(WindowDecision {
            admitted: admitted == 1,
            count: count.max(0) as u32,
            oldest_ms: (oldest_ms >= 0).then_some(oldest_ms),
        })
    }

    async fn cache_get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.cache.clone();
        conn.get(key).await.map_err(command_err)
    }

    async fn cache_set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.cache.clone();
        conn.set_ex(key, value, ttl.as_secs().max(1))
            .await
            .map_err(command_err)
    }

    async fn cache_delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.cache.clone();
        let _removed: u64 = conn.del(key).await.map_err(command_err)?;
        Ok(())
    }

    async fn cache_exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.cache.clone();
        conn.exists(key).await.map_err(command_err)
    }

    async fn queue_push(&self, queue: &str, job_id: &str) -> Result<(), StoreError> {
        let mut conn = self.queue.clone();
        let _len: u64 = conn.lpush(queue, job_id).await.map_err(command_err)?;
        Ok(())
    }

    async fn queue_pop(
        &self,
        queue: &str,
        timeout: Duration,
    ) -> Result<Option<String>, StoreError> {
        let mut conn = self.queue.clone();
        let popped: Option<(String, String)> = conn
            .brpop(queue, timeout.as_secs_f64())
            .await
            .map_err(command_err)?;
        Ok(popped.map(|(_list, id)| id))
    }

    async fn job_put(&self, id: &str, record: &[u8], ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.queue.clone();
        conn.set_ex(id, record, ttl.as_secs().max(1))
            .await
            .map_err(command_err)
    }

    async fn job_get(&self, id: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.queue.clone();
        conn.get(id).await.map_err(command_err)
    }
}
