//! In-process backend for tests and single-node development.
//!
//! Every operation that must be atomic runs under one mutex, which gives
//! the same per-key batching guarantee the Redis script provides. Waiting
//! poppers are woken through a [`Notify`] when work arrives.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;

use super::{SharedStore, StoreError, WindowDecision};

#[derive(Default)]
struct WindowState {
    /// (timestamp_ms, member) pairs, insertion order
    entries: Vec<(i64, String)>,
    expires_at_ms: i64,
}

struct Slot {
    value: Vec<u8>,
    expires_at: Instant,
}

#[derive(Default)]
struct Inner {
    windows: HashMap<String, WindowState>,
    cache: HashMap<String, Slot>,
    queues: HashMap<String, VecDeque<String>>,
    jobs: HashMap<String, Slot>,
    next_member: u64,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    queue_notify: Notify,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn live_value(slot: Option<&Slot>) -> Option<Vec<u8>> {
        slot.filter(|s| s.expires_at > Instant::now())
            .map(|s| s.value.clone())
    }
}

#[async_trait]
impl SharedStore for MemoryStore {
    async fn window_admit(
        &self,
        key: &str,
        now_ms: i64,
        window_ms: i64,
        limit: u32,
        ttl: Duration,
    ) -> Result<WindowDecision, StoreError> {
        let mut inner = self.inner.lock().map_err(poisoned)?;
        let member = {
            inner.next_member += 1;
            format!("{}-{}", now_ms, inner.next_member)
        };
        let window = inner.windows.entry(key.to_string()).or_default();
        if window.expires_at_ms != 0 && window.expires_at_ms <= now_ms {
            window.entries.clear();
        }
        window.entries.retain(|(ts, _)| *ts > now_ms - window_ms);
        let count = window.entries.len() as u32;
        if count >= limit {
            let oldest_ms = window.entries.iter().map(|(ts, _)| *ts).min();
            return Ok(WindowDecision {
                admitted: false,
                count,
                oldest_ms,
            });
        }
        window.entries.push((now_ms, member));
        window.expires_at_ms = now_ms + ttl.as_millis() as i64;
        Ok(WindowDecision {
            admitted: true,
            count: count + 1,
            oldest_ms: None,
        })
    }

    async fn cache_get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let inner = self.inner.lock().map_err(poisoned)?;
        Ok(Self::live_value(inner.cache.get(key)))
    }

    async fn cache_set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().map_err(poisoned)?;
        inner.cache.insert(
            key.to_string(),
            Slot {
                value: value.to_vec(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn cache_delete(&self, key: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().map_err(poisoned)?;
        inner.cache.remove(key);
        Ok(())
    }

    async fn cache_exists(&self, key: &str) -> Result<bool, StoreError> {
        let inner = self.inner.lock().map_err(poisoned)?;
        Ok(Self::live_value(inner.cache.get(key)).is_some())
    }

    async fn queue_push(&self, queue: &str, job_id: &str) -> Result<(), StoreError> {
        {
            let mut inner = self.inner.lock().map_err(poisoned)?;
            inner
                .queues
                .entry(queue.to_string())
                .or_default()
                .push_back(job_id.to_string());
        }
        self.queue_notify.notify_waiters();
        Ok(())
    }

    async fn queue_pop(
        &self,
        queue: &str,
        timeout: Duration,
    ) -> Result<Option<String>, StoreError> {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.queue_notify.notified();
            {
                let mut inner = self.inner.lock().map_err(poisoned)?;
                if let Some(id) = inner.queues.get_mut(queue).and_then(VecDeque::pop_front) {
                    return Ok(Some(id));
                }
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::select! {
                _ = notified => {}
                _ = tokio::time::sleep_until(deadline) => return Ok(None),
            }
        }
    }

    async fn job_put(&self, id: &str, record: &[u8], ttl: Duration) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().map_err(poisoned)?;
        inner.jobs.insert(
            id.to_string(),
            Slot {
                value: record.to_vec(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn job_get(&self, id: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let inner = self.inner.lock().map_err(poisoned)?;
        Ok(Self::live_value(inner.jobs.get(id)))
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Command("memory store mutex poisoned".to_string())
}
