//! TTL key/value cache over the shared store.
//!
//! The cache is an optimization, never a correctness dependency: any store
//! or serialization fault degrades to a miss (or a no-op write) and is
//! logged, not propagated. Values round-trip through JSON.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::store::SharedStore;

#[derive(Clone)]
pub struct CacheStore {
    store: Arc<dyn SharedStore>,
}

impl CacheStore {
    pub fn new(store: Arc<dyn SharedStore>) -> Self {
        Self { store }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.store.cache_get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "cache get failed, treating as miss");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "cache value failed to decode, treating as miss");
                None
            }
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key, error = %e, "cache value failed to encode, skipping write");
                return;
            }
        };
        if let Err(e) = self.store.cache_set(key, &bytes, ttl).await {
            warn!(key, error = %e, "cache set failed");
        }
    }

    pub async fn delete(&self, key: &str) {
        if let Err(e) = self.store.cache_delete(key).await {
            warn!(key, error = %e, "cache delete failed");
        }
    }

    pub async fn exists(&self, key: &str) -> bool {
        match self.store.cache_exists(key).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!(key, error = %e, "cache exists failed, treating as absent");
                false
            }
        }
    }
}
