//! System of Record seam.
//!
//! The authoritative store for claimed slugs lives outside this crate;
//! the core consumes it through [`RecordStore`]. Uniqueness is enforced
//! case-insensitively by the implementation, which is what makes the
//! claim operation safe to execute twice.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::templates::TemplateId;

#[derive(Debug, Error)]
pub enum RecordStoreError {
    /// Case-insensitive uniqueness violation on insert
    #[error("slug already claimed: {0}")]
    Duplicate(String),
    #[error("record not found: {0}")]
    NotFound(u64),
    #[error("record store failure: {0}")]
    Backend(String),
}

/// Content carried by a claim, stored verbatim in the record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClaimPayload {
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub recipient_name: Option<String>,
    pub template: TemplateId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub id: u64,
    pub slug: String,
    pub payload: ClaimPayload,
    /// Capability token required to mutate or release the claim
    pub edit_token: String,
    pub created_at_ms: i64,
    pub active: bool,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a new active claim. Fails with [`RecordStoreError::Duplicate`]
    /// when an active claim for the slug (case-insensitive) already exists.
    async fn insert_claim(
        &self,
        slug: &str,
        payload: &ClaimPayload,
        edit_token: &str,
        now_ms: i64,
    ) -> Result<ClaimRecord, RecordStoreError>;

    /// Look up the active claim for a slug, case-insensitively.
    async fn read_by_slug(&self, slug: &str) -> Result<Option<ClaimRecord>, RecordStoreError>;

    /// Deactivate a claim, freeing its slug for future claims.
    async fn soft_delete(&self, id: u64) -> Result<(), RecordStoreError>;
}

/// In-process record store for tests and single-node development.
///
/// `with_insert_latency` injects a fixed delay ahead of each insert so
/// slow-store conditions (and the coordinator's deadline fallback) can be
/// exercised deterministically.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<HashMap<String, ClaimRecord>>,
    next_id: AtomicU64,
    insert_latency: Mutex<Option<Duration>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_insert_latency(latency: Duration) -> Self {
        let store = Self::default();
        store.set_insert_latency(Some(latency));
        store
    }

    /// Change the injected insert delay; takes effect on the next insert.
    pub fn set_insert_latency(&self, latency: Option<Duration>) {
        if let Ok(mut slot) = self.insert_latency.lock() {
            *slot = latency;
        }
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert_claim(
        &self,
        slug: &str,
        payload: &ClaimPayload,
        edit_token: &str,
        now_ms: i64,
    ) -> Result<ClaimRecord, RecordStoreError> {
        let latency = *self.insert_latency.lock().map_err(poisoned)?;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        let mut records = self.records.lock().map_err(poisoned)?;
        let key = slug.to_lowercase();
        if records.get(&key).is_some_and(|r| r.active) {
            return Err(RecordStoreError::Duplicate(slug.to_string()));
        }
        let record = ClaimRecord {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            slug: slug.to_string(),
            payload: payload.clone(),
            edit_token: edit_token.to_string(),
            created_at_ms: now_ms,
            active: true,
        };
        records.insert(key, record.clone());
        Ok(record)
    }

    async fn read_by_slug(&self, slug: &str) -> Result<Option<ClaimRecord>, RecordStoreError> {
        let records = self.records.lock().map_err(poisoned)?;
        Ok(records
            .get(&slug.to_lowercase())
            .filter(|r| r.active)
            .cloned())
    }

    async fn soft_delete(&self, id: u64) -> Result<(), RecordStoreError> {
        let mut records = self.records.lock().map_err(poisoned)?;
        match records.values_mut().find(|r| r.id == id && r.active) {
            Some(record) => {
                record.active = false;
                Ok(())
            }
            None => Err(RecordStoreError::NotFound(id)),
        }
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> RecordStoreError {
    RecordStoreError::Backend("record store mutex poisoned".to_string())
}
