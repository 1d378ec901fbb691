//! Durable, pollable job queue over the shared store.
//!
//! A job is a claim request the coordinator could not finish within its
//! deadline. The queue stores one JSON record per job plus a FIFO list of
//! ids; workers pop ids and replay the claim operation. Job status moves
//! strictly forward, `Queued -> Started -> {Finished, Failed}`, and the
//! terminal state is written exactly once by the worker that ran the job.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::claim::{ClaimReceipt, ClaimRequest};
use crate::epoch_ms;
use crate::keys;
use crate::store::{SharedStore, StoreError};

#[derive(Debug, Error)]
pub enum QueueError {
    /// Unknown or expired job id
    #[error("job not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("job record codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Started,
    Finished,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Finished | JobStatus::Failed)
    }
}

/// Handle returned to the caller for later status polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub status: JobStatus,
    pub request: ClaimRequest,
    /// Present iff status is Finished
    #[serde(default)]
    pub receipt: Option<ClaimReceipt>,
    /// The operation's error, verbatim; present iff status is Failed
    #[serde(default)]
    pub error: Option<String>,
    pub enqueued_at_ms: i64,
    #[serde(default)]
    pub started_at_ms: Option<i64>,
    #[serde(default)]
    pub finished_at_ms: Option<i64>,
}

pub struct JobQueue {
    store: Arc<dyn SharedStore>,
    queue_key: String,
    record_ttl: Duration,
}

impl JobQueue {
    pub fn new(store: Arc<dyn SharedStore>, name: &str, record_ttl: Duration) -> Self {
        Self {
            store,
            queue_key: keys::queue_key(name),
            record_ttl,
        }
    }

    /// Persist a new queued job and hand its id to the FIFO.
    pub async fn enqueue(&self, request: ClaimRequest) -> Result<JobHandle, QueueError> {
        let record = JobRecord {
            id: Uuid::new_v4().to_string(),
            status: JobStatus::Queued,
            request,
            receipt: None,
            error: None,
            enqueued_at_ms: epoch_ms(),
            started_at_ms: None,
            finished_at_ms: None,
        };
        self.save(&record).await?;
        self.store
            .queue_push(&self.queue_key, &record.id)
            .await?;
        Ok(JobHandle { id: record.id })
    }

    /// Current record for a job id. Expired records report not-found; a
    /// poller may observe any prefix of the status progression but never a
    /// regression.
    pub async fn status(&self, id: &str) -> Result<JobRecord, QueueError> {
        let bytes = self
            .store
            .job_get(&keys::job_key(id))
            .await?
            .ok_or_else(|| QueueError::NotFound(id.to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Wait up to `timeout` for the next job. A dangling id whose record
    /// already expired is reported as `None`.
    pub(crate) async fn dequeue(&self, timeout: Duration) -> Result<Option<JobRecord>, QueueError> {
        let Some(id) = self.store.queue_pop(&self.queue_key, timeout).await? else {
            return Ok(None);
        };
        match self.status(&id).await {
            Ok(record) => Ok(Some(record)),
            Err(QueueError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub(crate) async fn save(&self, record: &JobRecord) -> Result<(), QueueError> {
        let bytes = serde_json::to_vec(record)?;
        self.store
            .job_put(&keys::job_key(&record.id), &bytes, self.record_ttl)
            .await?;
        Ok(())
    }
}
