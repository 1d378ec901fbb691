//! Job consumer.
//!
//! Workers share nothing with the serving path except the durable store:
//! they pull queued jobs, replay the claim operation, and write one
//! terminal status. Delivery is at-least-once; a job popped twice (or
//! re-run after a worker crash) is made safe by the claim operation's own
//! re-check before insert, so no extra idempotency marker is kept.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::claim::{self, ClaimContext};
use crate::epoch_ms;
use crate::queue::{JobQueue, JobRecord, JobStatus, QueueError};

pub struct Worker {
    queue: Arc<JobQueue>,
    ctx: ClaimContext,
    poll_timeout: Duration,
}

impl Worker {
    pub fn new(queue: Arc<JobQueue>, ctx: ClaimContext, poll_timeout: Duration) -> Self {
        Self {
            queue,
            ctx,
            poll_timeout,
        }
    }

    /// Consume jobs until the shutdown channel fires.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        info!("worker started");
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("worker shutting down");
                    return;
                }
                polled = self.queue.dequeue(self.poll_timeout) => match polled {
                    Ok(Some(record)) => self.process(record).await,
                    Ok(None) => {}
                    Err(e) => {
                        error!(error = %e, "failed to pull from queue, backing off");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                },
            }
        }
    }

    /// Process at most one job; returns whether one was processed.
    pub async fn run_once(&self) -> Result<bool, QueueError> {
        match self.queue.dequeue(self.poll_timeout).await? {
            Some(record) => {
                self.process(record).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn process(&self, mut record: JobRecord) {
        // At-least-once delivery: a record that already progressed past
        // Queued was claimed by another delivery; status never regresses.
        if record.status != JobStatus::Queued {
            debug!(job_id = %record.id, status = ?record.status, "skipping non-queued job");
            return;
        }

        record.status = JobStatus::Started;
        record.started_at_ms = Some(epoch_ms());
        if let Err(e) = self.queue.save(&record).await {
            // Leave the record untouched; the claim has not run yet and the
            // job id is gone from the list, so surface loudly.
            error!(job_id = %record.id, error = %e, "failed to mark job started");
            return;
        }

        debug!(job_id = %record.id, slug = %record.request.slug, "job started");
        let result = claim::execute(&self.ctx, &record.request).await;

        match result {
            Ok(receipt) => {
                record.status = JobStatus::Finished;
                record.receipt = Some(receipt);
            }
            Err(e) => {
                record.status = JobStatus::Failed;
                record.error = Some(e.to_string());
            }
        }
        record.finished_at_ms = Some(epoch_ms());

        let status_label = match record.status {
            JobStatus::Finished => "finished",
            _ => "failed",
        };
        if let Err(e) = self.queue.save(&record).await {
            warn!(job_id = %record.id, error = %e, "failed to write terminal job status");
            return;
        }
        self.ctx.metrics.record_job(status_label);
        info!(job_id = %record.id, status = status_label, "job complete");
    }
}
