//! Hybrid execution: synchronous under a deadline, queued past it.
//!
//! A submitted claim runs as a detached task racing a deadline timer. The
//! common case finishes first and returns its result directly. When the
//! deadline elapses the wait is abandoned but the task is not: it keeps
//! running to completion while the same request is serialized into a
//! durable job and a pollable handle is returned instead. Both executions
//! route through the one claim implementation, whose re-check before
//! insert makes the double attempt converge to one success and one
//! conflict.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::claim::{self, ClaimContext, ClaimError, ClaimReceipt, ClaimRequest};
use crate::queue::{JobHandle, JobQueue, QueueError};

/// What a submission produced: a result on the synchronous path, or a
/// handle for later polling on the deferred path.
#[derive(Debug)]
pub enum Submission {
    Completed(Result<ClaimReceipt, ClaimError>),
    Queued(JobHandle),
}

pub struct ExecutionCoordinator {
    ctx: ClaimContext,
    queue: Arc<JobQueue>,
    deadline: Duration,
}

impl ExecutionCoordinator {
    pub fn new(ctx: ClaimContext, queue: Arc<JobQueue>, deadline: Duration) -> Self {
        Self {
            ctx,
            queue,
            deadline,
        }
    }

    pub async fn submit(&self, request: ClaimRequest) -> Result<Submission, QueueError> {
        self.submit_with_deadline(request, self.deadline).await
    }

    pub async fn submit_with_deadline(
        &self,
        request: ClaimRequest,
        deadline: Duration,
    ) -> Result<Submission, QueueError> {
        let ctx = self.ctx.clone();
        let task_request = request.clone();
        let mut attempt =
            tokio::spawn(async move { claim::execute(&ctx, &task_request).await });

        tokio::select! {
            joined = &mut attempt => {
                self.ctx.metrics.record_submission("sync");
                match joined {
                    Ok(result) => Ok(Submission::Completed(result)),
                    Err(join_err) => Ok(Submission::Completed(Err(ClaimError::Aborted(
                        join_err.to_string(),
                    )))),
                }
            }
            _ = tokio::time::sleep(deadline) => {
                // The in-flight attempt is deliberately left running; it may
                // still complete and mutate state after we stop waiting.
                warn!(
                    slug = %request.slug,
                    deadline_ms = deadline.as_millis() as u64,
                    "claim exceeded deadline, deferring to queue"
                );
                let handle = self.queue.enqueue(request).await?;
                self.ctx.metrics.record_submission("deferred");
                debug!(job_id = %handle.id, "deferred claim enqueued");
                Ok(Submission::Queued(handle))
            }
        }
    }
}
