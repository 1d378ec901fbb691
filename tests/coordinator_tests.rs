use std::time::Duration;

use claimgate::claim::ClaimError;
use claimgate::coordinator::Submission;
use claimgate::queue::JobStatus;

use test_helpers::{harness, request};

#[tokio::test]
async fn fast_operation_completes_synchronously() {
    let h = harness();
    let submission = h
        .service
        .coordinator
        .submit_with_deadline(request("my-love-99"), Duration::from_secs(2))
        .await
        .expect("submit");

    let receipt = match submission {
        Submission::Completed(result) => result.expect("claim succeeds"),
        Submission::Queued(handle) => panic!("fast path should not enqueue, got job {}", handle.id),
    };
    assert_eq!(receipt.slug, "my-love-99");
    assert_eq!(receipt.edit_token.len(), 32);

    // No job record was created for the synchronous path.
    assert!(h
        .service
        .queue
        .status(&receipt.record_id.to_string())
        .await
        .is_err());
}

#[tokio::test]
async fn slow_operation_defers_to_queue_promptly() {
    let h = harness();
    h.records
        .set_insert_latency(Some(Duration::from_secs(60)));

    let started = std::time::Instant::now();
    let submission = h
        .service
        .coordinator
        .submit_with_deadline(request("my-love-99"), Duration::from_millis(100))
        .await
        .expect("submit");
    let elapsed = started.elapsed();

    let handle = match submission {
        Submission::Queued(handle) => handle,
        Submission::Completed(_) => panic!("slow path should defer"),
    };
    assert!(
        elapsed < Duration::from_secs(5),
        "deferred submission must return promptly, took {elapsed:?}"
    );

    let record = h.service.queue.status(&handle.id).await.expect("status");
    assert_eq!(record.status, JobStatus::Queued);
    assert_eq!(record.request.slug, "my-love-99");
}

#[tokio::test]
async fn deferred_job_finishes_with_the_true_result() {
    let h = harness();
    h.records
        .set_insert_latency(Some(Duration::from_secs(60)));

    let submission = h
        .service
        .coordinator
        .submit_with_deadline(request("my-love-99"), Duration::from_millis(100))
        .await
        .expect("submit");
    let handle = match submission {
        Submission::Queued(handle) => handle,
        Submission::Completed(_) => panic!("slow path should defer"),
    };

    // The store recovers; the worker replays the job and wins the claim
    // while the abandoned synchronous attempt is still stuck.
    h.records.set_insert_latency(None);
    let worker = h.service.worker();
    assert!(worker.run_once().await.expect("worker run"));

    let record = h.service.queue.status(&handle.id).await.expect("status");
    assert_eq!(record.status, JobStatus::Finished);
    let receipt = record.receipt.expect("finished job carries a receipt");
    assert_eq!(receipt.slug, "my-love-99");
    assert!(record.started_at_ms.is_some());
    assert!(record.finished_at_ms.is_some());
}

#[tokio::test]
async fn conflict_on_the_synchronous_path_is_reported_directly() {
    let h = harness();
    let first = h
        .service
        .coordinator
        .submit(request("my-love-99"))
        .await
        .expect("submit");
    assert!(matches!(first, Submission::Completed(Ok(_))));

    let second = h
        .service
        .coordinator
        .submit(request("my-love-99"))
        .await
        .expect("submit");
    match second {
        Submission::Completed(Err(ClaimError::Conflict(_))) => {}
        other => panic!("expected a conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn validation_failure_is_synchronous_and_never_queued() {
    let h = harness();
    let submission = h
        .service
        .coordinator
        .submit(request("ab"))
        .await
        .expect("submit");
    match submission {
        Submission::Completed(Err(ClaimError::Validation(reason))) => {
            assert!(reason.contains("at least 3"));
        }
        other => panic!("expected a validation error, got {other:?}"),
    }
}
