use std::time::Duration;

use claimgate::claim;
use claimgate::queue::{JobStatus, QueueError};
use claimgate::records::RecordStore;

use test_helpers::{claim_context, harness, harness_with, payload, request};

#[tokio::test]
async fn enqueue_then_status_reports_queued() {
    let h = harness();
    let handle = h
        .service
        .queue
        .enqueue(request("my-love-99"))
        .await
        .expect("enqueue");

    let record = h.service.queue.status(&handle.id).await.expect("status");
    assert_eq!(record.status, JobStatus::Queued);
    assert!(record.receipt.is_none());
    assert!(record.error.is_none());
    assert!(record.enqueued_at_ms > 0);
}

#[tokio::test]
async fn unknown_job_id_reports_not_found() {
    let h = harness();
    let err = h
        .service
        .queue
        .status("no-such-job")
        .await
        .expect_err("unknown id");
    assert!(matches!(err, QueueError::NotFound(id) if id == "no-such-job"));
}

#[tokio::test]
async fn expired_job_record_reports_not_found() {
    let mut cfg = claimgate::settings::AppConfig::default();
    cfg.queue.record_ttl_secs = 1;
    let h = harness_with(cfg);

    let handle = h
        .service
        .queue
        .enqueue(request("my-love-99"))
        .await
        .expect("enqueue");
    assert!(h.service.queue.status(&handle.id).await.is_ok());

    tokio::time::sleep(Duration::from_millis(1_100)).await;
    assert!(matches!(
        h.service.queue.status(&handle.id).await,
        Err(QueueError::NotFound(_))
    ));
}

#[tokio::test]
async fn worker_processes_job_to_finished() {
    let h = harness();
    let handle = h
        .service
        .queue
        .enqueue(request("my-love-99"))
        .await
        .expect("enqueue");

    let worker = h.service.worker();
    assert!(worker.run_once().await.expect("run_once"));

    let record = h.service.queue.status(&handle.id).await.expect("status");
    assert_eq!(record.status, JobStatus::Finished);
    let receipt = record.receipt.expect("receipt");
    assert_eq!(receipt.slug, "my-love-99");

    // The claim really landed in the System of Record.
    let stored = h
        .records
        .read_by_slug("my-love-99")
        .await
        .expect("read")
        .expect("record");
    assert_eq!(stored.id, receipt.record_id);
}

#[tokio::test]
async fn failed_job_carries_the_operation_error_verbatim() {
    let h = harness();
    // Claim the slug first so the queued job loses.
    let ctx = claim_context(&h);
    claim::execute(&ctx, &request("my-love-99"))
        .await
        .expect("first claim");

    let handle = h
        .service
        .queue
        .enqueue(request("my-love-99"))
        .await
        .expect("enqueue");
    let worker = h.service.worker();
    assert!(worker.run_once().await.expect("run_once"));

    let record = h.service.queue.status(&handle.id).await.expect("status");
    assert_eq!(record.status, JobStatus::Failed);
    assert!(record.receipt.is_none());
    let error = record.error.expect("failed job carries the error");
    assert!(error.contains("conflict"), "got: {error}");
}

#[tokio::test]
async fn status_timestamps_progress_monotonically() {
    let h = harness();
    let handle = h
        .service
        .queue
        .enqueue(request("my-love-99"))
        .await
        .expect("enqueue");
    let worker = h.service.worker();
    assert!(worker.run_once().await.expect("run_once"));

    let record = h.service.queue.status(&handle.id).await.expect("status");
    let started = record.started_at_ms.expect("started");
    let finished = record.finished_at_ms.expect("finished");
    assert!(record.enqueued_at_ms <= started);
    assert!(started <= finished);
}

#[tokio::test]
async fn run_once_returns_false_on_an_empty_queue() {
    let h = harness();
    let worker = h.service.worker();
    // poll_timeout for the default config is one second; an empty queue
    // simply times out.
    assert!(!worker.run_once().await.expect("run_once"));
}

#[tokio::test]
async fn jobs_are_processed_in_fifo_order() {
    let h = harness();
    let first = h
        .service
        .queue
        .enqueue(request("first-slug"))
        .await
        .expect("enqueue");
    let second = h
        .service
        .queue
        .enqueue(request("second-slug"))
        .await
        .expect("enqueue");

    let worker = h.service.worker();
    assert!(worker.run_once().await.expect("run_once"));
    let first_record = h.service.queue.status(&first.id).await.expect("status");
    let second_record = h.service.queue.status(&second.id).await.expect("status");
    assert_eq!(first_record.status, JobStatus::Finished);
    assert_eq!(second_record.status, JobStatus::Queued);

    assert!(worker.run_once().await.expect("run_once"));
    let second_record = h.service.queue.status(&second.id).await.expect("status");
    assert_eq!(second_record.status, JobStatus::Finished);
}

#[tokio::test]
async fn dangling_queue_entry_without_record_is_skipped() {
    use claimgate::store::SharedStore;

    let h = harness();
    // Push an id whose record never existed (or expired).
    h.store
        .queue_push("queue:page_creation", "ghost-job")
        .await
        .expect("push");
    let worker = h.service.worker();
    assert!(!worker.run_once().await.expect("run_once"));
}

#[tokio::test]
async fn queue_names_isolate_their_fifos() {
    use claimgate::store::SharedStore;

    let h = harness();
    h.service
        .queue
        .enqueue(request("my-love-99"))
        .await
        .expect("enqueue");
    // The job id sits only in the configured queue's list.
    let other = h
        .store
        .queue_pop("queue:other_queue", Duration::from_millis(50))
        .await
        .expect("pop");
    assert!(other.is_none());
    let own = h
        .store
        .queue_pop("queue:page_creation", Duration::from_millis(50))
        .await
        .expect("pop");
    assert!(own.is_some());
}

#[tokio::test]
async fn reserved_slug_job_fails_with_validation_error() {
    let h = harness();
    let mut req = request("admin");
    req.payload = payload();
    let handle = h.service.queue.enqueue(req).await.expect("enqueue");
    let worker = h.service.worker();
    assert!(worker.run_once().await.expect("run_once"));

    let record = h.service.queue.status(&handle.id).await.expect("status");
    assert_eq!(record.status, JobStatus::Failed);
    assert!(record.error.expect("error").contains("invalid slug"));
}
