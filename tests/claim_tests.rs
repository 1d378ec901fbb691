use std::time::Duration;

use claimgate::claim::{self, ClaimError, ConflictKind};
use claimgate::records::RecordStore;

use test_helpers::{claim_context, harness, request};

#[tokio::test]
async fn concurrent_double_execution_yields_one_success_one_conflict() {
    let h = harness();
    // A small insert delay widens the race window so both executions pass
    // the pre-insert availability check before either inserts.
    h.records
        .set_insert_latency(Some(Duration::from_millis(50)));

    let ctx_a = claim_context(&h);
    let ctx_b = claim_context(&h);
    let req = request("my-love-99");
    let req_b = req.clone();

    let (a, b) = tokio::join!(
        tokio::spawn(async move { claim::execute(&ctx_a, &req).await }),
        tokio::spawn(async move { claim::execute(&ctx_b, &req_b).await }),
    );
    let results = [a.expect("join"), b.expect("join")];

    let successes = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(ClaimError::Conflict(_))))
        .count();
    assert_eq!(successes, 1, "exactly one execution may win");
    assert_eq!(conflicts, 1, "the loser must observe a clean conflict");

    // The store holds exactly one active claim, not a corrupted pair.
    let stored = h
        .records
        .read_by_slug("my-love-99")
        .await
        .expect("read")
        .expect("record");
    assert!(stored.active);
}

#[tokio::test]
async fn sequential_replay_conflicts_as_already_taken() {
    let h = harness();
    let ctx = claim_context(&h);
    let req = request("my-love-99");

    claim::execute(&ctx, &req).await.expect("first execution");
    // A replay (the queued twin of a timed-out attempt) sees the slug as
    // taken before ever reaching the insert.
    let replay = claim::execute(&ctx, &req).await;
    assert!(matches!(
        replay,
        Err(ClaimError::Conflict(ConflictKind::AlreadyTaken))
    ));
}

#[tokio::test]
async fn receipt_carries_a_32_char_capability_token() {
    let h = harness();
    let ctx = claim_context(&h);
    let receipt = claim::execute(&ctx, &request("my-love-99"))
        .await
        .expect("claim");
    assert_eq!(receipt.edit_token.len(), 32);
    assert!(receipt.edit_token.chars().all(|c| c.is_ascii_alphanumeric()));

    // The token in the receipt matches the stored record.
    let stored = h
        .records
        .read_by_slug("my-love-99")
        .await
        .expect("read")
        .expect("record");
    assert_eq!(stored.edit_token, receipt.edit_token);
}

#[tokio::test]
async fn release_requires_the_matching_token() {
    let h = harness();
    let ctx = claim_context(&h);
    let receipt = claim::execute(&ctx, &request("my-love-99"))
        .await
        .expect("claim");

    let wrong = claim::release(&ctx, "my-love-99", "not-the-token").await;
    assert!(matches!(wrong, Err(ClaimError::TokenMismatch)));

    claim::release(&ctx, "my-love-99", &receipt.edit_token)
        .await
        .expect("release with the right token");
    let gone = claim::release(&ctx, "my-love-99", &receipt.edit_token).await;
    assert!(matches!(gone, Err(ClaimError::NotFound)));
}

#[tokio::test]
async fn released_slug_can_be_claimed_again() {
    let h = harness();
    let ctx = claim_context(&h);
    let first = claim::execute(&ctx, &request("my-love-99"))
        .await
        .expect("claim");
    claim::release(&ctx, "my-love-99", &first.edit_token)
        .await
        .expect("release");

    let second = claim::execute(&ctx, &request("my-love-99"))
        .await
        .expect("re-claim");
    assert_ne!(first.record_id, second.record_id);
    assert_ne!(first.edit_token, second.edit_token);
}

#[tokio::test]
async fn case_variant_claims_conflict() {
    let h = harness();
    let ctx = claim_context(&h);
    claim::execute(&ctx, &request("My-Love-99"))
        .await
        .expect("first claim");
    let variant = claim::execute(&ctx, &request("MY-LOVE-99")).await;
    assert!(matches!(variant, Err(ClaimError::Conflict(_))));
}
