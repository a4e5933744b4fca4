// [apps/orchestrator/tests/s4_permanent_dispatch_failure.rs]
//! S4 — Permanent dispatch failure: the chat platform rejects delivery
//! outright (not rate-limited, not a transient fault). The post must land
//! in FAILED with a PERMANENT_FAIL dispatch record and must never be
//! retried.

mod common;

use std::sync::Arc;
use std::time::Duration;

use courier_core_rate_governor::RateGovernor;
use courier_domain_models::{Analysis, PostStatus};
use courier_infra_dispatch_client::testing::FakeDispatcher;
use courier_infra_store::{LibsqlStore, Store};
use courier_orchestrator::services::dispatch_worker::{DispatchWorkerDeps, DispatchWorkerPool};

#[tokio::test]
async fn rejected_delivery_lands_the_post_in_failed_with_no_further_attempts() {
    let store: Arc<dyn Store> = Arc::new(
        LibsqlStore::connect(":memory:", None)
            .await
            .expect("in-memory store should bootstrap"),
    );
    store
        .upsert_account(&common::monitored_account("alice", Some("100")))
        .await
        .unwrap();
    let post = common::sample_post("301", "alice", "goodbye", chrono::Utc::now());
    store.upsert_post(&post).await.unwrap();

    // Drive the post to ANALYZED directly (this scenario starts in
    // DISPATCHING, not ANALYZING — analysis itself is not under test here).
    let claimed = store.claim_for_analysis(1).await.unwrap();
    assert_eq!(claimed.len(), 1);
    store
        .complete_analysis(
            &post.id,
            Analysis {
                post_id: post.id.clone(),
                model: "test-model".to_string(),
                parameters_snapshot: serde_json::json!({}),
                prompt_snapshot: "summarize {text}".to_string(),
                output_text: "summary".to_string(),
                tokens_used: 8,
                cost_estimate: 0.001,
                elapsed_ms: 5,
                created_at: chrono::Utc::now(),
            },
        )
        .await
        .unwrap();

    let dispatcher = Arc::new(FakeDispatcher::always_rejecting("destination unauthorized"));

    let config = Arc::new(common::test_config());
    let gate = common::gate();
    let health = common::health();
    let governor = Arc::new(RateGovernor::new());

    let deps = Arc::new(DispatchWorkerDeps {
        store: store.clone(),
        dispatcher: dispatcher.clone(),
        governor,
        config,
        gate: gate.clone(),
        health,
    });
    let _handles = DispatchWorkerPool::spawn(1, deps, tokio::sync::mpsc::channel(8).1);

    let failed = wait_for_status(&store, "301", Duration::from_secs(5)).await;
    match &failed.status {
        PostStatus::Failed { reason, retry_after } => {
            assert!(reason.contains("destination unauthorized"));
            assert!(retry_after.is_none(), "a permanent failure must not carry a retry_after");
        }
        other => panic!("expected FAILED, got {:?}", other),
    }

    assert_eq!(dispatcher.sent_messages().len(), 1, "a rejected delivery must not be retried");

    let attempts = store.latest_dispatch_attempt_number("301", "#general").await.unwrap();
    assert_eq!(attempts, 1);

    gate.begin_draining();
}

async fn wait_for_status(store: &Arc<dyn Store>, id: &str, within: Duration) -> courier_domain_models::Post {
    let deadline = tokio::time::Instant::now() + within;
    loop {
        let post = store.get_post(&id.into()).await.unwrap();
        if matches!(post.status, PostStatus::Failed { .. }) {
            return post;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("post {} never reached FAILED (last seen: {:?})", id, post.status);
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
