// [apps/orchestrator/tests/s1_happy_path_poll.rs]
//! S1 — Happy path (scheduled poll): two new posts fetched for an account
//! whose cursor already sits at "100" should flow end to end through
//! analysis and dispatch, in `created_at` order, advancing the cursor to
//! the last post seen.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use courier_core_rate_governor::RateGovernor;
use courier_infra_analyzer_client::testing::FakeAnalyzer;
use courier_infra_dispatch_client::testing::FakeDispatcher;
use courier_infra_source_client::testing::FakeSourceClient;
use courier_infra_store::{LibsqlStore, Store};
use courier_orchestrator::services::analysis_worker::{AnalysisWorkerDeps, AnalysisWorkerPool};
use courier_orchestrator::services::dispatch_worker::{DispatchWorkerDeps, DispatchWorkerPool};
use courier_orchestrator::services::ingest_pipeline::IngestPipelineService;
use courier_orchestrator::services::source_coordinator::{PollTrigger, TriggerReason};

#[tokio::test]
async fn two_new_posts_are_ingested_analyzed_and_dispatched_in_order() {
    let store: Arc<dyn Store> = Arc::new(
        LibsqlStore::connect(":memory:", None)
            .await
            .expect("in-memory store should bootstrap"),
    );
    store
        .upsert_account(&common::monitored_account("alice", Some("100")))
        .await
        .unwrap();

    let t0 = Utc::now();
    let posts = vec![
        common::sample_post("101", "alice", "hello", t0),
        common::sample_post("102", "alice", "world", t0 + chrono::Duration::seconds(1)),
    ];
    let source = Arc::new(FakeSourceClient::with_posts(posts));
    let analyzer = Arc::new(FakeAnalyzer::always_succeeding("looks fine", 10, 0.001));
    let dispatcher = Arc::new(FakeDispatcher::always_acking());

    let mut config = common::test_config();
    // Serialize both the analysis claim (single worker, batched claim
    // preserves created_at order) and dispatch (single worker) so the
    // scenario's ordering expectation is deterministic.
    config.analysis_concurrency = 1;
    config.analysis_batch = 2;
    let config = Arc::new(config);
    let gate = common::gate();
    let health = common::health();

    let (trigger_tx, trigger_rx) = tokio::sync::mpsc::channel(8);
    let (analysis_hint_tx, analysis_hint_rx) = tokio::sync::mpsc::channel(8);
    let (dispatch_hint_tx, dispatch_hint_rx) = tokio::sync::mpsc::channel(8);
    let governor = Arc::new(RateGovernor::new());

    let ingest = IngestPipelineService::new(
        store.clone(),
        source.clone(),
        governor.clone(),
        config.clone(),
        gate.clone(),
        health.clone(),
        analysis_hint_tx,
    );
    tokio::spawn(ingest.run(trigger_rx));

    let analysis_deps = Arc::new(AnalysisWorkerDeps {
        store: store.clone(),
        analyzer: analyzer.clone(),
        governor: governor.clone(),
        config: config.clone(),
        gate: gate.clone(),
        health: health.clone(),
        dispatch_hint_tx,
    });
    let mut handles = AnalysisWorkerPool::spawn(1, analysis_deps, analysis_hint_rx);

    let dispatch_deps = Arc::new(DispatchWorkerDeps {
        store: store.clone(),
        dispatcher: dispatcher.clone(),
        governor: governor.clone(),
        config: config.clone(),
        gate: gate.clone(),
        health: health.clone(),
    });
    handles.extend(DispatchWorkerPool::spawn(1, dispatch_deps, dispatch_hint_rx));

    trigger_tx
        .send(PollTrigger {
            account: "alice".into(),
            reason: TriggerReason::Scheduled,
        })
        .await
        .unwrap();

    let post_101 = wait_for_dispatched(&store, "101").await;
    let post_102 = wait_for_dispatched(&store, "102").await;

    let analysis_101 = store.get_latest_analysis(&post_101.id).await.unwrap();
    let analysis_102 = store.get_latest_analysis(&post_102.id).await.unwrap();
    assert!(analysis_101.created_at <= analysis_102.created_at);

    let account = store.get_account("alice").await.unwrap();
    assert_eq!(account.last_seen_post_id.as_deref(), Some("102"));

    let sent_messages = dispatcher.sent_messages();
    assert_eq!(sent_messages.len(), 2);

    gate.begin_draining();
}

async fn wait_for_dispatched(store: &Arc<dyn Store>, id: &str) -> courier_domain_models::Post {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let post = store.get_post(&id.into()).await.unwrap();
        if post.status == courier_domain_models::PostStatus::Dispatched {
            return post;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("post {} never reached DISPATCHED (status: {:?})", id, post.status);
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
